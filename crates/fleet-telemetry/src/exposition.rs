//! Prometheus text exposition format.
//!
//! Merged families are turned back into `prometheus::proto` families and
//! rendered with the crate's `TextEncoder`.

use crate::snapshot::{MetricFamilySnapshot, MetricKind, MetricSample, SampleValue};
use crate::TelemetryError;
use prometheus::proto::{self, MetricType};
use prometheus::TextEncoder;

/// Content type of the rendered exposition.
pub const CONTENT_TYPE: &str = prometheus::TEXT_FORMAT;

/// Render families as text exposition.
///
/// Families without samples are left out. Untyped families are written as
/// gauges, the encoder has no untyped form.
pub(crate) fn encode(families: &[MetricFamilySnapshot]) -> Result<String, TelemetryError> {
    let families: Vec<proto::MetricFamily> = families
        .iter()
        .filter(|family| !family.samples.is_empty())
        .map(to_proto_family)
        .collect();

    TextEncoder::new()
        .encode_to_string(&families)
        .map_err(|e| TelemetryError::Encode(e.to_string()))
}

fn to_proto_family(family: &MetricFamilySnapshot) -> proto::MetricFamily {
    let mut out = proto::MetricFamily::default();
    out.set_name(family.name.clone());
    out.set_help(family.help.clone());
    out.set_field_type(match family.kind {
        MetricKind::Counter => MetricType::COUNTER,
        MetricKind::Gauge | MetricKind::Untyped => MetricType::GAUGE,
        MetricKind::Histogram => MetricType::HISTOGRAM,
        MetricKind::Summary => MetricType::SUMMARY,
    });

    for sample in &family.samples {
        out.mut_metric().push(to_proto_metric(family.kind, sample));
    }
    out
}

fn to_proto_metric(kind: MetricKind, sample: &MetricSample) -> proto::Metric {
    let mut metric = proto::Metric::default();
    for (name, value) in &sample.labels {
        let mut pair = proto::LabelPair::default();
        pair.set_name(name.clone());
        pair.set_value(value.clone());
        metric.mut_label().push(pair);
    }

    match &sample.value {
        SampleValue::Scalar { value } => match kind {
            MetricKind::Counter => metric.mut_counter().set_value(*value),
            _ => metric.mut_gauge().set_value(*value),
        },
        SampleValue::Histogram {
            buckets,
            sum,
            count,
        } => {
            let histogram = metric.mut_histogram();
            histogram.set_sample_sum(*sum);
            histogram.set_sample_count(*count);
            // +Inf is written by the encoder from the sample count.
            for bucket in buckets.iter().filter(|b| b.upper_bound.is_finite()) {
                let mut out = proto::Bucket::default();
                out.set_upper_bound(bucket.upper_bound);
                out.set_cumulative_count(bucket.cumulative_count);
                histogram.mut_bucket().push(out);
            }
        }
        SampleValue::Summary {
            quantiles,
            sum,
            count,
        } => {
            let summary = metric.mut_summary();
            summary.set_sample_sum(*sum);
            summary.set_sample_count(*count);
            for q in quantiles {
                let mut out = proto::Quantile::default();
                out.set_quantile(q.quantile);
                out.set_value(q.value);
                summary.mut_quantile().push(out);
            }
        }
    }

    metric
}

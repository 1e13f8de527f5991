//! # Metrics Snapshots
//!
//! A `MetricsSnapshot` is a point-in-time copy of one process's registry in a
//! form that survives a trip through the packet payload.
//!
//! ```text
//! { "families": [ { "name": "http_requests_total", "help": "...",
//!                   "kind": "counter",
//!                   "samples": [ { "labels": { "code": "200" },
//!                                  "value": { "type": "scalar", "value": 3.0 } } ] } ] }
//! ```
//!
//! Histogram buckets carry finite upper bounds only; the `+Inf` bucket is
//! implied by `count`. Non-finite values travel as the strings `"NaN"`,
//! `"+Inf"` and `"-Inf"`, since JSON numbers cannot hold them.

use crate::metrics::REGISTRY;
use crate::TelemetryError;
use prometheus::proto::{self, MetricType};
use prometheus::Registry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Metric type of a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Gauge,
    Histogram,
    Summary,
    Untyped,
}

impl MetricKind {
    /// Name used on the `# TYPE` line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Gauge => "gauge",
            Self::Histogram => "histogram",
            Self::Summary => "summary",
            Self::Untyped => "untyped",
        }
    }
}

impl From<MetricType> for MetricKind {
    fn from(kind: MetricType) -> Self {
        match kind {
            MetricType::COUNTER => Self::Counter,
            MetricType::GAUGE => Self::Gauge,
            MetricType::HISTOGRAM => Self::Histogram,
            MetricType::SUMMARY => Self::Summary,
            MetricType::UNTYPED => Self::Untyped,
        }
    }
}

/// One histogram bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramBucket {
    #[serde(with = "float_serde")]
    pub upper_bound: f64,
    pub cumulative_count: u64,
}

/// One summary quantile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryQuantile {
    #[serde(with = "float_serde")]
    pub quantile: f64,
    #[serde(with = "float_serde")]
    pub value: f64,
}

/// Value of a single sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SampleValue {
    /// Counter, gauge or untyped value.
    Scalar {
        #[serde(with = "float_serde")]
        value: f64,
    },

    /// Histogram distribution.
    Histogram {
        buckets: Vec<HistogramBucket>,
        #[serde(with = "float_serde")]
        sum: f64,
        count: u64,
    },

    /// Summary distribution.
    Summary {
        quantiles: Vec<SummaryQuantile>,
        #[serde(with = "float_serde")]
        sum: f64,
        count: u64,
    },
}

mod float_serde {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(f64),
        Text(String),
    }

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_nan() {
            serializer.serialize_str("NaN")
        } else if value.is_infinite() {
            serializer.serialize_str(if *value > 0.0 { "+Inf" } else { "-Inf" })
        } else {
            serializer.serialize_f64(*value)
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Repr::deserialize(deserializer)? {
            Repr::Number(value) => Ok(value),
            Repr::Text(text) => match text.as_str() {
                "NaN" => Ok(f64::NAN),
                "+Inf" | "Inf" => Ok(f64::INFINITY),
                "-Inf" => Ok(f64::NEG_INFINITY),
                other => Err(D::Error::custom(format!("invalid metric value '{other}'"))),
            },
        }
    }
}

/// One labelled sample of a family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSample {
    /// Label pairs, sorted by name.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    pub value: SampleValue,
}

impl MetricSample {
    /// An unlabelled scalar sample.
    #[must_use]
    pub fn scalar(value: f64) -> Self {
        Self {
            labels: BTreeMap::new(),
            value: SampleValue::Scalar { value },
        }
    }

    /// Add a label.
    #[must_use]
    pub fn with_label(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(name.into(), value.into());
        self
    }
}

/// All samples sharing a metric name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricFamilySnapshot {
    pub name: String,
    #[serde(default)]
    pub help: String,
    pub kind: MetricKind,
    #[serde(default)]
    pub samples: Vec<MetricSample>,
}

impl MetricFamilySnapshot {
    /// Create an empty family.
    pub fn new(name: impl Into<String>, help: impl Into<String>, kind: MetricKind) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind,
            samples: Vec::new(),
        }
    }

    /// Add a sample.
    #[must_use]
    pub fn with_sample(mut self, sample: MetricSample) -> Self {
        self.samples.push(sample);
        self
    }

    /// Find the sample with exactly these labels.
    #[must_use]
    pub fn sample(&self, labels: &[(&str, &str)]) -> Option<&MetricSample> {
        self.samples.iter().find(|sample| {
            sample.labels.len() == labels.len()
                && labels
                    .iter()
                    .all(|(k, v)| sample.labels.get(*k).map(String::as_str) == Some(*v))
        })
    }
}

/// Point-in-time copy of one process's metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    #[serde(default)]
    pub families: Vec<MetricFamilySnapshot>,
}

impl MetricsSnapshot {
    /// Build a snapshot from gathered Prometheus families.
    #[must_use]
    pub fn from_families(families: &[proto::MetricFamily]) -> Self {
        Self {
            families: families.iter().map(convert_family).collect(),
        }
    }

    /// Add a family.
    #[must_use]
    pub fn with_family(mut self, family: MetricFamilySnapshot) -> Self {
        self.families.push(family);
        self
    }

    /// Find a family by name.
    #[must_use]
    pub fn family(&self, name: &str) -> Option<&MetricFamilySnapshot> {
        self.families.iter().find(|family| family.name == name)
    }

    /// Encode as a JSON value for a packet payload.
    ///
    /// # Errors
    ///
    /// Fails if a value cannot be represented in JSON.
    pub fn to_value(&self) -> Result<serde_json::Value, TelemetryError> {
        serde_json::to_value(self).map_err(|e| TelemetryError::Snapshot(e.to_string()))
    }

    /// Decode from a packet payload.
    ///
    /// # Errors
    ///
    /// Fails if the payload is not a snapshot.
    pub fn from_value(value: serde_json::Value) -> Result<Self, TelemetryError> {
        serde_json::from_value(value).map_err(|e| TelemetryError::Snapshot(e.to_string()))
    }
}

fn convert_family(family: &proto::MetricFamily) -> MetricFamilySnapshot {
    let kind = MetricKind::from(family.get_field_type());

    let samples = family
        .get_metric()
        .iter()
        .map(|metric| MetricSample {
            labels: metric
                .get_label()
                .iter()
                .map(|pair| (pair.get_name().to_string(), pair.get_value().to_string()))
                .collect(),
            value: convert_value(kind, metric),
        })
        .collect();

    MetricFamilySnapshot {
        name: family.get_name().to_string(),
        help: family.get_help().to_string(),
        kind,
        samples,
    }
}

fn convert_value(kind: MetricKind, metric: &proto::Metric) -> SampleValue {
    match kind {
        MetricKind::Counter => SampleValue::Scalar {
            value: metric.get_counter().get_value(),
        },
        MetricKind::Gauge => SampleValue::Scalar {
            value: metric.get_gauge().get_value(),
        },
        MetricKind::Untyped => SampleValue::Scalar {
            value: metric.get_untyped().get_value(),
        },
        MetricKind::Histogram => {
            let histogram = metric.get_histogram();
            SampleValue::Histogram {
                buckets: histogram
                    .get_bucket()
                    .iter()
                    .filter(|bucket| bucket.get_upper_bound().is_finite())
                    .map(|bucket| HistogramBucket {
                        upper_bound: bucket.get_upper_bound(),
                        cumulative_count: bucket.get_cumulative_count(),
                    })
                    .collect(),
                sum: histogram.get_sample_sum(),
                count: histogram.get_sample_count(),
            }
        }
        MetricKind::Summary => {
            let summary = metric.get_summary();
            SampleValue::Summary {
                quantiles: summary
                    .get_quantile()
                    .iter()
                    .map(|q| SummaryQuantile {
                        quantile: q.get_quantile(),
                        value: q.get_value(),
                    })
                    .collect(),
                sum: summary.get_sample_sum(),
                count: summary.get_sample_count(),
            }
        }
    }
}

/// Source of the local process's metrics.
pub trait MetricsSource: Send + Sync {
    /// Capture the current state of the local registry.
    fn snapshot(&self) -> Result<MetricsSnapshot, TelemetryError>;
}

/// `MetricsSource` over a `prometheus::Registry`.
#[derive(Clone)]
pub struct PrometheusSource {
    registry: Registry,
}

impl PrometheusSource {
    /// Capture from the given registry.
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Capture from the global `REGISTRY`.
    pub fn global() -> Self {
        Self::new(REGISTRY.clone())
    }
}

impl MetricsSource for PrometheusSource {
    fn snapshot(&self) -> Result<MetricsSnapshot, TelemetryError> {
        Ok(MetricsSnapshot::from_families(&self.registry.gather()))
    }
}

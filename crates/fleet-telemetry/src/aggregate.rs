//! # Fleet-Wide Merging
//!
//! Folds the snapshots of many processes into one registry.
//!
//! ## Rules
//!
//! - Families are grouped by name, samples by their label set.
//! - Scalars are combined by the family's `Aggregator` (`Sum` unless the
//!   policy says otherwise).
//! - Histograms are summed per upper bound, with `sum` and `count` summed.
//! - Summaries sum `sum` and `count` and average each quantile.
//! - A family reported with different kinds by different processes is
//!   dropped.
//!
//! Values are combined in sorted order and the output is sorted by family
//! name and label set, so the result does not depend on snapshot order.

use crate::exposition;
use crate::snapshot::{
    HistogramBucket, MetricFamilySnapshot, MetricKind, MetricSample, MetricsSnapshot,
    SampleValue, SummaryQuantile,
};
use crate::TelemetryError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::warn;

/// How the scalar samples of a family are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregator {
    /// Add values together.
    #[default]
    Sum,
    /// Arithmetic mean.
    Average,
    /// Smallest value.
    Min,
    /// Largest value.
    Max,
    /// Leave the family out of the merged registry.
    Omit,
}

impl Aggregator {
    fn combine(self, values: &mut [f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);

        match self {
            Self::Sum => Some(values.iter().sum()),
            Self::Average => Some(values.iter().sum::<f64>() / values.len() as f64),
            Self::Min => values.first().copied(),
            Self::Max => values.last().copied(),
            Self::Omit => None,
        }
    }
}

/// Per-family aggregator choices.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationPolicy {
    default: Aggregator,
    overrides: HashMap<String, Aggregator>,
}

impl AggregationPolicy {
    /// Use `aggregator` for every family without an override.
    #[must_use]
    pub fn with_default(mut self, aggregator: Aggregator) -> Self {
        self.default = aggregator;
        self
    }

    /// Use `aggregator` for the family `name`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, aggregator: Aggregator) -> Self {
        self.overrides.insert(name.into(), aggregator);
        self
    }

    /// Aggregator for the family `name`.
    #[must_use]
    pub fn aggregator_for(&self, name: &str) -> Aggregator {
        self.overrides.get(name).copied().unwrap_or(self.default)
    }
}

/// The registry a process reports for the whole fleet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedRegistry {
    families: Vec<MetricFamilySnapshot>,
}

impl MergedRegistry {
    /// Wrap a single process's snapshot unchanged.
    #[must_use]
    pub fn from_snapshot(snapshot: MetricsSnapshot) -> Self {
        Self {
            families: snapshot.families,
        }
    }

    /// All families.
    #[must_use]
    pub fn families(&self) -> &[MetricFamilySnapshot] {
        &self.families
    }

    /// Find a family by name.
    #[must_use]
    pub fn family(&self, name: &str) -> Option<&MetricFamilySnapshot> {
        self.families.iter().find(|family| family.name == name)
    }

    /// Returns true if there are no families.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Convert back into a snapshot.
    #[must_use]
    pub fn into_snapshot(self) -> MetricsSnapshot {
        MetricsSnapshot {
            families: self.families,
        }
    }

    /// Render as Prometheus text exposition.
    ///
    /// # Errors
    ///
    /// `TelemetryError::Encode` if the encoder rejects a family.
    pub fn encode(&self) -> Result<String, TelemetryError> {
        exposition::encode(&self.families)
    }
}

type LabelSet = BTreeMap<String, String>;

struct FamilyAccumulator {
    help: BTreeSet<String>,
    kind: MetricKind,
    samples: BTreeMap<LabelSet, Vec<SampleValue>>,
}

/// Merge the snapshots of several processes.
pub fn merge_snapshots(snapshots: &[MetricsSnapshot], policy: &AggregationPolicy) -> MergedRegistry {
    let mut families: BTreeMap<String, FamilyAccumulator> = BTreeMap::new();
    let mut conflicting: BTreeSet<String> = BTreeSet::new();

    for family in snapshots.iter().flat_map(|snapshot| &snapshot.families) {
        let acc = families
            .entry(family.name.clone())
            .or_insert_with(|| FamilyAccumulator {
                help: BTreeSet::new(),
                kind: family.kind,
                samples: BTreeMap::new(),
            });

        if acc.kind != family.kind {
            conflicting.insert(family.name.clone());
            continue;
        }

        if !family.help.is_empty() {
            acc.help.insert(family.help.clone());
        }
        for sample in &family.samples {
            acc.samples
                .entry(sample.labels.clone())
                .or_default()
                .push(sample.value.clone());
        }
    }

    for name in &conflicting {
        warn!(family = %name, "Skipping metric family reported with conflicting types");
        families.remove(name);
    }

    let merged = families
        .into_iter()
        .filter_map(|(name, acc)| {
            let aggregator = policy.aggregator_for(&name);
            if aggregator == Aggregator::Omit {
                return None;
            }

            let samples = acc
                .samples
                .into_iter()
                .filter_map(|(labels, values)| {
                    let value = combine_values(&name, acc.kind, aggregator, values)?;
                    Some(MetricSample { labels, value })
                })
                .collect();

            Some(MetricFamilySnapshot {
                help: acc.help.into_iter().next().unwrap_or_default(),
                name,
                kind: acc.kind,
                samples,
            })
        })
        .collect();

    MergedRegistry { families: merged }
}

fn combine_values(
    name: &str,
    kind: MetricKind,
    aggregator: Aggregator,
    values: Vec<SampleValue>,
) -> Option<SampleValue> {
    match kind {
        MetricKind::Counter | MetricKind::Gauge | MetricKind::Untyped => {
            let mut scalars = Vec::with_capacity(values.len());
            for value in values {
                match value {
                    SampleValue::Scalar { value } => scalars.push(value),
                    _ => warn!(family = %name, "Dropping non-scalar sample"),
                }
            }
            aggregator
                .combine(&mut scalars)
                .map(|value| SampleValue::Scalar { value })
        }
        MetricKind::Histogram => merge_histograms(name, values),
        MetricKind::Summary => merge_summaries(name, values),
    }
}

fn merge_histograms(name: &str, values: Vec<SampleValue>) -> Option<SampleValue> {
    let mut buckets: Vec<HistogramBucket> = Vec::new();
    let mut sums = Vec::new();
    let mut total_count = 0u64;

    for value in values {
        let SampleValue::Histogram {
            buckets: sample_buckets,
            sum,
            count,
        } = value
        else {
            warn!(family = %name, "Dropping non-histogram sample");
            continue;
        };

        for bucket in sample_buckets {
            match buckets
                .iter_mut()
                .find(|b| b.upper_bound == bucket.upper_bound)
            {
                Some(existing) => existing.cumulative_count += bucket.cumulative_count,
                None => buckets.push(bucket),
            }
        }
        sums.push(sum);
        total_count += count;
    }

    if sums.is_empty() {
        return None;
    }
    buckets.sort_by(|a, b| a.upper_bound.total_cmp(&b.upper_bound));

    Some(SampleValue::Histogram {
        buckets,
        sum: Aggregator::Sum.combine(&mut sums).unwrap_or_default(),
        count: total_count,
    })
}

fn merge_summaries(name: &str, values: Vec<SampleValue>) -> Option<SampleValue> {
    let mut quantiles: Vec<(f64, Vec<f64>)> = Vec::new();
    let mut sums = Vec::new();
    let mut total_count = 0u64;

    for value in values {
        let SampleValue::Summary {
            quantiles: sample_quantiles,
            sum,
            count,
        } = value
        else {
            warn!(family = %name, "Dropping non-summary sample");
            continue;
        };

        for q in sample_quantiles {
            match quantiles.iter_mut().find(|(key, _)| *key == q.quantile) {
                Some((_, observed)) => observed.push(q.value),
                None => quantiles.push((q.quantile, vec![q.value])),
            }
        }
        sums.push(sum);
        total_count += count;
    }

    if sums.is_empty() {
        return None;
    }
    quantiles.sort_by(|a, b| a.0.total_cmp(&b.0));

    Some(SampleValue::Summary {
        quantiles: quantiles
            .into_iter()
            .filter_map(|(quantile, mut observed)| {
                Aggregator::Average
                    .combine(&mut observed)
                    .map(|value| SummaryQuantile { quantile, value })
            })
            .collect(),
        sum: Aggregator::Sum.combine(&mut sums).unwrap_or_default(),
        count: total_count,
    })
}

//! # Merge Properties
//!
//! Merging real Prometheus registries from several workers.

#[cfg(test)]
mod tests {
    use fleet_telemetry::{
        merge_snapshots, AggregationPolicy, Aggregator, MetricsSnapshot, MetricsSource,
        PrometheusSource, SampleValue,
    };
    use prometheus::{Gauge, Histogram, HistogramOpts, IntCounterVec, Opts, Registry};

    /// Snapshot of a worker that served `requests` per route and observed
    /// `latencies`.
    fn worker(requests: &[(&str, u64)], queue: f64, latencies: &[f64]) -> MetricsSnapshot {
        let registry = Registry::new();

        let counter = IntCounterVec::new(
            Opts::new("http_requests_total", "Requests served"),
            &["route"],
        )
        .unwrap();
        for (route, count) in requests {
            counter.with_label_values(&[*route]).inc_by(*count);
        }

        let gauge = Gauge::new("queue_depth", "Queued jobs").unwrap();
        gauge.set(queue);

        let histogram = Histogram::with_opts(
            HistogramOpts::new("request_seconds", "Request latency").buckets(vec![0.1, 1.0]),
        )
        .unwrap();
        for latency in latencies {
            histogram.observe(*latency);
        }

        registry.register(Box::new(counter)).unwrap();
        registry.register(Box::new(gauge)).unwrap();
        registry.register(Box::new(histogram)).unwrap();
        PrometheusSource::new(registry).snapshot().unwrap()
    }

    fn fleet() -> Vec<MetricsSnapshot> {
        vec![
            worker(&[("/a", 3), ("/b", 1)], 2.0, &[0.05, 0.5]),
            worker(&[("/a", 4)], 5.0, &[0.05, 2.0, 0.01]),
            worker(&[("/b", 6)], 1.0, &[]),
        ]
    }

    fn scalar(value: &SampleValue) -> f64 {
        match value {
            SampleValue::Scalar { value } => *value,
            other => panic!("expected scalar, got {other:?}"),
        }
    }

    #[test]
    fn test_any_permutation_renders_identically() {
        let snapshots = fleet();
        let policy = AggregationPolicy::default();
        let expected = merge_snapshots(&snapshots, &policy).encode().unwrap();

        let orders = [[0, 1, 2], [0, 2, 1], [1, 0, 2], [1, 2, 0], [2, 0, 1], [2, 1, 0]];
        for order in orders {
            let permuted: Vec<MetricsSnapshot> =
                order.iter().map(|&i| snapshots[i].clone()).collect();
            assert_eq!(merge_snapshots(&permuted, &policy).encode().unwrap(), expected);
        }
    }

    #[test]
    fn test_counters_summed_per_label_set() {
        let merged = merge_snapshots(&fleet(), &AggregationPolicy::default());
        let requests = merged.family("http_requests_total").unwrap();

        assert_eq!(scalar(&requests.sample(&[("route", "/a")]).unwrap().value), 7.0);
        assert_eq!(scalar(&requests.sample(&[("route", "/b")]).unwrap().value), 7.0);
        assert_eq!(scalar(&merged.family("queue_depth").unwrap().samples[0].value), 8.0);
    }

    #[test]
    fn test_histograms_summed_per_bound() {
        let merged = merge_snapshots(&fleet(), &AggregationPolicy::default());
        let latency = &merged.family("request_seconds").unwrap().samples[0].value;

        let SampleValue::Histogram { buckets, sum, count } = latency else {
            panic!("expected histogram, got {latency:?}");
        };
        let counts: Vec<(f64, u64)> = buckets
            .iter()
            .map(|b| (b.upper_bound, b.cumulative_count))
            .collect();
        assert_eq!(counts, vec![(0.1, 3), (1.0, 4)]);
        assert_eq!(*count, 5);
        assert!((sum - 2.61).abs() < 1e-9);

        let text = merged.encode().unwrap();
        assert!(text.contains("request_seconds_bucket{le=\"+Inf\"} 5"));
        assert!(text.contains("request_seconds_count 5"));
    }

    #[test]
    fn test_gauge_policy() {
        let policy = AggregationPolicy::default().with("queue_depth", Aggregator::Max);
        let merged = merge_snapshots(&fleet(), &policy);

        assert_eq!(scalar(&merged.family("queue_depth").unwrap().samples[0].value), 5.0);
        // Other families keep summing.
        let requests = merged.family("http_requests_total").unwrap();
        assert_eq!(scalar(&requests.sample(&[("route", "/a")]).unwrap().value), 7.0);
    }
}

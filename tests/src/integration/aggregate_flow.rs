//! # Aggregate Flow
//!
//! `getAggregateMetrics` end to end: a querying process, its siblings'
//! responders and the merge, all on one in-memory bus with virtual time.

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use prometheus::Gauge;
    use serde_json::{json, Value};
    use tokio::time::Instant;

    use fleet_telemetry::{MergedRegistry, MetricsSource, SampleValue};
    use fm_01_process_directory::{ProcessIdentity, SiblingDirectory};
    use fm_02_cluster_broadcast::{Broadcaster, ReplyCorrelator, RequestHandler};
    use fm_03_aggregate_metrics::{AggregateMetricsService, MetricsRequestHandler};
    use shared_types::{ClusterError, ProcessPacket, METRICS_GET_TOPIC};

    use crate::harness::{pid, Fixed, Fleet, APP, JOBS};

    const TIMEOUT: Duration = Duration::from_millis(1000);

    fn jobs_total(registry: &MergedRegistry) -> f64 {
        let family = registry.family(JOBS).expect("jobs family merged");
        match family.samples[0].value {
            SampleValue::Scalar { value } => value,
            ref other => panic!("unexpected sample: {other:?}"),
        }
    }

    fn gauge_value(registry: &MergedRegistry, name: &str) -> f64 {
        match registry.family(name).expect("gauge family merged").samples[0].value {
            SampleValue::Scalar { value } => value,
            ref other => panic!("unexpected sample: {other:?}"),
        }
    }

    // =========================================================================
    // SCENARIOS
    // =========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_three_siblings_merged_within_50ms() {
        let fleet = Fleet::new();
        let _a = fleet.spawn(2, 1, Duration::from_millis(10));
        let _b = fleet.spawn(3, 2, Duration::from_millis(50));
        let _c = fleet.spawn(4, 3, Duration::from_millis(30));
        let me = fleet.local(1, 100);
        let service = fleet.service_for(&me);

        let start = Instant::now();
        let registry = service.get_aggregate_metrics(Some(TIMEOUT)).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_millis(50));
        assert_eq!(jobs_total(&registry), 6.0);
        // One request to each sibling, one reply from each.
        assert_eq!(fleet.bus.packets_sent(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_sibling_fails_at_deadline() {
        let fleet = Fleet::new();
        let _a = fleet.spawn(2, 1, Duration::from_millis(10));
        let _b = fleet.spawn(3, 2, Duration::from_millis(50));
        let _silent = fleet.spawn_silent(4);
        let service = fleet.service_for(&fleet.local(1, 0));

        let start = Instant::now();
        let err = service.get_aggregate_metrics(Some(TIMEOUT)).await.unwrap_err();

        assert_eq!(start.elapsed(), TIMEOUT);
        assert_eq!(
            err,
            ClusterError::Timeout {
                topic: METRICS_GET_TOPIC.to_string(),
                expected: 3,
                received: 2,
                timeout_ms: 1000,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_finite_gauges_survive_the_bus() {
        let fleet = Fleet::new();
        let a = fleet.spawn(2, 1, Duration::from_millis(10));
        let b = fleet.spawn(3, 2, Duration::from_millis(20));
        let service = fleet.service_for(&fleet.local(1, 0));

        let ratio = Gauge::new("cache_hit_ratio", "Hits over lookups").unwrap();
        ratio.set(f64::NAN);
        a.registry.register(Box::new(ratio)).unwrap();
        let ceiling = Gauge::new("pool_ceiling", "Largest pool size allowed").unwrap();
        ceiling.set(f64::INFINITY);
        b.registry.register(Box::new(ceiling)).unwrap();

        let registry = service.get_aggregate_metrics(Some(TIMEOUT)).await.unwrap();

        assert_eq!(jobs_total(&registry), 3.0);
        assert!(gauge_value(&registry, "cache_hit_ratio").is_nan());
        assert_eq!(gauge_value(&registry, "pool_ceiling"), f64::INFINITY);
        assert!(registry
            .encode()
            .unwrap()
            .contains("cache_hit_ratio NaN\n"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_mode_sends_nothing() {
        let fleet = Fleet::new();
        let _a = fleet.spawn(2, 1, Duration::ZERO);
        let me = fleet.local(1, 7);
        let service = AggregateMetricsService::single(Arc::clone(&me.source));

        let registry = service.get_aggregate_metrics(Some(TIMEOUT)).await.unwrap();

        assert_eq!(registry, MergedRegistry::from_snapshot(me.source.snapshot().unwrap()));
        assert_eq!(jobs_total(&registry), 7.0);
        assert_eq!(fleet.bus.packets_sent(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_siblings_resolves_immediately() {
        let fleet = Fleet::new();
        let service = fleet.service_for(&fleet.local(1, 5));

        let start = Instant::now();
        let registry = service.get_aggregate_metrics(Some(TIMEOUT)).await.unwrap();

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(registry.is_empty());
        assert_eq!(fleet.bus.packets_sent(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_own_process_answers_its_broadcast() {
        let fleet = Fleet::new();
        let me = fleet.spawn(1, 10, Duration::ZERO);
        let _other = fleet.spawn(2, 5, Duration::ZERO);
        let service = fleet.service_for(&me);

        let registry = service.get_aggregate_metrics(Some(TIMEOUT)).await.unwrap();
        assert_eq!(jobs_total(&registry), 15.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_merge_reflects_live_counters() {
        let fleet = Fleet::new();
        let a = fleet.spawn(2, 1, Duration::ZERO);
        let service = fleet.service_for(&fleet.local(1, 0));

        assert_eq!(jobs_total(&service.get_aggregate_metrics(None).await.unwrap()), 1.0);
        a.jobs.inc_by(4);
        assert_eq!(jobs_total(&service.get_aggregate_metrics(None).await.unwrap()), 5.0);
    }

    // =========================================================================
    // FAILURES
    // =========================================================================

    /// Late on the first request only.
    struct LateOnce<H> {
        inner: H,
        late: AtomicBool,
    }

    #[async_trait]
    impl<H: RequestHandler> RequestHandler for LateOnce<H> {
        async fn handle(&self, request: &ProcessPacket) -> Result<Value, ClusterError> {
            if self.late.swap(false, Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(1500)).await;
            }
            self.inner.handle(request).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_timeout_is_clean() {
        let fleet = Fleet::new();
        let _fast = fleet.spawn(2, 1, Duration::ZERO);
        let slow = fleet.local(3, 2);
        let _slow = fleet.spawn_answering(
            3,
            Arc::new(LateOnce {
                inner: MetricsRequestHandler::new(Arc::clone(&slow.source)),
                late: AtomicBool::new(true),
            }),
        );
        let service = fleet.service_for(&fleet.local(1, 0));

        let err = service.get_aggregate_metrics(Some(TIMEOUT)).await.unwrap_err();
        assert!(err.is_timeout());

        // The late reply lands at 1500 ms with nobody waiting for it.
        tokio::time::sleep(Duration::from_millis(1000)).await;

        let start = Instant::now();
        let registry = service.get_aggregate_metrics(Some(TIMEOUT)).await.unwrap();
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(jobs_total(&registry), 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_aggregate_rejected() {
        let fleet = Fleet::new();
        let _a = fleet.spawn(2, 1, Duration::from_millis(100));
        let service = fleet.service_for(&fleet.local(1, 0));

        let (first, second) = tokio::join!(service.get_aggregate_metrics(Some(TIMEOUT)), async {
            tokio::task::yield_now().await;
            service.get_aggregate_metrics(Some(TIMEOUT)).await
        });

        assert_eq!(jobs_total(&first.unwrap()), 1.0);
        assert_eq!(
            second.unwrap_err(),
            ClusterError::RequestInFlight(METRICS_GET_TOPIC.to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_reply_payload() {
        let fleet = Fleet::new();
        let _a = fleet.spawn(2, 1, Duration::ZERO);
        let _bad = fleet.spawn_answering(3, Arc::new(Fixed(json!({ "families": "nope" }))));
        let service = fleet.service_for(&fleet.local(1, 0));

        match service.get_aggregate_metrics(Some(TIMEOUT)).await.unwrap_err() {
            ClusterError::InvalidSnapshot { sender_id, .. } => assert_eq!(sender_id, pid(3)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_crashed_sibling_still_listed() {
        let fleet = Fleet::new();
        let _a = fleet.spawn(2, 1, Duration::ZERO);
        let _b = fleet.spawn(3, 1, Duration::ZERO);
        fleet.bus.disconnect(pid(3));
        let service = fleet.service_for(&fleet.local(1, 0));

        let start = Instant::now();
        let err = service.get_aggregate_metrics(Some(TIMEOUT)).await.unwrap_err();

        assert_eq!(start.elapsed(), TIMEOUT);
        assert_eq!(
            err,
            ClusterError::Timeout {
                topic: METRICS_GET_TOPIC.to_string(),
                expected: 2,
                received: 1,
                timeout_ms: 1000,
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_directory_failure_surfaces() {
        let fleet = Fleet::new();
        let _a = fleet.spawn(2, 1, Duration::ZERO);
        fleet.supervisor.fail_with("supervisor socket refused");
        let service = fleet.service_for(&fleet.local(1, 0));

        let err = service.get_aggregate_metrics(Some(TIMEOUT)).await.unwrap_err();

        assert!(matches!(err, ClusterError::DirectoryUnavailable(_)));
        assert_eq!(fleet.bus.packets_sent(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_identity_surfaces() {
        let fleet = Fleet::new();
        let _a = fleet.spawn(2, 1, Duration::ZERO);
        let me = fleet.local(1, 0);
        let directory =
            SiblingDirectory::new(fleet.supervisor.clone(), ProcessIdentity::unassigned(APP));
        let correlator =
            ReplyCorrelator::new(Broadcaster::new(fleet.bus.endpoint(pid(1)), directory));
        let service =
            AggregateMetricsService::cluster(Arc::clone(&me.source), Arc::new(correlator));

        let err = service.get_aggregate_metrics(Some(TIMEOUT)).await.unwrap_err();

        assert!(matches!(err, ClusterError::IdentityUnavailable(_)));
        assert_eq!(fleet.bus.packets_sent(), 0);
    }
}

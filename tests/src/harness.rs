//! Simulated fleet: several workers of one application sharing an
//! `InMemoryProcessBus`, each with its own Prometheus registry.

use async_trait::async_trait;
use fleet_telemetry::PrometheusSource;
use fm_01_process_directory::{ProcessIdentity, SiblingDirectory, StaticSupervisor};
use fm_02_cluster_broadcast::{Broadcaster, ReplyCorrelator, RequestHandler, Responder};
use fm_03_aggregate_metrics::{AggregateMetricsService, MetricsRequestHandler};
use prometheus::{IntCounter, Registry};
use serde_json::Value;
use shared_bus::{InMemoryEndpoint, InMemoryProcessBus, PacketSubscription, ProcessChannel};
use shared_types::{ClusterError, ProcessDescriptor, ProcessId, ProcessPacket, METRICS_GET_TOPIC};
use std::sync::Arc;
use std::time::Duration;

/// Application name shared by every simulated worker.
pub const APP: &str = "api";

/// Counter every worker exposes.
pub const JOBS: &str = "jobs_processed_total";

pub type FleetDirectory = SiblingDirectory<StaticSupervisor>;
pub type FleetBroadcaster = Broadcaster<InMemoryEndpoint, FleetDirectory>;
pub type FleetCorrelator = ReplyCorrelator<InMemoryEndpoint, FleetDirectory>;

pub fn pid(id: u32) -> ProcessId {
    ProcessId::new(id)
}

/// One simulated worker process.
pub struct Worker {
    pub id: ProcessId,
    pub jobs: IntCounter,
    /// Registry behind `source`; metrics registered here are reported.
    pub registry: Registry,
    pub source: Arc<PrometheusSource>,
    responder: Option<Responder<InMemoryEndpoint>>,
    _inbox: Option<PacketSubscription>,
}

impl Worker {
    fn new(id: u32, jobs: u64) -> Self {
        let registry = Registry::new();
        let counter = IntCounter::new(JOBS, "Jobs processed by this worker")
            .expect("valid counter");
        counter.inc_by(jobs);
        registry
            .register(Box::new(counter.clone()))
            .expect("fresh registry");

        Self {
            id: pid(id),
            jobs: counter,
            source: Arc::new(PrometheusSource::new(registry.clone())),
            registry,
            responder: None,
            _inbox: None,
        }
    }

    /// The worker's responder, if it answers requests.
    pub fn responder(&self) -> Option<&Responder<InMemoryEndpoint>> {
        self.responder.as_ref()
    }
}

/// Delays another handler.
pub struct Delayed<H> {
    pub inner: H,
    pub delay: Duration,
}

#[async_trait]
impl<H: RequestHandler> RequestHandler for Delayed<H> {
    async fn handle(&self, request: &ProcessPacket) -> Result<Value, ClusterError> {
        tokio::time::sleep(self.delay).await;
        self.inner.handle(request).await
    }
}

/// Answers with a fixed payload.
pub struct Fixed(pub Value);

#[async_trait]
impl RequestHandler for Fixed {
    async fn handle(&self, _request: &ProcessPacket) -> Result<Value, ClusterError> {
        Ok(self.0.clone())
    }
}

/// A bus plus the process table the supervisor reports.
pub struct Fleet {
    pub bus: Arc<InMemoryProcessBus>,
    pub supervisor: StaticSupervisor,
}

impl Default for Fleet {
    fn default() -> Self {
        Self::new()
    }
}

impl Fleet {
    pub fn new() -> Self {
        Self {
            bus: InMemoryProcessBus::new(),
            supervisor: StaticSupervisor::empty(),
        }
    }

    /// Online worker answering `metrics-get` with its snapshot after `delay`.
    pub fn spawn(&self, id: u32, jobs: u64, delay: Duration) -> Worker {
        let mut worker = Worker::new(id, jobs);
        let handler = Delayed {
            inner: MetricsRequestHandler::new(Arc::clone(&worker.source)),
            delay,
        };
        self.spawn_with(&mut worker, Arc::new(handler));
        worker
    }

    /// Online worker answering `metrics-get` with `handler`.
    pub fn spawn_answering(&self, id: u32, handler: Arc<dyn RequestHandler>) -> Worker {
        let mut worker = Worker::new(id, 0);
        self.spawn_with(&mut worker, handler);
        worker
    }

    /// Online worker whose inbox is open but which never answers.
    pub fn spawn_silent(&self, id: u32) -> Worker {
        let mut worker = Worker::new(id, 0);
        worker._inbox = Some(self.bus.endpoint(worker.id).subscribe());
        self.supervisor.upsert(ProcessDescriptor::online(worker.id, APP));
        worker
    }

    /// Worker not listed by the supervisor and not answering; used as the
    /// process issuing the aggregate request.
    pub fn local(&self, id: u32, jobs: u64) -> Worker {
        Worker::new(id, jobs)
    }

    fn spawn_with(&self, worker: &mut Worker, handler: Arc<dyn RequestHandler>) {
        let responder =
            Responder::new(self.bus.endpoint(worker.id)).with_handler(METRICS_GET_TOPIC, handler);
        responder.start();
        worker.responder = Some(responder);
        self.supervisor.upsert(ProcessDescriptor::online(worker.id, APP));
    }

    /// Directory as seen by process `id`.
    pub fn directory(&self, id: u32) -> FleetDirectory {
        SiblingDirectory::new(self.supervisor.clone(), ProcessIdentity::new(APP, pid(id)))
    }

    /// Broadcaster sending from process `id`.
    pub fn broadcaster(&self, id: u32) -> FleetBroadcaster {
        Broadcaster::new(self.bus.endpoint(pid(id)), self.directory(id))
    }

    /// Correlator owned by process `id`.
    pub fn correlator(&self, id: u32) -> FleetCorrelator {
        ReplyCorrelator::new(self.broadcaster(id))
    }

    /// Cluster-mode facade for `worker`.
    pub fn service_for(&self, worker: &Worker) -> AggregateMetricsService<PrometheusSource> {
        AggregateMetricsService::cluster(
            Arc::clone(&worker.source),
            Arc::new(self.correlator(worker.id.get())),
        )
    }
}

//! Prometheus metrics describing the cluster protocol itself.
//!
//! All metrics follow the naming convention: `fleet_<component>_<metric>`
//!
//! They live in the global `REGISTRY`, which is also what a process reports
//! as its local snapshot, so the fleet view includes protocol health.

use lazy_static::lazy_static;
use prometheus::{Counter, CounterVec, Gauge, Opts, Registry};

use crate::TelemetryError;

/// Outcome label values.
pub mod outcome {
    /// Broadcast send accepted by the transport.
    pub const SENT: &str = "sent";
    /// Broadcast send or reply send rejected by the transport.
    pub const FAILED: &str = "failed";
    /// Correlated request resolved with every expected reply.
    pub const RESOLVED: &str = "resolved";
    /// Correlated request hit its deadline.
    pub const TIMEOUT: &str = "timeout";
    /// Correlated request rejected because the topic was already outstanding.
    pub const IN_FLIGHT: &str = "in_flight";
    /// Correlated request failed for another reason.
    pub const ERROR: &str = "error";
    /// Responder handler could not compute an answer.
    pub const HANDLER_FAILED: &str = "handler_failed";
    /// Responder received a request without a reply destination.
    pub const MISSING_TARGET: &str = "missing_target";
}

lazy_static! {
    /// Global metrics registry
    pub static ref REGISTRY: Registry = Registry::new();

    // =========================================================================
    // BROADCASTER
    // =========================================================================

    /// Broadcasts issued by this process
    pub static ref BROADCASTS: Counter = Counter::new(
        "fleet_broadcasts_total",
        "Total number of request broadcasts issued"
    ).expect("metric creation failed");

    /// Individual sends performed during broadcasts
    pub static ref BROADCAST_SENDS: CounterVec = CounterVec::new(
        Opts::new("fleet_broadcast_sends_total", "Per-sibling broadcast sends"),
        &["outcome"]  // outcome: sent/failed
    ).expect("metric creation failed");

    // =========================================================================
    // REPLY CORRELATOR
    // =========================================================================

    /// Replies accepted toward an outstanding request
    pub static ref REPLIES_COLLECTED: Counter = Counter::new(
        "fleet_replies_collected_total",
        "Total replies matched to an outstanding request"
    ).expect("metric creation failed");

    /// Correlated requests by outcome
    pub static ref CORRELATOR_REQUESTS: CounterVec = CounterVec::new(
        Opts::new("fleet_correlator_requests_total", "Correlated requests by outcome"),
        &["outcome"]  // outcome: resolved/timeout/in_flight/error
    ).expect("metric creation failed");

    // =========================================================================
    // RESPONDER
    // =========================================================================

    /// Replies produced for sibling requests
    pub static ref RESPONDER_REPLIES: CounterVec = CounterVec::new(
        Opts::new("fleet_responder_replies_total", "Responder replies by outcome"),
        &["outcome"]  // outcome: sent/failed/handler_failed/missing_target
    ).expect("metric creation failed");

    // =========================================================================
    // PROCESS
    // =========================================================================

    /// Seconds since the process started
    pub static ref PROCESS_UPTIME: Gauge = Gauge::new(
        "fleet_process_uptime_seconds",
        "Seconds since the process started"
    ).expect("metric creation failed");
}

/// Register all metrics with the global registry.
///
/// Calling this more than once is harmless.
pub fn register_metrics() -> Result<(), TelemetryError> {
    let metrics: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(BROADCASTS.clone()),
        Box::new(BROADCAST_SENDS.clone()),
        Box::new(REPLIES_COLLECTED.clone()),
        Box::new(CORRELATOR_REQUESTS.clone()),
        Box::new(RESPONDER_REPLIES.clone()),
        Box::new(PROCESS_UPTIME.clone()),
    ];

    for metric in metrics {
        match REGISTRY.register(metric) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => {}
            Err(e) => return Err(TelemetryError::MetricsInit(e.to_string())),
        }
    }

    Ok(())
}

/// Record one broadcast and the outcome of each of its sends.
pub fn record_broadcast(sent: usize, failed: usize) {
    BROADCASTS.inc();
    BROADCAST_SENDS
        .with_label_values(&[outcome::SENT])
        .inc_by(sent as f64);
    BROADCAST_SENDS
        .with_label_values(&[outcome::FAILED])
        .inc_by(failed as f64);
}

/// Record a reply matched to an outstanding request.
pub fn record_reply_collected() {
    REPLIES_COLLECTED.inc();
}

/// Record how a correlated request ended.
pub fn record_correlator_outcome(outcome: &str) {
    CORRELATOR_REQUESTS.with_label_values(&[outcome]).inc();
}

/// Record how the responder handled a request.
pub fn record_responder_outcome(outcome: &str) {
    RESPONDER_REPLIES.with_label_values(&[outcome]).inc();
}

/// Set the process uptime gauge.
pub fn set_uptime(seconds: f64) {
    PROCESS_UPTIME.set(seconds);
}

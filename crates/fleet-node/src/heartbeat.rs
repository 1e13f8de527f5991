//! Uptime heartbeat driven by the Sync Timer.
//!
//! Each beat refreshes `fleet_process_uptime_seconds` and arms the next
//! boundary from inside the callback.

use fleet_telemetry::metrics::set_uptime;
use fm_03_aggregate_metrics::{schedule_at_next_boundary, BoundaryTimer, TimerError};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

struct HeartbeatInner {
    period: Duration,
    started: Instant,
    beats: AtomicU64,
    stopped: AtomicBool,
    current: Mutex<Option<BoundaryTimer>>,
}

/// Re-arming wall-clock heartbeat.
pub struct Heartbeat {
    inner: Arc<HeartbeatInner>,
}

impl Heartbeat {
    /// Start beating at every wall-clock boundary of `period`.
    ///
    /// # Errors
    ///
    /// Returns `TimerError` if the first boundary cannot be scheduled.
    pub fn start(period: Duration) -> Result<Self, TimerError> {
        let inner = Arc::new(HeartbeatInner {
            period,
            started: Instant::now(),
            beats: AtomicU64::new(0),
            stopped: AtomicBool::new(false),
            current: Mutex::new(None),
        });
        arm(&inner)?;
        Ok(Self { inner })
    }

    /// Beats so far.
    pub fn beats(&self) -> u64 {
        self.inner.beats.load(Ordering::SeqCst)
    }

    /// Cancel the pending boundary. No further beats happen.
    pub fn stop(&self) {
        self.inner.stopped.store(true, Ordering::SeqCst);
        if let Some(timer) = self.inner.current.lock().take() {
            timer.cancel();
        }
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        self.stop();
    }
}

fn arm(inner: &Arc<HeartbeatInner>) -> Result<(), TimerError> {
    let next = Arc::clone(inner);
    let timer = schedule_at_next_boundary(inner.period, move || beat(&next))?;
    *inner.current.lock() = Some(timer);
    Ok(())
}

fn beat(inner: &Arc<HeartbeatInner>) {
    if inner.stopped.load(Ordering::SeqCst) {
        return;
    }

    let uptime = inner.started.elapsed().as_secs_f64();
    set_uptime(uptime);
    let beats = inner.beats.fetch_add(1, Ordering::SeqCst) + 1;
    debug!(beats, uptime_secs = uptime, "Heartbeat");

    if let Err(e) = arm(inner) {
        warn!(error = %e, "Failed to re-arm heartbeat");
    }
}

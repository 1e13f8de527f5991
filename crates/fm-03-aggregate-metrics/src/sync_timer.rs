//! Sync Timer
//!
//! One-shot callback at the next wall-clock instant that is a multiple of a
//! period. Callers wanting a heartbeat re-schedule from inside the callback.
//!
//! The timer runs as a detached tokio task: dropping the [`BoundaryTimer`]
//! does not cancel it, and a pending timer never keeps the runtime from
//! shutting down.

use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

/// Errors raised while computing a boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    /// Period is zero or does not fit in milliseconds.
    #[error("Invalid timer period: {0:?}")]
    InvalidPeriod(Duration),

    /// The system clock reads earlier than the Unix epoch.
    #[error("System clock is before the Unix epoch")]
    ClockBeforeEpoch,
}

/// Delay from `now_since_epoch` to the next multiple of `period`.
///
/// Millisecond resolution. On an exact boundary the delay is a full period.
///
/// # Errors
///
/// `InvalidPeriod` for a zero period.
pub fn next_boundary_delay(
    now_since_epoch: Duration,
    period: Duration,
) -> Result<Duration, TimerError> {
    let period_ms = period.as_millis();
    if period_ms == 0 {
        return Err(TimerError::InvalidPeriod(period));
    }

    let delay_ms = period_ms - now_since_epoch.as_millis() % period_ms;
    let delay_ms = u64::try_from(delay_ms).map_err(|_| TimerError::InvalidPeriod(period))?;
    Ok(Duration::from_millis(delay_ms))
}

/// Schedule `callback` at the next boundary of `period` after `now_since_epoch`.
///
/// Must be called inside a tokio runtime.
///
/// # Errors
///
/// `InvalidPeriod` for a zero period.
pub fn schedule_from<F>(
    now_since_epoch: Duration,
    period: Duration,
    callback: F,
) -> Result<BoundaryTimer, TimerError>
where
    F: FnOnce() + Send + 'static,
{
    let delay = next_boundary_delay(now_since_epoch, period)?;
    debug!(delay_ms = delay.as_millis() as u64, "Boundary timer scheduled");

    let handle = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        trace!("Boundary reached");
        callback();
    });

    Ok(BoundaryTimer { handle, delay })
}

/// Schedule `callback` at the next wall-clock boundary of `period`.
///
/// # Errors
///
/// - `InvalidPeriod` for a zero period
/// - `ClockBeforeEpoch` if the system clock is unusable
pub fn schedule_at_next_boundary<F>(
    period: Duration,
    callback: F,
) -> Result<BoundaryTimer, TimerError>
where
    F: FnOnce() + Send + 'static,
{
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| TimerError::ClockBeforeEpoch)?;
    schedule_from(now, period, callback)
}

/// Handle to a pending boundary callback.
#[derive(Debug)]
pub struct BoundaryTimer {
    handle: JoinHandle<()>,
    delay: Duration,
}

impl BoundaryTimer {
    /// Delay computed at scheduling time.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns true once the callback ran or the timer was cancelled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancel the callback if it has not run yet.
    pub fn cancel(&self) {
        self.handle.abort();
    }
}

//! # FM-03 Aggregate Metrics
//!
//! The single entry point a scrape handler needs: "give me the metrics of
//! the whole fleet".
//!
//! ## Architecture
//!
//! - **Ports Layer** (`ports/`): `ReplyCollector`, the driven port onto the
//!   cluster request/reply protocol
//! - **Adapters Layer** (`adapters/`): `ReplyCollector` for `ReplyCorrelator`
//! - **Service Layer** (`service/`):
//!   - `AggregateMetricsService`: local registry in single-process mode,
//!     broadcast + merge in cluster mode
//!   - `MetricsRequestHandler`: answers `metrics-get` with the local snapshot
//! - **Sync Timer** (`sync_timer`): one-shot callback at the next wall-clock
//!   boundary of a period
//!
//! ## Failure Policy
//!
//! An aggregate either includes every sibling or fails. `Timeout`,
//! `IdentityUnavailable` and `DirectoryUnavailable` reach the caller
//! unchanged; nothing is retried and no partial merge is returned.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod ports;
pub mod service;
pub mod sync_timer;

pub use ports::ReplyCollector;
pub use service::{AggregateMetricsService, MetricsRequestHandler};
pub use sync_timer::{
    next_boundary_delay, schedule_at_next_boundary, schedule_from, BoundaryTimer, TimerError,
};

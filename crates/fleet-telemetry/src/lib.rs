//! # Fleet Telemetry
//!
//! The metrics library every fleet process links against.
//!
//! ## Components
//!
//! - **Snapshots**: serializable point-in-time copy of a process's registry
//!   (`MetricsSnapshot`), captured through the `MetricsSource` port.
//! - **Merging**: `merge_snapshots` folds the snapshots of many processes into
//!   one `MergedRegistry` that renders as Prometheus text exposition.
//! - **Self-metrics**: counters describing the cluster protocol itself.
//! - **Logging**: `init_logging` installs the `tracing` subscriber.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fleet_telemetry::{merge_snapshots, AggregationPolicy, MetricsSource, PrometheusSource};
//!
//! let local = PrometheusSource::global().snapshot()?;
//! let merged = merge_snapshots(&[local, remote], &AggregationPolicy::default());
//! println!("{}", merged.encode()?);
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `FLEET_APP_NAME` | `fleet-app` | Service name in log records |
//! | `FLEET_LOG_LEVEL` / `RUST_LOG` | `info` | Log level filter |
//! | `FLEET_JSON_LOGS` | `false` | JSON formatted logs |

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod aggregate;
mod config;
mod exposition;
mod logging;
pub mod metrics;
mod snapshot;

pub use aggregate::{merge_snapshots, AggregationPolicy, Aggregator, MergedRegistry};
pub use config::TelemetryConfig;
pub use exposition::CONTENT_TYPE;
pub use logging::init_logging;
pub use metrics::{register_metrics, REGISTRY};
pub use snapshot::{
    HistogramBucket, MetricFamilySnapshot, MetricKind, MetricSample, MetricsSnapshot,
    MetricsSource, PrometheusSource, SampleValue, SummaryQuantile,
};

use thiserror::Error;

/// Telemetry errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    #[error("Failed to initialize Prometheus metrics: {0}")]
    MetricsInit(String),

    #[error("Failed to capture metrics snapshot: {0}")]
    Snapshot(String),

    #[error("Failed to encode metrics: {0}")]
    Encode(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

//! Service layer

pub mod aggregate;
pub mod handler;

pub use aggregate::AggregateMetricsService;
pub use handler::MetricsRequestHandler;

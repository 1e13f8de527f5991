//! Cross-crate scenarios.

mod aggregate_flow;
mod merge_properties;
mod protocol_flow;

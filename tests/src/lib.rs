//! # Fleet Metrics Test Suite
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # Simulated fleet on one InMemoryProcessBus
//! └── integration/      # Cross-crate scenarios
//!     ├── aggregate_flow.rs
//!     ├── protocol_flow.rs
//!     └── merge_properties.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p fleet-tests
//! cargo test -p fleet-tests integration::aggregate_flow
//! ```

pub mod harness;
pub mod integration;

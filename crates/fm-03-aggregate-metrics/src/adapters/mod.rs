//! Adapters Layer

pub mod correlator;

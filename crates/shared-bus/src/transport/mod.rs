//! Transports that carry packets between real OS processes.

#[cfg(unix)]
pub mod unix;

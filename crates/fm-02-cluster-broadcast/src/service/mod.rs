//! Service layer

pub mod broadcaster;
pub mod correlator;
pub mod responder;

pub use broadcaster::Broadcaster;
pub use correlator::ReplyCorrelator;
pub use responder::{RequestHandler, Responder};

//! Domain layer: correlation state without I/O.

pub mod pending;
pub mod registry;

pub use pending::{OfferOutcome, PendingRequest, PendingState};
pub use registry::{InFlightTopics, TopicRegistration};

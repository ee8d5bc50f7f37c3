//! Sync outbox domain entities.

pub mod dead_letter;
pub mod model;
pub mod status;

pub use dead_letter::DeadLetterEntry;
pub use model::{NewOutboxEntry, OutboxEntry};
pub use status::OutboxStatus;

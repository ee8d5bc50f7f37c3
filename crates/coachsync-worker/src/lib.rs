//! Background delivery engine for CoachSync.
//!
//! This crate provides:
//! - The sync outbox dispatcher that propagates local writes upstream
//! - The reminder planner that reconciles notification jobs per user
//! - The push delivery worker with quiet hours, retries and dead-lettering
//! - The upstream mirror used by the periodic resync and user poll
//! - HTTP transports for the push gateway and the upstream record store
//! - The worker loop that drives all of the above

pub mod dispatcher;
pub mod mirror;
pub mod notification;
pub mod runner;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use dispatcher::OutboxDispatcher;
pub use mirror::UpstreamMirror;
pub use notification::{NotificationPlanner, NotificationWorker};
pub use runner::WorkerLoop;

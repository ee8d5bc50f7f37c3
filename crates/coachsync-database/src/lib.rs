//! # coachsync-database
//!
//! PostgreSQL connection management, the store traits the engine is
//! written against, and their sqlx repository implementations.

pub mod connection;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use store::{
    DeliveryLogStore, JobStore, MirrorStore, OutboxStore, PreferenceStore, ScheduleSource,
    SubscriptionStore, UserDirectory,
};

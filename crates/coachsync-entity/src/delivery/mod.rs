//! Delivery audit entities.

pub mod log;

pub use log::{DeliveryLogEntry, NewDeliveryLog};

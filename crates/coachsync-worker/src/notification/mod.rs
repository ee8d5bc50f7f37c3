//! Reminder planning, payload localization and push delivery.

pub mod payload;
pub mod planner;
pub mod worker;

pub use payload::Locale;
pub use planner::{NotificationPlanner, PlanOutcome, PlanningSummary};
pub use worker::{JobOutcome, NotificationWorker};

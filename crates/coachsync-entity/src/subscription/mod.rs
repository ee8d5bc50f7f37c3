//! Push subscription domain entities.

pub mod model;
pub mod status;

pub use model::PushSubscription;
pub use status::SubscriptionStatus;

//! Repository implementations for every store trait.

pub mod delivery_log;
pub mod mirror;
pub mod notification_job;
pub mod outbox;
pub mod preference;
pub mod schedule;
pub mod subscription;
pub mod user;

pub use delivery_log::DeliveryLogRepository;
pub use mirror::MirrorRepository;
pub use notification_job::NotificationJobRepository;
pub use outbox::OutboxRepository;
pub use preference::PreferenceRepository;
pub use schedule::ScheduleRepository;
pub use subscription::SubscriptionRepository;
pub use user::UserRepository;

//! Notification domain entities.

pub mod job;
pub mod preference;
pub mod status;

pub use job::{JobCandidate, NotificationJob};
pub use preference::{NotificationPreference, PreferenceUpdate, RawPreference, ReminderMode};
pub use status::{NotificationJobStatus, NotificationMode};

//! Transport traits defined in `coachsync-core` and implemented by the
//! worker crate.

pub mod push;
pub mod upstream;

pub use push::{PushError, PushTarget, PushTransport};
pub use upstream::{UpstreamClient, UpstreamError, UpstreamEvent, UpstreamRecord};

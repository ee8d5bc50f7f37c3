//! # coachsync-core
//!
//! Core crate for the CoachSync delivery engine. Contains configuration
//! schemas, the unified error system, timezone and quiet-hours helpers,
//! and the transport traits implemented by the worker crate.
//!
//! This crate has **no** internal dependencies on other CoachSync crates.

pub mod config;
pub mod error;
pub mod result;
pub mod time;
pub mod traits;

pub use error::{AppError, FailureKind};
pub use result::AppResult;

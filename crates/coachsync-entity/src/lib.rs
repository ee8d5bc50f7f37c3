//! # coachsync-entity
//!
//! Domain entity models for the CoachSync delivery engine. Every struct in
//! this crate represents a database table row or a domain value object.
//! Database entities derive `sqlx::FromRow`; status columns map onto
//! PostgreSQL enums through `sqlx::Type`.

pub mod delivery;
pub mod notification;
pub mod outbox;
pub mod schedule;
pub mod subscription;
pub mod user;

//! Domain layer containing notification types and the client-side store.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `notification` - Notification records, alert severities and the store

pub mod foundation;
pub mod notification;

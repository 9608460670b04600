//! Notification REST adapters.
//!
//! - `HttpNotificationApi` - reqwest client for the LoopFund REST service
//! - `InMemoryNotificationApi` - configurable in-memory service for tests

mod http_api;
mod in_memory_api;
mod responses;

pub use http_api::HttpNotificationApi;
pub use in_memory_api::{InMemoryNotificationApi, MethodCall};
pub use responses::{parse_created, parse_listing, parse_stats, parse_unread_count};

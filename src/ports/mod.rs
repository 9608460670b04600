//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the notification core and the outside world. Adapters implement these
//! ports.
//!
//! - `NotificationApi` - The REST notification service (fetch, stats,
//!   create, read state, archive)
//! - `AlertSink` - Where toast alerts for pushed notifications go

mod alert_sink;
mod notification_api;

pub use alert_sink::AlertSink;
pub use notification_api::{
    ApiError, NewNotification, NotificationApi, NotificationBatch, NotificationQuery,
    NotificationStats,
};

//! Response body shapes of the notification REST service.
//!
//! The service has answered `GET /notifications` in several shapes over
//! time. All of them are accepted here and nowhere else:
//!
//! ```text
//! { "data": { "notifications": [...], "unreadCount": n } }
//! { "notifications": [...], "unreadCount": n }
//! { "success": true, "data": [...], "pagination": {...} }
//! [ ... ]
//! ```
//!
//! When the body carries no unread count it is computed from the records.
//! Single-record and stats bodies come either wrapped in `data` or bare.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::notification::Notification;
use crate::ports::{ApiError, NotificationBatch, NotificationStats};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Listing {
    notifications: Vec<Notification>,
    #[serde(default)]
    unread_count: Option<usize>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ListBody {
    Nested { data: Listing },
    Flat(Listing),
    Wrapped { data: Vec<Notification> },
    Bare(Vec<Notification>),
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Count {
    unread_count: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CountBody {
    Nested { data: Count },
    Flat(Count),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RecordBody {
    Wrapped { data: Notification },
    Bare(Notification),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StatsBody {
    Wrapped { data: NotificationStats },
    Bare(NotificationStats),
}

/// Parses a `GET /notifications` body.
pub fn parse_listing(body: Value) -> Result<NotificationBatch, ApiError> {
    let parsed: ListBody = serde_json::from_value(body)
        .map_err(|_| ApiError::invalid_response("no notification list in body"))?;

    let batch = match parsed {
        ListBody::Nested { data } | ListBody::Flat(data) => match data.unread_count {
            Some(unread_count) => NotificationBatch {
                notifications: data.notifications,
                unread_count,
            },
            None => NotificationBatch::from_records(data.notifications),
        },
        ListBody::Wrapped { data } | ListBody::Bare(data) => NotificationBatch::from_records(data),
    };
    Ok(batch)
}

/// Parses a `GET /notifications/unread-count` body.
pub fn parse_unread_count(body: Value) -> Result<usize, ApiError> {
    let parsed: CountBody = serde_json::from_value(body)
        .map_err(|_| ApiError::invalid_response("no unreadCount in body"))?;

    Ok(match parsed {
        CountBody::Nested { data } | CountBody::Flat(data) => data.unread_count,
    })
}

/// Parses a `POST /notifications` body.
pub fn parse_created(body: Value) -> Result<Notification, ApiError> {
    let parsed: RecordBody = serde_json::from_value(body)
        .map_err(|_| ApiError::invalid_response("no notification in body"))?;

    Ok(match parsed {
        RecordBody::Wrapped { data } | RecordBody::Bare(data) => data,
    })
}

/// Parses a `GET /notifications/stats` body.
pub fn parse_stats(body: Value) -> Result<NotificationStats, ApiError> {
    if !body.is_object() {
        return Err(ApiError::invalid_response("stats body is not an object"));
    }
    let parsed: StatsBody = serde_json::from_value(body)
        .map_err(|e| ApiError::invalid_response(format!("malformed stats: {}", e)))?;

    Ok(match parsed {
        StatsBody::Wrapped { data } | StatsBody::Bare(data) => data,
    })
}

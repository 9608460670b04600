//! NotificationApi port - the REST notification service as seen by the client.
//!
//! The service itself is an external collaborator. This port fixes the
//! contract the client relies on: list, unread count, statistics, creation
//! and the read/archive mutations. Every call is authenticated with the
//! session's bearer token, which the adapter owns. Without a token no
//! request leaves the client.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::foundation::{NotificationId, Timestamp};
use crate::domain::notification::{
    Notification, NotificationCategory, NotificationKind, NotificationPriority,
};

/// One page of notifications plus the server's unread total.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NotificationBatch {
    pub notifications: Vec<Notification>,
    /// Total unread on the server, across all pages.
    pub unread_count: usize,
}

impl NotificationBatch {
    /// Builds a batch whose unread count is taken from its own records.
    pub fn from_records(notifications: Vec<Notification>) -> Self {
        let unread_count = notifications.iter().filter(|n| !n.is_read).count();
        Self {
            notifications,
            unread_count,
        }
    }
}

/// Filters for `GET /notifications`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<NotificationKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<NotificationCategory>,
}

impl NotificationQuery {
    /// First page with the given size.
    pub fn first_page(limit: u32) -> Self {
        Self {
            page: Some(1),
            limit: Some(limit),
            ..Default::default()
        }
    }

    pub fn unread_only(mut self) -> Self {
        self.is_read = Some(false);
        self
    }
}

/// Body of `POST /notifications`.
///
/// The service fills in `info`/`system`/`medium` for omitted display fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNotification {
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub category: NotificationCategory,
    pub priority: NotificationPriority,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
}

impl NewNotification {
    pub fn new(
        user_id: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            title: title.into(),
            message: message.into(),
            kind: NotificationKind::default(),
            category: NotificationCategory::default(),
            priority: NotificationPriority::default(),
            metadata: None,
            expires_at: None,
        }
    }

    pub fn with_kind(mut self, kind: NotificationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_category(mut self, category: NotificationCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_priority(mut self, priority: NotificationPriority) -> Self {
        self.priority = priority;
        self
    }

    /// Rejects bodies the service would answer with 400.
    pub fn validate(&self) -> Result<(), ApiError> {
        let missing: Vec<&str> = [
            ("userId", &self.user_id),
            ("title", &self.title),
            ("message", &self.message),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ApiError::InvalidRequest(format!(
                "missing required field(s): {}",
                missing.join(", ")
            )))
        }
    }
}

/// Aggregate counts from `GET /notifications/stats`.
///
/// Breakdown keys are the wire names (`"warning"`, `"goal"`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationStats {
    pub total: usize,
    pub unread: usize,
    pub archived: usize,
    #[serde(alias = "byType")]
    pub by_kind: BTreeMap<String, usize>,
    pub by_category: BTreeMap<String, usize>,
}

/// Errors from the notification REST service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    /// Bearer token missing, expired or rejected.
    #[error("authentication failed")]
    Unauthorized,

    /// The notification does not exist for this user.
    #[error("notification not found: {0}")]
    NotFound(String),

    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// Connection-level failure.
    #[error("network error: {0}")]
    Network(String),

    /// Non-success status not covered above.
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Body did not match any accepted shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Request rejected locally before sending.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Client could not be constructed (TLS backend, bad header value).
    #[error("client setup failed: {0}")]
    Setup(String),
}

impl ApiError {
    pub fn network(message: impl Into<String>) -> Self {
        ApiError::Network(message.into())
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        ApiError::InvalidResponse(message.into())
    }

    /// Whether retrying the same call later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Timeout { .. } | ApiError::Network(_) => true,
            ApiError::Status { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

/// Port for the notification REST service.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// Replaces the bearer token. `None` signs the client out; every call
    /// then fails with `Unauthorized` without reaching the network.
    fn set_credential(&self, credential: Option<&str>);

    /// `GET /notifications`
    async fn fetch_notifications(
        &self,
        query: &NotificationQuery,
    ) -> Result<NotificationBatch, ApiError>;

    /// `GET /notifications/unread-count`
    async fn fetch_unread_count(&self) -> Result<usize, ApiError>;

    /// `GET /notifications/stats`
    async fn fetch_stats(&self) -> Result<NotificationStats, ApiError>;

    /// `POST /notifications`
    async fn create_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, ApiError>;

    /// `PUT /notifications/:id/read`
    async fn mark_read(&self, id: &NotificationId) -> Result<(), ApiError>;

    /// `PUT /notifications/mark-all-read`
    async fn mark_all_read(&self) -> Result<(), ApiError>;

    /// `PUT /notifications/:id/archive`
    async fn archive(&self, id: &NotificationId) -> Result<(), ApiError>;

    /// `PUT /notifications/archive` with `{ "notificationIds": [...] }`
    async fn archive_many(&self, ids: &[NotificationId]) -> Result<(), ApiError>;

    /// `DELETE /notifications/:id`
    async fn delete(&self, id: &NotificationId) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::Notification;

    // Compile-time check that trait is object-safe
    #[allow(dead_code)]
    fn assert_object_safe(_: &dyn NotificationApi) {}

    #[test]
    fn batch_from_records_counts_unread() {
        let batch = NotificationBatch::from_records(vec![
            Notification::new(NotificationId::new("a").unwrap()),
            Notification::new(NotificationId::new("b").unwrap()).read(),
        ]);
        assert_eq!(batch.unread_count, 1);
    }

    #[test]
    fn query_serializes_only_set_fields() {
        let query = NotificationQuery::first_page(20).unread_only();
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value, serde_json::json!({"page": 1, "limit": 20, "isRead": false}));
    }

    #[test]
    fn query_uses_backend_name_for_kind() {
        let query = NotificationQuery {
            kind: Some(NotificationKind::Warning),
            ..Default::default()
        };
        let value = serde_json::to_value(&query).unwrap();
        assert_eq!(value, serde_json::json!({"type": "warning"}));
    }

    #[test]
    fn new_notification_uses_backend_field_names() {
        let body = NewNotification::new("u1", "Goal Reminder", "Due in 2 days")
            .with_kind(NotificationKind::Warning)
            .with_category(NotificationCategory::Goal)
            .with_priority(NotificationPriority::High);

        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "userId": "u1",
                "title": "Goal Reminder",
                "message": "Due in 2 days",
                "type": "warning",
                "category": "goal",
                "priority": "high"
            })
        );
    }

    #[test]
    fn new_notification_requires_user_title_and_message() {
        assert!(NewNotification::new("u1", "t", "m").validate().is_ok());

        let err = NewNotification::new(" ", "t", "").validate().unwrap_err();
        assert_eq!(
            err,
            ApiError::InvalidRequest("missing required field(s): userId, message".to_string())
        );
    }

    #[test]
    fn stats_accept_partial_bodies() {
        let stats: NotificationStats =
            serde_json::from_value(serde_json::json!({"total": 4, "byType": {"info": 3}})).unwrap();
        assert_eq!(stats.total, 4);
        assert_eq!(stats.unread, 0);
        assert_eq!(stats.by_kind.get("info"), Some(&3));
        assert!(stats.by_category.is_empty());
    }

    #[test]
    fn transient_errors() {
        assert!(ApiError::Timeout { timeout_secs: 5 }.is_transient());
        assert!(ApiError::network("reset").is_transient());
        assert!(ApiError::Status { status: 503, body: String::new() }.is_transient());
        assert!(!ApiError::Unauthorized.is_transient());
        assert!(!ApiError::NotFound("x".into()).is_transient());
        assert!(!ApiError::InvalidRequest("x".into()).is_transient());
    }
}

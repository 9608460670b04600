//! Notification record as delivered by the REST API and the push channel.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{NotificationId, Timestamp};

/// Display kind of a notification.
///
/// Determines how the toast is styled but has no effect on storage.
/// Anything the server sends outside the known set becomes `Unknown`
/// instead of failing the whole record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum NotificationKind {
    Success,
    Error,
    Warning,
    Achievement,
    #[default]
    Info,
    Unknown,
}

impl From<String> for NotificationKind {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "success" => Self::Success,
            "error" => Self::Error,
            "warning" => Self::Warning,
            "achievement" => Self::Achievement,
            "info" => Self::Info,
            _ => Self::Unknown,
        }
    }
}

/// Feature area that produced the notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum NotificationCategory {
    Goal,
    Group,
    Achievement,
    #[default]
    System,
    Reminder,
    Payment,
}

impl From<String> for NotificationCategory {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "goal" => Self::Goal,
            "group" => Self::Group,
            "achievement" => Self::Achievement,
            "reminder" => Self::Reminder,
            "payment" => Self::Payment,
            _ => Self::System,
        }
    }
}

/// Server-side priority hint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum NotificationPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl From<String> for NotificationPriority {
    fn from(value: String) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "low" => Self::Low,
            "high" => Self::High,
            _ => Self::Medium,
        }
    }
}

/// A single notification.
///
/// `title`, `message` and `metadata` are opaque display payload. The wire
/// format from the backend uses `_id` and `type`; both spellings are
/// accepted alongside `id` and `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(alias = "_id")]
    pub id: NotificationId,

    #[serde(default, alias = "type")]
    pub kind: NotificationKind,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub message: String,

    #[serde(default)]
    pub category: NotificationCategory,

    #[serde(default)]
    pub priority: NotificationPriority,

    /// Flips false → true only, never back, within a session.
    #[serde(default)]
    pub is_read: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl Notification {
    /// Creates an unread `info` notification with empty display text.
    pub fn new(id: NotificationId) -> Self {
        Self {
            id,
            kind: NotificationKind::default(),
            title: String::new(),
            message: String::new(),
            category: NotificationCategory::default(),
            priority: NotificationPriority::default(),
            is_read: false,
            created_at: None,
            expires_at: None,
            metadata: None,
        }
    }

    pub fn with_kind(mut self, kind: NotificationKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_text(mut self, title: impl Into<String>, message: impl Into<String>) -> Self {
        self.title = title.into();
        self.message = message.into();
        self
    }

    pub fn read(mut self) -> Self {
        self.is_read = true;
        self
    }

    /// Whether the server-set expiry has passed.
    pub fn is_expired(&self, now: &Timestamp) -> bool {
        self.expires_at.is_some_and(|at| at.is_before(now))
    }
}

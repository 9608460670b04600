//! Transient toast alerts raised for push-delivered notifications.

use serde::Serialize;

use super::{Notification, NotificationKind};
use crate::domain::foundation::NotificationId;

/// Toast severity. Every notification kind maps to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Success,
    Error,
    Warning,
    Achievement,
    Info,
}

impl From<NotificationKind> for AlertSeverity {
    fn from(kind: NotificationKind) -> Self {
        match kind {
            NotificationKind::Success => AlertSeverity::Success,
            NotificationKind::Error => AlertSeverity::Error,
            NotificationKind::Warning => AlertSeverity::Warning,
            NotificationKind::Achievement => AlertSeverity::Achievement,
            NotificationKind::Info | NotificationKind::Unknown => AlertSeverity::Info,
        }
    }
}

/// An ephemeral alert for the UI layer to surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub severity: AlertSeverity,
    pub notification_id: NotificationId,
    pub title: String,
    pub message: String,
}

impl Alert {
    pub fn for_notification(notification: &Notification) -> Self {
        Self {
            severity: notification.kind.into(),
            notification_id: notification.id.clone(),
            title: notification.title.clone(),
            message: notification.message.clone(),
        }
    }
}

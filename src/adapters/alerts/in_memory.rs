//! In-memory alert sink for testing.

use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::foundation::NotificationId;
use crate::domain::notification::Alert;
use crate::ports::AlertSink;

/// Collects raised alerts in order.
///
/// Clones share the same buffer, so a test can keep one handle and give
/// another to the code under test.
#[derive(Debug, Clone, Default)]
pub struct InMemoryAlertSink {
    alerts: Arc<Mutex<Vec<Alert>>>,
}

impl InMemoryAlertSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All alerts raised so far.
    pub fn alerts(&self) -> Vec<Alert> {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.alerts.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of alerts raised for `id`.
    pub fn count_for(&self, id: &NotificationId) -> usize {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|a| &a.notification_id == id)
            .count()
    }
}

impl AlertSink for InMemoryAlertSink {
    fn raise(&self, alert: Alert) {
        self.alerts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(alert);
    }
}

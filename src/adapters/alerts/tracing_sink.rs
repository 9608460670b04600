use crate::domain::notification::{Alert, AlertSeverity};
use crate::ports::AlertSink;

/// Writes alerts to the log. Error alerts are logged at `warn`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

impl TracingAlertSink {
    pub fn new() -> Self {
        Self
    }
}

impl AlertSink for TracingAlertSink {
    fn raise(&self, alert: Alert) {
        match alert.severity {
            AlertSeverity::Error | AlertSeverity::Warning => tracing::warn!(
                severity = ?alert.severity,
                notification_id = %alert.notification_id,
                title = %alert.title,
                "{}",
                alert.message
            ),
            _ => tracing::info!(
                severity = ?alert.severity,
                notification_id = %alert.notification_id,
                title = %alert.title,
                "{}",
                alert.message
            ),
        }
    }
}

//! AlertSink port - where transient toast alerts are surfaced.

use crate::domain::notification::Alert;

/// Receives alerts raised for newly delivered notifications.
///
/// Implementations must not block; the reconciler calls this inline while
/// processing a frame.
pub trait AlertSink: Send + Sync {
    fn raise(&self, alert: Alert);
}

//! DeliveryReconciler - routes inbound push frames into the store.
//!
//! For each frame:
//! 1. Parse; a malformed frame is logged and dropped
//! 2. Non-notification tags are ignored
//! 3. Already-expired notifications are dropped
//! 4. Notification frames are upserted by id; an alert is raised only when
//!    the id was not already known

use std::sync::Arc;

use super::SharedNotificationStore;
use crate::adapters::websocket::InboundFrame;
use crate::domain::foundation::{NotificationId, Timestamp};
use crate::domain::notification::{Alert, PrependOutcome};
use crate::ports::AlertSink;

/// What happened to one inbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// New notification stored at the head; alert raised.
    Inserted(NotificationId),
    /// Redelivery of a known id; record updated in place, no alert.
    Updated(NotificationId),
    /// Notification whose expiry already passed; dropped without alert.
    Expired(NotificationId),
    /// Well-formed frame of a type this client does not handle.
    Ignored { tag: String },
    /// Frame could not be parsed; nothing changed.
    Malformed,
}

pub struct DeliveryReconciler {
    store: SharedNotificationStore,
    alerts: Arc<dyn AlertSink>,
}

impl DeliveryReconciler {
    pub fn new(store: SharedNotificationStore, alerts: Arc<dyn AlertSink>) -> Self {
        Self { store, alerts }
    }

    /// Handles one raw text frame from the push channel.
    pub async fn handle_frame(&self, text: &str) -> FrameOutcome {
        let notification = match InboundFrame::parse(text) {
            Ok(InboundFrame::Notification(notification)) => notification,
            Ok(InboundFrame::Other { tag }) => {
                tracing::debug!(tag = %tag, "Ignoring push frame");
                return FrameOutcome::Ignored { tag };
            }
            Err(e) => {
                tracing::warn!("Discarding malformed push frame: {}", e);
                return FrameOutcome::Malformed;
            }
        };

        let id = notification.id.clone();
        if notification.is_expired(&Timestamp::now()) {
            tracing::debug!(notification_id = %id, "Dropping expired push notification");
            return FrameOutcome::Expired(id);
        }

        let alert = Alert::for_notification(&notification);

        match self.store.mutate(|s| s.prepend(notification)).await {
            PrependOutcome::Inserted => {
                tracing::debug!(notification_id = %id, "Push notification stored");
                self.alerts.raise(alert);
                FrameOutcome::Inserted(id)
            }
            PrependOutcome::Updated => {
                tracing::debug!(notification_id = %id, "Push redelivery merged into existing record");
                FrameOutcome::Updated(id)
            }
        }
    }
}

//! WebSocket message types for push-delivered notifications.
//!
//! Server → Client frames look like
//! `{"type": "notification", "notification": {...}}`. Any other `type` is
//! accepted and ignored. Outbound messages are caller-defined JSON.

use serde::Deserialize;

use crate::domain::notification::Notification;

/// Frame discriminant that carries a notification.
pub const NOTIFICATION_FRAME: &str = "notification";

/// A parsed inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// New or redelivered notification.
    Notification(Notification),

    /// Well-formed frame with a tag this client does not handle.
    Other { tag: String },
}

/// Why a frame could not be interpreted.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("frame could not be decoded: {0}")]
    Syntax(#[source] serde_json::Error),

    #[error("frame has no string 'type' field")]
    MissingTag,

    #[error("'{tag}' frame payload is invalid: {source}")]
    Payload {
        tag: String,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Deserialize)]
struct RawFrame {
    #[serde(rename = "type")]
    tag: Option<String>,
    #[serde(default)]
    notification: Option<serde_json::Value>,
}

impl InboundFrame {
    /// Parses one text frame.
    ///
    /// The tag is read first so that unknown frame types are recognised as
    /// well-formed even when their payload would not match anything here.
    pub fn parse(text: &str) -> Result<Self, FrameError> {
        let raw: RawFrame = serde_json::from_str(text).map_err(FrameError::Syntax)?;
        let tag = raw.tag.ok_or(FrameError::MissingTag)?;

        if tag != NOTIFICATION_FRAME {
            return Ok(InboundFrame::Other { tag });
        }

        let payload = raw.notification.unwrap_or(serde_json::Value::Null);
        let notification = serde_json::from_value(payload)
            .map_err(|source| FrameError::Payload { tag, source })?;
        Ok(InboundFrame::Notification(notification))
    }
}

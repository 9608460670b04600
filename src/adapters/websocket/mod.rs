//! WebSocket adapters for real-time notification delivery.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     ConnectionManager                                │
//! │   - Derives wss://host/ws?token=… from the REST origin              │
//! │   - Reconnects with exponential backoff + jitter                     │
//! │   - Publishes ConnectionState on a watch channel                     │
//! └─────────────────────────────────────────────────────────────────────┘
//!                                     │
//!                                     │ raw text frames
//!                                     ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                DeliveryReconciler (application)                      │
//! │   InboundFrame::parse → NotificationStore + AlertSink               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`endpoint`] - Push endpoint derivation
//! - [`messages`] - Frame protocol types
//! - [`backoff`] - Reconnect delay policy
//! - [`connection`] - Connection lifecycle

pub mod backoff;
pub mod connection;
pub mod endpoint;
pub mod messages;

pub use backoff::Backoff;
pub use connection::{ConnectionManager, ConnectionState, FrameReceiver};
pub use endpoint::WsEndpoint;
pub use messages::{FrameError, InboundFrame, NOTIFICATION_FRAME};

use thiserror::Error;

/// Errors setting up the push transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid push endpoint: {0}")]
    InvalidEndpoint(String),
}

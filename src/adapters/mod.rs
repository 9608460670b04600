//! Adapters - Implementations of port interfaces.
//!
//! - `notifications` - REST notification service clients
//! - `websocket` - Push channel transport
//! - `alerts` - Alert sinks

pub mod alerts;
pub mod notifications;
pub mod websocket;

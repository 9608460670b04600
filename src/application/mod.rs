//! Application layer - reconciliation and read-state orchestration.
//!
//! Coordinates the notification store with its two producers (REST pull
//! and push delivery) and with server-confirmed read-state changes.

mod read_state;
mod reconciler;
mod session;
mod store;

pub use read_state::{ReadStateSynchronizer, SyncOutcome};
pub use reconciler::{DeliveryReconciler, FrameOutcome};
pub use session::{NotificationSession, RefreshOutcome, SessionSettings};
pub use store::SharedNotificationStore;

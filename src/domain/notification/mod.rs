//! Notification domain: records, alert severities and the client-side store.

mod alert;
mod record;
mod store;

pub use alert::{Alert, AlertSeverity};
pub use record::{Notification, NotificationCategory, NotificationKind, NotificationPriority};
pub use store::{NotificationStore, PrependOutcome};

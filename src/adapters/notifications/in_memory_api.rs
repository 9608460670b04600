//! In-memory notification service for testing.
//!
//! Provides a configurable implementation of `NotificationApi` for unit
//! and integration tests. Supports:
//! - A server-side notification list that the create/read/archive calls mutate
//! - Signing out via `set_credential(None)`
//! - Error injection, once or per method
//! - Artificial latency (for cancellation tests)
//! - Call tracking

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::foundation::{NotificationId, Timestamp};
use crate::domain::notification::Notification;
use crate::ports::{
    ApiError, NewNotification, NotificationApi, NotificationBatch, NotificationQuery,
    NotificationStats,
};

/// In-memory notification service.
///
/// # Example
///
/// ```ignore
/// let api = InMemoryNotificationApi::with_notifications(vec![n1, n2]);
/// api.set_method_error("mark_read", ApiError::network("offline"));
///
/// let result = api.mark_read(&n1.id).await;
/// assert!(api.was_called("mark_read"));
/// ```
#[derive(Clone, Default)]
pub struct InMemoryNotificationApi {
    inner: Arc<Mutex<MockState>>,
}

#[derive(Default)]
struct MockState {
    /// Server-side records, newest first.
    notifications: Vec<Notification>,

    /// Reported unread total; computed from records when unset.
    unread_override: Option<usize>,

    /// Records archived so far (they leave `notifications`).
    archived: usize,

    /// Set by `set_credential(None)`; every call is then unauthorized.
    signed_out: bool,

    /// Error to return on the next call to any method.
    next_error: Option<ApiError>,

    /// Errors returned by a specific method until cleared.
    method_errors: HashMap<String, ApiError>,

    /// Delay applied before every call.
    latency: Option<Duration>,

    call_log: Vec<MethodCall>,
}

/// Recorded method call for assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodCall {
    pub method: String,
    pub args: Vec<String>,
}

impl InMemoryNotificationApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a service holding `notifications` (newest first).
    pub fn with_notifications(notifications: Vec<Notification>) -> Self {
        let api = Self::new();
        api.state().notifications = notifications;
        api
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Configuration Methods
    // ════════════════════════════════════════════════════════════════════════════

    /// Replaces the server-side records.
    pub fn set_notifications(&self, notifications: Vec<Notification>) {
        self.state().notifications = notifications;
    }

    /// Adds a record at the head of the server-side list.
    pub fn push(&self, notification: Notification) {
        self.state().notifications.insert(0, notification);
    }

    /// Overrides the reported unread total.
    pub fn set_unread_count(&self, count: Option<usize>) {
        self.state().unread_override = count;
    }

    /// Set an error to return on the next call to any method.
    pub fn set_error(&self, error: ApiError) {
        self.state().next_error = Some(error);
    }

    /// Set an error for a specific method (e.g. `"mark_read"`).
    pub fn set_method_error(&self, method: &str, error: ApiError) {
        self.state()
            .method_errors
            .insert(method.to_string(), error);
    }

    /// Clear all configured errors.
    pub fn clear_errors(&self) {
        let mut state = self.state();
        state.next_error = None;
        state.method_errors.clear();
    }

    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = Some(latency);
    }

    /// Whether the last `set_credential` call signed the client out.
    pub fn is_signed_out(&self) -> bool {
        self.state().signed_out
    }

    // ════════════════════════════════════════════════════════════════════════════
    // Inspection
    // ════════════════════════════════════════════════════════════════════════════

    /// Get all recorded method calls.
    pub fn calls(&self) -> Vec<MethodCall> {
        self.state().call_log.clone()
    }

    /// Check if a method was called.
    pub fn was_called(&self, method: &str) -> bool {
        self.call_count(method) > 0
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.state()
            .call_log
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Server-side copy of a record.
    pub fn server_record(&self, id: &NotificationId) -> Option<Notification> {
        self.state()
            .notifications
            .iter()
            .find(|n| &n.id == id)
            .cloned()
    }

    /// Records the call, waits out any latency, then returns the injected
    /// error for `method` if there is one.
    async fn begin(&self, method: &str, args: Vec<String>) -> Result<(), ApiError> {
        let latency = {
            let mut state = self.state();
            state.call_log.push(MethodCall {
                method: method.to_string(),
                args,
            });
            state.latency
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let mut state = self.state();
        if state.signed_out {
            return Err(ApiError::Unauthorized);
        }
        if let Some(error) = state.next_error.take() {
            return Err(error);
        }
        match state.method_errors.get(method) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NotificationApi for InMemoryNotificationApi {
    fn set_credential(&self, credential: Option<&str>) {
        self.state().signed_out = credential.map_or(true, |c| c.trim().is_empty());
    }

    async fn fetch_notifications(
        &self,
        query: &NotificationQuery,
    ) -> Result<NotificationBatch, ApiError> {
        self.begin("fetch_notifications", vec![format!("{:?}", query)])
            .await?;

        let state = self.state();
        let filtered: Vec<Notification> = state
            .notifications
            .iter()
            .filter(|n| query.is_read.map_or(true, |is_read| n.is_read == is_read))
            .filter(|n| query.kind.map_or(true, |kind| n.kind == kind))
            .filter(|n| query.category.map_or(true, |category| n.category == category))
            .cloned()
            .collect();

        let limit = query.limit.map_or(filtered.len(), |l| l as usize);
        let skip = query.page.map_or(0, |p| p.saturating_sub(1) as usize) * limit;
        let page = filtered.into_iter().skip(skip).take(limit).collect();

        let unread_count = state
            .unread_override
            .unwrap_or_else(|| state.notifications.iter().filter(|n| !n.is_read).count());

        Ok(NotificationBatch {
            notifications: page,
            unread_count,
        })
    }

    async fn fetch_unread_count(&self) -> Result<usize, ApiError> {
        self.begin("fetch_unread_count", vec![]).await?;

        let state = self.state();
        Ok(state
            .unread_override
            .unwrap_or_else(|| state.notifications.iter().filter(|n| !n.is_read).count()))
    }

    async fn fetch_stats(&self) -> Result<NotificationStats, ApiError> {
        self.begin("fetch_stats", vec![]).await?;

        let state = self.state();
        let mut stats = NotificationStats {
            total: state.notifications.len() + state.archived,
            unread: state.notifications.iter().filter(|n| !n.is_read).count(),
            archived: state.archived,
            ..Default::default()
        };
        for record in &state.notifications {
            *stats.by_kind.entry(wire_name(&record.kind)).or_default() += 1;
            *stats.by_category.entry(wire_name(&record.category)).or_default() += 1;
        }
        Ok(stats)
    }

    async fn create_notification(
        &self,
        notification: &NewNotification,
    ) -> Result<Notification, ApiError> {
        self.begin("create_notification", vec![notification.title.clone()])
            .await?;
        notification.validate()?;

        let id = NotificationId::new(Uuid::new_v4().simple().to_string())
            .map_err(|e| ApiError::invalid_response(e.to_string()))?;
        let mut created = Notification::new(id)
            .with_kind(notification.kind)
            .with_text(notification.title.clone(), notification.message.clone());
        created.category = notification.category;
        created.priority = notification.priority;
        created.metadata = notification.metadata.clone();
        created.expires_at = notification.expires_at;
        created.created_at = Some(Timestamp::now());

        self.state().notifications.insert(0, created.clone());
        Ok(created)
    }

    async fn mark_read(&self, id: &NotificationId) -> Result<(), ApiError> {
        self.begin("mark_read", vec![id.to_string()]).await?;

        let mut state = self.state();
        let record = state
            .notifications
            .iter_mut()
            .find(|n| &n.id == id)
            .ok_or_else(|| ApiError::NotFound(id.to_string()))?;
        record.is_read = true;
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<(), ApiError> {
        self.begin("mark_all_read", vec![]).await?;

        let mut state = self.state();
        for record in state.notifications.iter_mut() {
            record.is_read = true;
        }
        state.unread_override = None;
        Ok(())
    }

    async fn archive(&self, id: &NotificationId) -> Result<(), ApiError> {
        self.begin("archive", vec![id.to_string()]).await?;
        self.remove(id)?;
        self.state().archived += 1;
        Ok(())
    }

    async fn archive_many(&self, ids: &[NotificationId]) -> Result<(), ApiError> {
        self.begin("archive_many", ids.iter().map(ToString::to_string).collect())
            .await?;

        let mut state = self.state();
        let before = state.notifications.len();
        state.notifications.retain(|n| !ids.contains(&n.id));
        let archived = before - state.notifications.len();
        state.archived += archived;
        Ok(())
    }

    async fn delete(&self, id: &NotificationId) -> Result<(), ApiError> {
        self.begin("delete", vec![id.to_string()]).await?;
        self.remove(id)
    }
}

/// Wire spelling of a serde enum value (`"warning"`, `"goal"`).
fn wire_name<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(name)) => name,
        _ => String::new(),
    }
}

impl InMemoryNotificationApi {
    fn remove(&self, id: &NotificationId) -> Result<(), ApiError> {
        let mut state = self.state();
        let before = state.notifications.len();
        state.notifications.retain(|n| &n.id != id);
        if state.notifications.len() == before {
            return Err(ApiError::NotFound(id.to_string()));
        }
        Ok(())
    }
}

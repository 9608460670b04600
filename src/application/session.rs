//! NotificationSession - one authenticated user's notification feed.
//!
//! Owns every resource tied to the session's lifetime:
//!
//! ```text
//! start(credential)
//!   ├─ REST refresh ──────────────► SharedNotificationStore ◄──┐
//!   ├─ ConnectionManager ─frames─► DeliveryReconciler ────────┤
//!   └─ optional poll task ─► REST refresh                      │
//! mark_read / mark_all_read / archive(_many) / delete          │
//!   └─ ReadStateSynchronizer ─(after server confirms)──────────┘
//! create_notification ─► POST, then REST refresh
//! ```
//!
//! Refreshes drop records whose `expiresAt` has passed.
//!
//! `logout()` (or `start` with a blank credential) signs the REST client
//! out, closes the push connection and empties the store; the session can
//! be started again. `shutdown()` (or drop) cancels the session token: the
//! push connection is closed, background tasks stop, and in-flight REST
//! calls complete without touching the store.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::{DeliveryReconciler, ReadStateSynchronizer, SharedNotificationStore, SyncOutcome};
use crate::adapters::websocket::{ConnectionManager, ConnectionState, FrameReceiver};
use crate::config::{AppConfig, RealtimeConfig};
use crate::domain::foundation::{NotificationId, Timestamp};
use crate::domain::notification::{Notification, NotificationStore};
use crate::ports::{
    AlertSink, ApiError, NewNotification, NotificationApi, NotificationQuery, NotificationStats,
};

/// Session wiring taken from configuration.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// REST origin; the push endpoint is derived from it.
    pub api_base: String,
    pub page_size: u32,
    pub poll_interval: Option<Duration>,
    pub realtime: RealtimeConfig,
}

impl SessionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            api_base: config.api.base_url.clone(),
            page_size: config.api.page_size,
            poll_interval: config.api.poll_interval(),
            realtime: config.realtime.clone(),
        }
    }
}

/// Result of a REST refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshOutcome {
    /// Store updated from the server.
    Loaded { notifications: usize, unread: usize },
    /// Server call failed; the store keeps its previous state.
    Failed(ApiError),
    /// Session shut down before the call completed.
    Abandoned,
}

/// State shared with the session's background tasks.
struct Shared {
    api: Arc<dyn NotificationApi>,
    store: SharedNotificationStore,
    reconciler: DeliveryReconciler,
    page_size: u32,
    in_flight: AtomicUsize,
    cancel: CancellationToken,
}

impl Shared {
    async fn refresh(&self) -> RefreshOutcome {
        let query = NotificationQuery::first_page(self.page_size);
        let result = self.during_load(self.api.fetch_notifications(&query)).await;

        match result {
            Some(Ok(batch)) => {
                self.apply(move |store| {
                    store.replace_all(batch.notifications, batch.unread_count);
                    purge(store);
                })
                .await
            }
            Some(Err(e)) => {
                tracing::warn!("Notification refresh failed, keeping previous state: {}", e);
                RefreshOutcome::Failed(e)
            }
            None => RefreshOutcome::Abandoned,
        }
    }

    async fn refresh_unread_count(&self) -> RefreshOutcome {
        match self.during_load(self.api.fetch_unread_count()).await {
            Some(Ok(count)) => {
                self.apply(move |store| store.set_server_unread_count(count))
                    .await
            }
            Some(Err(e)) => {
                tracing::warn!("Unread count refresh failed: {}", e);
                RefreshOutcome::Failed(e)
            }
            None => RefreshOutcome::Abandoned,
        }
    }

    /// Awaits `call` with the loading flag raised, unless the session ends
    /// first.
    async fn during_load<T>(&self, call: impl Future<Output = T>) -> Option<T> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            result = call => Some(result),
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn apply(&self, f: impl FnOnce(&mut NotificationStore)) -> RefreshOutcome {
        let cancel = &self.cancel;
        self.store
            .mutate(|store| {
                if cancel.is_cancelled() {
                    return RefreshOutcome::Abandoned;
                }
                f(store);
                RefreshOutcome::Loaded {
                    notifications: store.len(),
                    unread: store.unread_count(),
                }
            })
            .await
    }

    async fn purge_expired(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.store.mutate(purge).await;
    }

    async fn pump_frames(&self, mut frames: FrameReceiver) {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                frame = frames.recv() => match frame {
                    Some(text) => {
                        self.reconciler.handle_frame(&text).await;
                    }
                    None => break,
                },
            }
        }
        tracing::debug!("Push frame pump stopped");
    }

    async fn poll(&self, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick completes immediately; the initial load already ran.
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    tracing::debug!("Polling notifications");
                    if !matches!(self.refresh().await, RefreshOutcome::Loaded { .. }) {
                        self.purge_expired().await;
                    }
                }
            }
        }
    }
}

/// Drops expired records from `store`.
fn purge(store: &mut NotificationStore) {
    let purged = store.purge_expired(&Timestamp::now());
    if purged > 0 {
        tracing::debug!(purged, "Dropped expired notifications");
    }
}

/// The notification feed of one authenticated session.
pub struct NotificationSession {
    shared: Arc<Shared>,
    read_state: ReadStateSynchronizer,
    connection: Mutex<ConnectionManager>,
    realtime_enabled: bool,
    poll_interval: Option<Duration>,
    poll_started: AtomicBool,
    /// Frame pump of the current push connection.
    push_task: Mutex<Option<JoinHandle<()>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl NotificationSession {
    pub fn new(
        api: Arc<dyn NotificationApi>,
        alerts: Arc<dyn AlertSink>,
        settings: SessionSettings,
    ) -> Self {
        let store = SharedNotificationStore::new();
        let cancel = CancellationToken::new();

        let shared = Arc::new(Shared {
            api: Arc::clone(&api),
            store: store.clone(),
            reconciler: DeliveryReconciler::new(store.clone(), alerts),
            page_size: settings.page_size,
            in_flight: AtomicUsize::new(0),
            cancel: cancel.clone(),
        });

        Self {
            shared,
            read_state: ReadStateSynchronizer::new(api, store, cancel),
            realtime_enabled: settings.realtime.enabled,
            connection: Mutex::new(ConnectionManager::new(settings.api_base, settings.realtime)),
            poll_interval: settings.poll_interval,
            poll_started: AtomicBool::new(false),
            push_task: Mutex::new(None),
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Signs in with `credential`, loads the first page, then opens the push
    /// channel.
    ///
    /// Calling again with a new credential replaces the push connection. A
    /// blank credential signs the session out (see [`Self::logout`]) and
    /// reports `Unauthorized`. Must be called within a Tokio runtime.
    pub async fn start(&self, credential: &str) -> RefreshOutcome {
        let credential = credential.trim();
        if credential.is_empty() {
            tracing::info!("No credential, signing notification session out");
            self.logout().await;
            return RefreshOutcome::Failed(ApiError::Unauthorized);
        }
        self.shared.api.set_credential(Some(credential));

        let outcome = self.shared.refresh().await;
        if self.shared.cancel.is_cancelled() {
            return RefreshOutcome::Abandoned;
        }

        if self.realtime_enabled {
            self.open_push(credential);
        } else {
            tracing::info!("Real-time delivery disabled, REST only");
        }

        if let Some(interval) = self.poll_interval {
            if !self.poll_started.swap(true, Ordering::SeqCst) {
                let shared = Arc::clone(&self.shared);
                let handle = tokio::spawn(async move { shared.poll(interval).await });
                lock(&self.tasks).push(handle);
            }
        }

        outcome
    }

    fn open_push(&self, credential: &str) {
        let frames = lock(&self.connection).connect(credential);
        if let Some(previous) = lock(&self.push_task).take() {
            previous.abort();
        }
        let Some(frames) = frames else {
            return;
        };

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move { shared.pump_frames(frames).await });
        *lock(&self.push_task) = Some(handle);
    }

    /// Clears the credential: REST calls stop authenticating, the push
    /// connection closes and the store is emptied. Background polling keeps
    /// running but fails with `Unauthorized` until `start` is called again.
    pub async fn logout(&self) {
        self.shared.api.set_credential(None);
        lock(&self.connection).close();

        // Frames already queued must not land after the store is cleared.
        let pump = lock(&self.push_task).take();
        if let Some(pump) = pump {
            pump.abort();
            let _ = pump.await;
        }

        if !self.shared.cancel.is_cancelled() {
            self.shared.store.mutate(|store| store.clear()).await;
        }
        tracing::debug!("Notification session signed out");
    }

    /// Re-fetches the first page and replaces the store contents.
    pub async fn refresh(&self) -> RefreshOutcome {
        self.shared.refresh().await
    }

    /// Reconciles the badge with `GET /notifications/unread-count`.
    pub async fn refresh_unread_count(&self) -> RefreshOutcome {
        self.shared.refresh_unread_count().await
    }

    pub async fn mark_read(&self, id: &NotificationId) -> SyncOutcome {
        self.read_state.mark_one_read(id).await
    }

    pub async fn mark_all_read(&self) -> SyncOutcome {
        self.read_state.mark_all_read().await
    }

    pub async fn archive(&self, id: &NotificationId) -> SyncOutcome {
        self.read_state.archive(id).await
    }

    pub async fn archive_many(&self, ids: &[NotificationId]) -> SyncOutcome {
        self.read_state.archive_many(ids).await
    }

    pub async fn delete(&self, id: &NotificationId) -> SyncOutcome {
        self.read_state.delete(id).await
    }

    /// `POST /notifications`, then reloads the list and the unread count.
    ///
    /// The new record is not inserted locally; it arrives with the refresh
    /// (or with the push frame the server sends for it). A failed refresh
    /// does not undo a confirmed creation.
    pub async fn create_notification(&self, notification: &NewNotification) -> SyncOutcome {
        let created = self
            .shared
            .during_load(self.shared.api.create_notification(notification))
            .await;

        match created {
            Some(Ok(record)) => {
                tracing::debug!(notification_id = %record.id, "Notification created");
                if self.shared.refresh().await == RefreshOutcome::Abandoned {
                    return SyncOutcome::Abandoned;
                }
                self.shared.refresh_unread_count().await;
                SyncOutcome::Confirmed
            }
            Some(Err(e)) => {
                tracing::warn!("Notification creation rejected: {}", e);
                SyncOutcome::Rejected(e)
            }
            None => SyncOutcome::Abandoned,
        }
    }

    /// `GET /notifications/stats`. Read-only; the store is not touched.
    pub async fn stats(&self) -> Result<NotificationStats, ApiError> {
        self.shared.api.fetch_stats().await
    }

    /// Sends a JSON message over the push channel if it is open.
    pub fn send<T: Serialize>(&self, payload: &T) -> bool {
        lock(&self.connection).send(payload)
    }

    /// Whether a REST load is in flight.
    pub fn is_loading(&self) -> bool {
        self.shared.in_flight.load(Ordering::SeqCst) > 0
    }

    pub fn store(&self) -> &SharedNotificationStore {
        &self.shared.store
    }

    pub async fn notifications(&self) -> Vec<Notification> {
        self.shared.store.snapshot().await
    }

    pub async fn unread_count(&self) -> usize {
        self.shared.store.unread_count().await
    }

    pub fn subscribe_unread(&self) -> watch::Receiver<usize> {
        self.shared.store.subscribe_unread()
    }

    pub fn connection_state(&self) -> ConnectionState {
        lock(&self.connection).state()
    }

    pub fn subscribe_connection(&self) -> watch::Receiver<ConnectionState> {
        lock(&self.connection).subscribe()
    }

    /// Ends the session. Safe to call more than once.
    pub fn shutdown(&self) {
        if !self.shared.cancel.is_cancelled() {
            tracing::debug!("Shutting down notification session");
        }
        self.shared.cancel.cancel();
        lock(&self.connection).close();
        lock(&self.push_task).take();
        lock(&self.tasks).clear();
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }
}

impl Drop for NotificationSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::alerts::InMemoryAlertSink;
    use crate::adapters::notifications::InMemoryNotificationApi;

    fn id(s: &str) -> NotificationId {
        NotificationId::new(s).unwrap()
    }

    fn settings() -> SessionSettings {
        SessionSettings {
            api_base: "http://127.0.0.1:9/api".to_string(),
            page_size: 20,
            poll_interval: None,
            realtime: RealtimeConfig {
                enabled: false,
                ..Default::default()
            },
        }
    }

    fn seeded_api() -> InMemoryNotificationApi {
        InMemoryNotificationApi::with_notifications(vec![
            Notification::new(id("a")),
            Notification::new(id("b")).read(),
        ])
    }

    fn session(api: &InMemoryNotificationApi, settings: SessionSettings) -> NotificationSession {
        NotificationSession::new(
            Arc::new(api.clone()),
            Arc::new(InMemoryAlertSink::new()),
            settings,
        )
    }

    #[tokio::test]
    async fn start_loads_first_page() {
        let api = seeded_api();
        let session = session(&api, settings());

        let outcome = session.start("token").await;

        assert_eq!(
            outcome,
            RefreshOutcome::Loaded {
                notifications: 2,
                unread: 1
            }
        );
        assert_eq!(session.unread_count().await, 1);
        assert!(!session.is_loading());
        assert_eq!(session.connection_state(), ConnectionState::Idle);
    }

    #[tokio::test]
    async fn failed_refresh_keeps_previous_state() {
        let api = seeded_api();
        let session = session(&api, settings());
        session.start("token").await;

        api.set_error(ApiError::Status {
            status: 503,
            body: "maintenance".to_string(),
        });
        let outcome = session.refresh().await;

        assert!(matches!(outcome, RefreshOutcome::Failed(_)));
        assert_eq!(session.notifications().await.len(), 2);
        assert_eq!(session.unread_count().await, 1);
    }

    #[tokio::test]
    async fn unread_count_refresh_includes_unlisted() {
        let api = seeded_api();
        let session = session(&api, settings());
        session.start("token").await;

        api.set_unread_count(Some(12));
        let outcome = session.refresh_unread_count().await;

        assert_eq!(
            outcome,
            RefreshOutcome::Loaded {
                notifications: 2,
                unread: 12
            }
        );
        session.mark_read(&id("a")).await;
        assert_eq!(session.unread_count().await, 11);
    }

    #[tokio::test]
    async fn is_loading_while_fetch_in_flight() {
        let api = seeded_api();
        api.set_latency(Duration::from_millis(100));
        let session = Arc::new(session(&api, settings()));

        let background = Arc::clone(&session);
        let refresh = tokio::spawn(async move { background.refresh().await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(session.is_loading());
        refresh.await.unwrap();
        assert!(!session.is_loading());
    }

    #[tokio::test]
    async fn badge_feed_tracks_read_state() {
        let api = seeded_api();
        let session = session(&api, settings());
        let mut badge = session.subscribe_unread();
        session.start("token").await;
        assert_eq!(*badge.borrow_and_update(), 1);

        session.mark_all_read().await;
        assert_eq!(*badge.borrow_and_update(), 0);
    }

    #[tokio::test]
    async fn shutdown_abandons_in_flight_mark_read() {
        let api = seeded_api();
        let session = Arc::new(session(&api, settings()));
        session.start("token").await;
        api.set_latency(Duration::from_millis(200));

        let background = Arc::clone(&session);
        let pending = tokio::spawn(async move { background.mark_read(&id("a")).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        session.shutdown();

        assert_eq!(pending.await.unwrap(), SyncOutcome::Abandoned);
        assert_eq!(session.unread_count().await, 1);
        assert!(session.is_shut_down());
        assert_eq!(session.refresh().await, RefreshOutcome::Abandoned);
    }

    #[tokio::test]
    async fn blank_credential_signs_out_without_push_channel() {
        let api = seeded_api();
        let settings = SessionSettings {
            realtime: RealtimeConfig::default(),
            ..settings()
        };
        let session = session(&api, settings);

        let outcome = session.start("  ").await;

        assert_eq!(outcome, RefreshOutcome::Failed(ApiError::Unauthorized));
        assert!(api.is_signed_out());
        assert!(!api.was_called("fetch_notifications"));
        assert_eq!(session.connection_state(), ConnectionState::Idle);
        assert!(!session.send(&serde_json::json!({"type": "hello"})));
    }

    #[tokio::test]
    async fn logout_clears_store_and_credential() {
        let api = seeded_api();
        let session = session(&api, settings());
        session.start("token").await;
        api.set_unread_count(Some(7));
        session.refresh_unread_count().await;
        let mut badge = session.subscribe_unread();

        session.logout().await;

        assert!(session.notifications().await.is_empty());
        assert_eq!(*badge.borrow_and_update(), 0);
        assert_eq!(
            session.refresh().await,
            RefreshOutcome::Failed(ApiError::Unauthorized)
        );
        assert!(!session.is_shut_down());

        let outcome = session.start("second-token").await;
        assert_eq!(
            outcome,
            RefreshOutcome::Loaded {
                notifications: 2,
                unread: 7
            }
        );
    }

    #[tokio::test]
    async fn refresh_drops_expired_records() {
        let api = seeded_api();
        let mut stale = Notification::new(id("stale"));
        stale.expires_at = Some(serde_json::from_str("\"2020-01-01T00:00:00Z\"").unwrap());
        api.push(stale);
        api.set_unread_count(Some(2));
        let session = session(&api, settings());

        let outcome = session.start("token").await;

        assert_eq!(
            outcome,
            RefreshOutcome::Loaded {
                notifications: 2,
                unread: 1
            }
        );
        assert!(!session.store().read(|s| s.contains(&id("stale"))).await);
    }

    #[tokio::test]
    async fn create_notification_reloads_feed() {
        let api = seeded_api();
        let session = session(&api, settings());
        session.start("token").await;

        let outcome = session
            .create_notification(&NewNotification::new("u1", "Welcome", "Start saving"))
            .await;

        assert_eq!(outcome, SyncOutcome::Confirmed);
        let notifications = session.notifications().await;
        assert_eq!(notifications.len(), 3);
        assert_eq!(notifications[0].title, "Welcome");
        assert_eq!(session.unread_count().await, 2);
        assert!(api.was_called("fetch_unread_count"));
    }

    #[tokio::test]
    async fn rejected_create_leaves_feed_alone() {
        let api = seeded_api();
        let session = session(&api, settings());
        session.start("token").await;

        let outcome = session
            .create_notification(&NewNotification::new("", "Welcome", "Start saving"))
            .await;

        assert!(matches!(outcome, SyncOutcome::Rejected(ApiError::InvalidRequest(_))));
        assert_eq!(session.notifications().await.len(), 2);
        assert_eq!(api.call_count("fetch_notifications"), 1);
    }

    #[tokio::test]
    async fn stats_and_bulk_archive() {
        let api = seeded_api();
        let session = session(&api, settings());
        session.start("token").await;

        assert!(session.archive_many(&[id("a"), id("b")]).await.is_confirmed());
        assert!(session.notifications().await.is_empty());
        assert_eq!(session.unread_count().await, 0);

        let stats = session.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.archived, 2);
        assert_eq!(stats.unread, 0);
    }

    #[tokio::test]
    async fn poll_refreshes_periodically() {
        let api = seeded_api();
        let settings = SessionSettings {
            poll_interval: Some(Duration::from_millis(30)),
            ..settings()
        };
        let session = session(&api, settings);
        session.start("token").await;

        api.push(Notification::new(id("fresh")));
        tokio::time::sleep(Duration::from_millis(150)).await;

        assert!(api.call_count("fetch_notifications") >= 2);
        assert_eq!(session.notifications().await[0].id, id("fresh"));
        session.shutdown();
    }
}

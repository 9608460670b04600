//! ReadStateSynchronizer - server-confirmed read, archive (single and bulk)
//! and delete.
//!
//! Every operation issues the REST call first and mutates the local store
//! only after the server confirms it. A failed call leaves the store as it
//! was, so the badge may over-count but never under-counts.
//!
//! Calls race the owner's cancellation token. Once the owner is gone a
//! completing call is abandoned and the store is not touched.

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::SharedNotificationStore;
use crate::domain::foundation::NotificationId;
use crate::domain::notification::NotificationStore;
use crate::ports::{ApiError, NotificationApi};

/// Result of a server-confirmed state change.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Server accepted the change and the store reflects it.
    Confirmed,
    /// Server call failed; the store is unchanged.
    Rejected(ApiError),
    /// Owner went away before the call completed; the store is unchanged.
    Abandoned,
}

impl SyncOutcome {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, SyncOutcome::Confirmed)
    }
}

pub struct ReadStateSynchronizer {
    api: Arc<dyn NotificationApi>,
    store: SharedNotificationStore,
    cancel: CancellationToken,
}

impl ReadStateSynchronizer {
    pub fn new(
        api: Arc<dyn NotificationApi>,
        store: SharedNotificationStore,
        cancel: CancellationToken,
    ) -> Self {
        Self { api, store, cancel }
    }

    /// `PUT /notifications/:id/read`, then marks the record read.
    ///
    /// There is no local pre-check: an already-read id still makes the
    /// round trip, and the store update is then a no-op.
    pub async fn mark_one_read(&self, id: &NotificationId) -> SyncOutcome {
        let outcome = self
            .confirm("mark_read", id.as_str(), self.api.mark_read(id))
            .await;
        if outcome.is_confirmed() {
            self.apply(|store| {
                store.mark_read(id);
            })
            .await
        } else {
            outcome
        }
    }

    /// `PUT /notifications/mark-all-read`, then marks every record read.
    pub async fn mark_all_read(&self) -> SyncOutcome {
        let outcome = self
            .confirm("mark_all_read", "*", self.api.mark_all_read())
            .await;
        if outcome.is_confirmed() {
            self.apply(|store| store.mark_all_read()).await
        } else {
            outcome
        }
    }

    /// `PUT /notifications/:id/archive`, then removes the record.
    pub async fn archive(&self, id: &NotificationId) -> SyncOutcome {
        let outcome = self
            .confirm("archive", id.as_str(), self.api.archive(id))
            .await;
        if outcome.is_confirmed() {
            self.apply(|store| {
                store.remove(id);
            })
            .await
        } else {
            outcome
        }
    }

    /// `PUT /notifications/archive` for several ids, then removes them all.
    ///
    /// An empty slice is confirmed without a server call.
    pub async fn archive_many(&self, ids: &[NotificationId]) -> SyncOutcome {
        if ids.is_empty() {
            return SyncOutcome::Confirmed;
        }
        let subject = format!("{} notifications", ids.len());
        let outcome = self
            .confirm("archive_many", &subject, self.api.archive_many(ids))
            .await;
        if outcome.is_confirmed() {
            self.apply(|store| {
                for id in ids {
                    store.remove(id);
                }
            })
            .await
        } else {
            outcome
        }
    }

    /// `DELETE /notifications/:id`, then removes the record.
    pub async fn delete(&self, id: &NotificationId) -> SyncOutcome {
        let outcome = self
            .confirm("delete", id.as_str(), self.api.delete(id))
            .await;
        if outcome.is_confirmed() {
            self.apply(|store| {
                store.remove(id);
            })
            .await
        } else {
            outcome
        }
    }

    /// Awaits the server call unless the owner cancels first.
    async fn confirm(
        &self,
        operation: &'static str,
        subject: &str,
        call: impl Future<Output = Result<(), ApiError>>,
    ) -> SyncOutcome {
        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                tracing::debug!(operation, subject, "Read-state call abandoned by owner");
                return SyncOutcome::Abandoned;
            }
            result = call => result,
        };

        match result {
            Ok(()) => SyncOutcome::Confirmed,
            Err(e) => {
                tracing::warn!(
                    operation,
                    subject,
                    "Read-state change rejected, store left unchanged: {}",
                    e
                );
                SyncOutcome::Rejected(e)
            }
        }
    }

    /// Applies a confirmed change unless the owner has gone.
    async fn apply(&self, f: impl FnOnce(&mut NotificationStore)) -> SyncOutcome {
        let cancel = &self.cancel;
        self.store
            .mutate(|store| {
                if cancel.is_cancelled() {
                    return SyncOutcome::Abandoned;
                }
                f(store);
                SyncOutcome::Confirmed
            })
            .await
    }
}

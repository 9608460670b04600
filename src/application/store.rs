//! SharedNotificationStore - the store as shared by every producer.
//!
//! The REST refresh, the push pump and the read-state synchronizer all
//! mutate the same `NotificationStore`. Each mutation runs under one write
//! lock, so mutations never interleave; ordering between producers is
//! last-writer-wins.

use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use crate::domain::notification::{Notification, NotificationStore};

/// Cloneable handle to a notification store with an unread badge feed.
#[derive(Clone)]
pub struct SharedNotificationStore {
    inner: Arc<RwLock<NotificationStore>>,
    unread: Arc<watch::Sender<usize>>,
}

impl Default for SharedNotificationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedNotificationStore {
    pub fn new() -> Self {
        let (unread, _) = watch::channel(0);
        Self {
            inner: Arc::new(RwLock::new(NotificationStore::new())),
            unread: Arc::new(unread),
        }
    }

    /// Applies `f` under the write lock and republishes the unread count.
    pub async fn mutate<R>(&self, f: impl FnOnce(&mut NotificationStore) -> R) -> R {
        let mut store = self.inner.write().await;
        let result = f(&mut *store);
        let count = store.unread_count();
        self.unread.send_if_modified(|current| {
            if *current == count {
                return false;
            }
            *current = count;
            true
        });
        result
    }

    /// Runs `f` against the current state under the read lock.
    pub async fn read<R>(&self, f: impl FnOnce(&NotificationStore) -> R) -> R {
        let store = self.inner.read().await;
        f(&*store)
    }

    /// Records in display order, newest-first.
    pub async fn snapshot(&self) -> Vec<Notification> {
        self.read(NotificationStore::snapshot).await
    }

    pub async fn unread_count(&self) -> usize {
        self.read(NotificationStore::unread_count).await
    }

    /// Badge feed, updated after every mutation that changes the count.
    pub fn subscribe_unread(&self) -> watch::Receiver<usize> {
        self.unread.subscribe()
    }
}

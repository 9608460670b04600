//! NotificationStore - the client-side view of a user's notifications.
//!
//! Records are keyed by id with a separate newest-first display order, so a
//! notification delivered by both the REST fetch and the push channel is
//! stored once.
//!
//! # Unread count
//!
//! The unread count is derived, never tracked independently:
//!
//! ```text
//! unread_count = |{ r in records : !r.is_read }| + unlisted_unread
//! ```
//!
//! `unlisted_unread` is the number of unread notifications the server
//! reported that lie outside the loaded page. It is only set from a server
//! count and is cleared by `mark_all_read`.

use std::collections::{HashMap, VecDeque};

use super::Notification;
use crate::domain::foundation::{NotificationId, Timestamp};

/// What `prepend` did with an incoming record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrependOutcome {
    /// New id, placed at the head of the order.
    Inserted,
    /// Known id, record updated in place.
    Updated,
}

#[derive(Debug, Clone, Default)]
pub struct NotificationStore {
    records: HashMap<NotificationId, Notification>,
    order: VecDeque<NotificationId>,
    unlisted_unread: usize,
}

impl NotificationStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole sequence from a trusted REST batch.
    ///
    /// `server_unread` is the server's total unread count. If it is smaller
    /// than the batch's own unread records the records win.
    pub fn replace_all(&mut self, batch: Vec<Notification>, server_unread: usize) {
        self.records.clear();
        self.order.clear();
        self.unlisted_unread = 0;

        for notification in batch {
            if self.records.contains_key(&notification.id) {
                tracing::debug!(
                    notification_id = %notification.id,
                    "Duplicate id in fetched batch, keeping first occurrence"
                );
                continue;
            }
            self.order.push_back(notification.id.clone());
            self.records.insert(notification.id.clone(), notification);
        }

        self.set_server_unread_count(server_unread);
    }

    /// Reconciles the unread count with a server-reported total.
    pub fn set_server_unread_count(&mut self, server_unread: usize) {
        let local = self.local_unread();
        if server_unread < local {
            tracing::warn!(
                server_unread,
                local_unread = local,
                "Server unread count below loaded unread records, using records"
            );
            self.unlisted_unread = 0;
        } else {
            self.unlisted_unread = server_unread - local;
        }
    }

    /// Inserts a pushed notification at the head of the order.
    ///
    /// A known id is updated in place: it keeps its position and an already
    /// read record stays read.
    pub fn prepend(&mut self, notification: Notification) -> PrependOutcome {
        match self.records.get_mut(&notification.id) {
            Some(existing) => {
                let was_read = existing.is_read;
                *existing = notification;
                existing.is_read |= was_read;
                PrependOutcome::Updated
            }
            None => {
                self.order.push_front(notification.id.clone());
                self.records.insert(notification.id.clone(), notification);
                PrependOutcome::Inserted
            }
        }
    }

    /// Marks one record read. Returns `true` if it was unread.
    ///
    /// Unknown ids are a no-op.
    pub fn mark_read(&mut self, id: &NotificationId) -> bool {
        match self.records.get_mut(id) {
            Some(record) if !record.is_read => {
                record.is_read = true;
                true
            }
            _ => false,
        }
    }

    /// Marks every record read and clears the unlisted count.
    pub fn mark_all_read(&mut self) {
        for record in self.records.values_mut() {
            record.is_read = true;
        }
        self.unlisted_unread = 0;
    }

    /// Removes a record (archived or deleted on the server).
    pub fn remove(&mut self, id: &NotificationId) -> Option<Notification> {
        let removed = self.records.remove(id)?;
        self.order.retain(|entry| entry != id);
        Some(removed)
    }

    /// Drops records whose server-set expiry has passed. Returns how many
    /// were dropped.
    pub fn purge_expired(&mut self, now: &Timestamp) -> usize {
        let expired: Vec<NotificationId> = self
            .records
            .values()
            .filter(|n| n.is_expired(now))
            .map(|n| n.id.clone())
            .collect();
        for id in &expired {
            self.remove(id);
        }
        expired.len()
    }

    /// Forgets everything, including the unlisted unread count.
    pub fn clear(&mut self) {
        self.records.clear();
        self.order.clear();
        self.unlisted_unread = 0;
    }

    pub fn unread_count(&self) -> usize {
        self.local_unread() + self.unlisted_unread
    }

    fn local_unread(&self) -> usize {
        self.records.values().filter(|n| !n.is_read).count()
    }

    pub fn get(&self, id: &NotificationId) -> Option<&Notification> {
        self.records.get(id)
    }

    pub fn contains(&self, id: &NotificationId) -> bool {
        self.records.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates records newest-first.
    pub fn iter(&self) -> impl Iterator<Item = &Notification> + '_ {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    /// Ids in display order, newest-first.
    pub fn ids(&self) -> Vec<NotificationId> {
        self.order.iter().cloned().collect()
    }

    /// Owned copy of the records in display order.
    pub fn snapshot(&self) -> Vec<Notification> {
        self.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::notification::NotificationKind;
    use proptest::prelude::*;

    fn id(s: &str) -> NotificationId {
        NotificationId::new(s).unwrap()
    }

    fn unread(s: &str) -> Notification {
        Notification::new(id(s))
    }

    fn read(s: &str) -> Notification {
        Notification::new(id(s)).read()
    }

    fn ids_of(store: &NotificationStore) -> Vec<String> {
        store.ids().iter().map(|i| i.to_string()).collect()
    }

    /// State after replace_all([a unread, b read], 1) then push of c.
    fn scenario_store() -> NotificationStore {
        let mut store = NotificationStore::new();
        store.replace_all(vec![unread("a"), read("b")], 1);
        store.prepend(unread("c").with_kind(NotificationKind::Success));
        store
    }

    #[test]
    fn replace_all_on_empty_store() {
        let mut store = NotificationStore::new();
        store.replace_all(vec![unread("a"), read("b")], 1);

        assert_eq!(ids_of(&store), vec!["a", "b"]);
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn prepend_puts_new_record_first_and_counts_it() {
        let store = scenario_store();

        assert_eq!(ids_of(&store), vec!["c", "a", "b"]);
        assert_eq!(store.unread_count(), 2);
    }

    #[test]
    fn mark_read_decrements_once() {
        let mut store = scenario_store();

        assert!(store.mark_read(&id("a")));
        assert!(store.get(&id("a")).unwrap().is_read);
        assert_eq!(store.unread_count(), 1);

        assert!(!store.mark_read(&id("a")));
        assert_eq!(store.unread_count(), 1);
    }

    #[test]
    fn mark_read_unknown_id_is_noop() {
        let mut store = scenario_store();
        assert!(!store.mark_read(&id("zzz")));
        assert_eq!(store.unread_count(), 2);
    }

    #[test]
    fn mark_all_read_clears_everything() {
        let mut store = scenario_store();
        store.mark_read(&id("a"));
        store.mark_all_read();

        assert!(store.iter().all(|n| n.is_read));
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn duplicate_push_updates_in_place() {
        let mut store = scenario_store();
        let outcome = store.prepend(unread("a").with_text("edited", "body"));

        assert_eq!(outcome, PrependOutcome::Updated);
        assert_eq!(ids_of(&store), vec!["c", "a", "b"]);
        assert_eq!(store.get(&id("a")).unwrap().title, "edited");
        assert_eq!(store.unread_count(), 2);
    }

    #[test]
    fn duplicate_push_never_reverts_read_state() {
        let mut store = scenario_store();
        store.prepend(unread("b"));

        assert!(store.get(&id("b")).unwrap().is_read);
        assert_eq!(store.unread_count(), 2);
    }

    #[test]
    fn server_count_beyond_page_is_kept() {
        let mut store = NotificationStore::new();
        store.replace_all(vec![unread("a"), read("b")], 7);

        assert_eq!(store.unread_count(), 7);
        store.mark_read(&id("a"));
        assert_eq!(store.unread_count(), 6);
        store.mark_all_read();
        assert_eq!(store.unread_count(), 0);
    }

    #[test]
    fn server_count_below_records_uses_records() {
        let mut store = NotificationStore::new();
        store.replace_all(vec![unread("a"), unread("b")], 1);
        assert_eq!(store.unread_count(), 2);
    }

    #[test]
    fn duplicate_ids_in_batch_are_collapsed() {
        let mut store = NotificationStore::new();
        store.replace_all(vec![unread("a"), read("a"), unread("b")], 2);

        assert_eq!(ids_of(&store), vec!["a", "b"]);
        assert!(!store.get(&id("a")).unwrap().is_read);
    }

    #[test]
    fn remove_drops_record_and_its_unread_weight() {
        let mut store = scenario_store();
        let removed = store.remove(&id("c")).unwrap();

        assert_eq!(removed.id, id("c"));
        assert_eq!(ids_of(&store), vec!["a", "b"]);
        assert_eq!(store.unread_count(), 1);
        assert!(store.remove(&id("c")).is_none());
    }

    #[test]
    fn purge_expired_drops_only_past_expiry() {
        let mut store = scenario_store();
        let mut stale = unread("old");
        stale.expires_at = Some(serde_json::from_str("\"2020-01-01T00:00:00Z\"").unwrap());
        let mut fresh = unread("new");
        fresh.expires_at = Some(serde_json::from_str("\"2999-01-01T00:00:00Z\"").unwrap());
        store.prepend(stale);
        store.prepend(fresh);
        assert_eq!(store.unread_count(), 4);

        assert_eq!(store.purge_expired(&Timestamp::now()), 1);

        assert_eq!(ids_of(&store), vec!["new", "c", "a", "b"]);
        assert_eq!(store.unread_count(), 3);
        assert_eq!(store.purge_expired(&Timestamp::now()), 0);
    }

    #[test]
    fn clear_forgets_records_and_unlisted_count() {
        let mut store = scenario_store();
        store.set_server_unread_count(9);

        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.unread_count(), 0);
        assert!(!store.contains(&id("a")));
    }

    #[derive(Debug, Clone)]
    enum Op {
        Prepend(u8, bool),
        MarkRead(u8),
        MarkAll,
        Replace(Vec<(u8, bool)>, usize),
        Remove(u8),
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u8..12, any::<bool>()).prop_map(|(i, r)| Op::Prepend(i, r)),
            (0u8..12).prop_map(Op::MarkRead),
            Just(Op::MarkAll),
            (prop::collection::vec((0u8..12, any::<bool>()), 0..8), 0usize..20)
                .prop_map(|(b, n)| Op::Replace(b, n)),
            (0u8..12).prop_map(Op::Remove),
        ]
    }

    fn record(i: u8, is_read: bool) -> Notification {
        let n = Notification::new(id(&format!("n{}", i)));
        if is_read {
            n.read()
        } else {
            n
        }
    }

    fn apply(store: &mut NotificationStore, op: Op) {
        match op {
            Op::Prepend(i, r) => {
                store.prepend(record(i, r));
            }
            Op::MarkRead(i) => {
                store.mark_read(&id(&format!("n{}", i)));
            }
            Op::MarkAll => store.mark_all_read(),
            Op::Replace(batch, n) => {
                store.replace_all(batch.into_iter().map(|(i, r)| record(i, r)).collect(), n)
            }
            Op::Remove(i) => {
                store.remove(&id(&format!("n{}", i)));
            }
        }
    }

    proptest! {
        #[test]
        fn mark_read_never_increases_count(ops in prop::collection::vec(op(), 0..40), target in 0u8..12) {
            let mut store = NotificationStore::new();
            for op in ops {
                apply(&mut store, op);
            }
            let before = store.unread_count();
            let changed = store.mark_read(&id(&format!("n{}", target)));
            let after = store.unread_count();
            prop_assert!(after <= before);
            prop_assert_eq!(before - after, usize::from(changed));
        }

        #[test]
        fn mark_all_read_is_idempotent(ops in prop::collection::vec(op(), 0..40)) {
            let mut store = NotificationStore::new();
            for op in ops {
                apply(&mut store, op);
            }
            store.mark_all_read();
            let once = store.snapshot();
            store.mark_all_read();
            prop_assert_eq!(store.snapshot(), once);
            prop_assert_eq!(store.unread_count(), 0);
            prop_assert!(store.iter().all(|n| n.is_read));
        }

        #[test]
        fn prepend_of_new_unread_adds_one_at_head(ops in prop::collection::vec(op(), 0..40)) {
            let mut store = NotificationStore::new();
            for op in ops {
                apply(&mut store, op);
            }
            let before = store.unread_count();
            let fresh = Notification::new(id("fresh"));
            prop_assert_eq!(store.prepend(fresh), PrependOutcome::Inserted);
            prop_assert_eq!(store.unread_count(), before + 1);
            let ids = store.ids();
            prop_assert_eq!(ids[0].as_str(), "fresh");
        }

        #[test]
        fn replace_all_is_total(
            ops in prop::collection::vec(op(), 0..40),
            unread_ids in prop::collection::btree_set(0u8..30, 0..10),
            read_ids in prop::collection::btree_set(30u8..60, 0..10),
            extra in 0usize..10,
        ) {
            let mut store = NotificationStore::new();
            for op in ops {
                apply(&mut store, op);
            }
            let batch: Vec<Notification> = unread_ids.iter().map(|i| record(*i, false))
                .chain(read_ids.iter().map(|i| record(*i, true)))
                .collect();
            let n = unread_ids.len() + extra;
            store.replace_all(batch.clone(), n);
            prop_assert_eq!(store.snapshot(), batch);
            prop_assert_eq!(store.unread_count(), n);
        }
    }
}

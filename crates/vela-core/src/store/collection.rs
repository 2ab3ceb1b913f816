// ── Per-type record collection ──
//
// One ordered collection per concrete record type, exclusively owned by
// the store. Every read and write goes through the same async mutex, so
// the history of a collection is linearizable: a fetch observes either
// all of a batch or none of it.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::warn;

use crate::backing::PersistentStore;
use crate::query::Predicate;
use crate::record::Record;

/// Ordered, key-unique collection of records of one type.
///
/// Invariants: at most one record per primary key; mutations apply as a
/// whole batch under a single lock acquisition. Upserts replace in place
/// so a content-only update does not perturb record order.
pub(crate) struct RecordCollection<T: Record> {
    records: Mutex<Vec<Arc<T>>>,
    backing: Option<Arc<dyn PersistentStore<T>>>,
}

impl<T: Record> RecordCollection<T> {
    pub(crate) fn new(backing: Option<Arc<dyn PersistentStore<T>>>) -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            backing,
        }
    }

    /// Replace the collection contents wholesale, bypassing the backing.
    /// Used once, at registration, to hydrate from persistence.
    pub(crate) async fn hydrate(&self, records: Vec<T>) {
        let mut guard = self.records.lock().await;
        *guard = records.into_iter().map(Arc::new).collect();
    }

    /// All records matching the predicate, in collection order.
    pub(crate) async fn fetch(&self, predicate: &Predicate<T>) -> Vec<Arc<T>> {
        let guard = self.records.lock().await;
        guard
            .iter()
            .filter(|r| predicate.matches(r))
            .map(Arc::clone)
            .collect()
    }

    /// Insert or update a batch: each incoming record replaces any
    /// existing record with the same primary key (in place), else
    /// appends. The whole batch applies under one lock acquisition.
    pub(crate) async fn upsert(&self, batch: Vec<T>) {
        let mut guard = self.records.lock().await;
        let mut applied = Vec::with_capacity(batch.len());

        for record in batch {
            let key = record.primary_key();
            let record = Arc::new(record);
            applied.push(Arc::clone(&record));

            if let Some(slot) = guard.iter_mut().find(|r| r.primary_key() == key) {
                *slot = record;
            } else {
                guard.push(record);
            }
        }

        self.forward_save(&applied).await;
    }

    /// Merge a batch: the resulting contents are
    /// `(existing \ keys(batch)) ∪ batch`. Records absent from the batch
    /// survive, so a partial import never deletes unrelated data.
    pub(crate) async fn merge(&self, batch: Vec<T>) {
        let incoming_keys: std::collections::HashSet<T::Key> =
            batch.iter().map(Record::primary_key).collect();

        let mut guard = self.records.lock().await;
        guard.retain(|r| !incoming_keys.contains(&r.primary_key()));

        let mut applied = Vec::with_capacity(batch.len());
        for record in batch {
            let record = Arc::new(record);
            applied.push(Arc::clone(&record));
            guard.push(record);
        }

        self.forward_save(&applied).await;
    }

    /// Remove all records matching the predicate. Returns the number
    /// removed.
    pub(crate) async fn delete(&self, predicate: &Predicate<T>) -> usize {
        let mut guard = self.records.lock().await;
        let before = guard.len();
        guard.retain(|r| !predicate.matches(r));
        let removed = before - guard.len();

        if removed > 0 {
            if let Some(backing) = &self.backing {
                if let Err(e) = backing.delete(predicate).await {
                    warn!(error = %e, "backing delete failed; in-memory state stands");
                }
            }
        }

        removed
    }

    pub(crate) async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Forward an applied batch to the backing store, if any. Failures
    /// are logged, not propagated: durability is eventual.
    async fn forward_save(&self, applied: &[Arc<T>]) {
        if let Some(backing) = &self.backing {
            if let Err(e) = backing.save(applied).await {
                warn!(error = %e, "backing save failed; in-memory state stands");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[derive(Clone, PartialEq, Debug)]
    struct Track {
        id: String,
        title: String,
    }

    impl Record for Track {
        type Key = String;

        fn primary_key(&self) -> String {
            self.id.clone()
        }
    }

    fn track(id: &str, title: &str) -> Track {
        Track {
            id: id.into(),
            title: title.into(),
        }
    }

    fn keys(records: &[Arc<Track>]) -> Vec<&str> {
        records.iter().map(|r| r.id.as_str()).collect()
    }

    #[tokio::test]
    async fn upsert_appends_new_records() {
        let col = RecordCollection::new(None);
        col.upsert(vec![track("a", "A"), track("b", "B")]).await;

        let all = col.fetch(&Predicate::All).await;
        assert_eq!(keys(&all), ["a", "b"]);
    }

    #[tokio::test]
    async fn upsert_replaces_in_place() {
        let col = RecordCollection::new(None);
        col.upsert(vec![track("a", "A"), track("b", "B"), track("c", "C")])
            .await;
        col.upsert(vec![track("b", "B2")]).await;

        let all = col.fetch(&Predicate::All).await;
        // Position preserved: an update must not reorder the collection.
        assert_eq!(keys(&all), ["a", "b", "c"]);
        assert_eq!(all[1].title, "B2");
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let col = RecordCollection::new(None);
        col.upsert(vec![track("a", "A")]).await;
        col.upsert(vec![track("a", "A")]).await;

        assert_eq!(col.len().await, 1);
    }

    #[tokio::test]
    async fn merge_law_holds() {
        let col = RecordCollection::new(None);
        col.upsert(vec![track("a", "A"), track("b", "B"), track("c", "C")])
            .await;

        // (S \ keys(B)) ∪ B with B = {b', d}
        col.merge(vec![track("b", "B2"), track("d", "D")]).await;

        let all = col.fetch(&Predicate::All).await;
        let mut ids = keys(&all);
        ids.sort_unstable();
        assert_eq!(ids, ["a", "b", "c", "d"]);

        let b = col.fetch(&Predicate::ById("b".to_string())).await;
        assert_eq!(b[0].title, "B2");
    }

    #[tokio::test]
    async fn delete_removes_matching_and_counts() {
        let col = RecordCollection::new(None);
        col.upsert(vec![track("a", "A"), track("b", "B"), track("c", "C")])
            .await;

        let removed = col
            .delete(&Predicate::custom(|t: &Track| t.id != "b"))
            .await;

        assert_eq!(removed, 2);
        let all = col.fetch(&Predicate::All).await;
        assert_eq!(keys(&all), ["b"]);
    }

    #[tokio::test]
    async fn fetch_filters_by_predicate() {
        let col = RecordCollection::new(None);
        col.upsert(vec![track("a", "A"), track("b", "B")]).await;

        let matched = col.fetch(&Predicate::ById("b".to_string())).await;
        assert_eq!(keys(&matched), ["b"]);

        let none = col.fetch(&Predicate::none()).await;
        assert!(none.is_empty());
    }
}

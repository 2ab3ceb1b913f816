// ── Central record store ──
//
// Type-partitioned storage for all domain records. Each registered type
// owns one collection behind its own writer mutex; mutations broadcast a
// payload-less change signal through the notifier.

use std::any::{Any, TypeId, type_name};
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, warn};

use super::collection::RecordCollection;
use super::notifier::ChangeNotifier;
use crate::backing::PersistentStore;
use crate::error::CoreError;
use crate::query::Predicate;
use crate::record::Record;

/// Central store for all registered record types.
///
/// Cheaply cloneable; clones share the same collections and notifier.
/// Types are registered explicitly at composition time -- operating on an
/// unregistered type is a programmer error, reported as
/// [`CoreError::UnregisteredType`] and never retried.
///
/// Per-type operations are strictly serialized (reads included), so the
/// observable history of one type is linearizable. Different types
/// proceed concurrently.
#[derive(Clone)]
pub struct RecordStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    collections: DashMap<TypeId, Box<dyn Any + Send + Sync>>,
    notifier: ChangeNotifier,
}

impl RecordStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                collections: DashMap::new(),
                notifier: ChangeNotifier::new(),
            }),
        }
    }

    /// The store's change notifier. Live queries subscribe here.
    pub fn notifier(&self) -> &ChangeNotifier {
        &self.inner.notifier
    }

    // ── Registration ─────────────────────────────────────────────────

    /// Register a record type with no persistent backing. Registering a
    /// type twice keeps the first collection.
    pub fn register<T: Record>(&self) {
        self.insert_collection::<T>(RecordCollection::new(None));
    }

    /// Register a record type backed by a persistent store, hydrating
    /// the in-memory collection from it. A hydration failure logs and
    /// starts the collection empty.
    pub async fn register_with_backing<T: Record>(&self, backing: Arc<dyn PersistentStore<T>>) {
        let collection = RecordCollection::new(Some(Arc::clone(&backing)));

        match backing.fetch(&Predicate::All).await {
            Ok(persisted) => {
                debug!(
                    record_type = type_name::<T>(),
                    count = persisted.len(),
                    "hydrated collection from backing store"
                );
                collection.hydrate(persisted).await;
            }
            Err(e) => {
                warn!(
                    record_type = type_name::<T>(),
                    error = %e,
                    "hydration from backing store failed; starting empty"
                );
            }
        }

        self.insert_collection::<T>(collection);
    }

    fn insert_collection<T: Record>(&self, collection: RecordCollection<T>) {
        match self.inner.collections.entry(TypeId::of::<T>()) {
            Entry::Occupied(_) => {
                debug!(record_type = type_name::<T>(), "type already registered");
            }
            Entry::Vacant(slot) => {
                slot.insert(Box::new(Arc::new(collection)));
            }
        }
    }

    fn collection<T: Record>(&self) -> Result<Arc<RecordCollection<T>>, CoreError> {
        self.inner
            .collections
            .get(&TypeId::of::<T>())
            .and_then(|entry| {
                entry
                    .value()
                    .downcast_ref::<Arc<RecordCollection<T>>>()
                    .map(Arc::clone)
            })
            .ok_or(CoreError::UnregisteredType {
                type_name: type_name::<T>(),
            })
    }

    // ── Operations ───────────────────────────────────────────────────

    /// All records of `T` matching the predicate, in collection order.
    pub async fn fetch<T: Record>(
        &self,
        predicate: &Predicate<T>,
    ) -> Result<Vec<Arc<T>>, CoreError> {
        Ok(self.collection::<T>()?.fetch(predicate).await)
    }

    /// Insert or update a batch of records, applied atomically.
    ///
    /// With `silent = false` a change signal fires after the batch; with
    /// `silent = true` the batch applies without signaling -- a
    /// coalescing mechanism for multi-step operations, whose writes
    /// become visible to live queries at the next non-silent signal.
    pub async fn insert_or_update<T: Record>(
        &self,
        records: Vec<T>,
        silent: bool,
    ) -> Result<(), CoreError> {
        let collection = self.collection::<T>()?;
        collection.upsert(records).await;
        if !silent {
            self.inner.notifier.signal();
        }
        Ok(())
    }

    /// Remove all records of `T` matching the predicate. Always signals:
    /// deletions are rare and externally significant.
    pub async fn delete<T: Record>(&self, predicate: &Predicate<T>) -> Result<usize, CoreError> {
        let collection = self.collection::<T>()?;
        let removed = collection.delete(predicate).await;
        self.inner.notifier.signal();
        Ok(removed)
    }

    /// Merge a batch into the collection: the resulting state is
    /// `(existing \ keys(batch)) ∪ batch`, applied atomically, one
    /// signal. Records absent from the batch are preserved.
    pub async fn import_merge<T: Record>(&self, records: Vec<T>) -> Result<(), CoreError> {
        let collection = self.collection::<T>()?;
        collection.merge(records).await;
        self.inner.notifier.signal();
        Ok(())
    }

    /// Number of stored records of `T`.
    pub async fn count<T: Record>(&self) -> Result<usize, CoreError> {
        Ok(self.collection::<T>()?.len().await)
    }
}

impl Default for RecordStore {
    fn default() -> Self {
        Self::new()
    }
}

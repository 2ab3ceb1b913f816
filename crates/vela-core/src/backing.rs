// ── Persistent backing store ──
//
// The store is the only caller: collections forward mutations after the
// in-memory apply, and hydrate from here at registration. Durability is
// eventual -- a backing failure never rolls back in-memory state.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::Mutex;

use crate::query::Predicate;
use crate::record::Record;

/// Error from a persistent backing store.
#[derive(Debug, Error)]
#[error("backing store error: {message}")]
pub struct BackingError {
    pub message: String,
}

impl BackingError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Abstract interface for record persistence.
///
/// Implementations are storage-agnostic: SQL, flat files, or in-memory
/// for tests. All methods are async so blocking backends can offload to
/// `spawn_blocking` internally.
#[async_trait]
pub trait PersistentStore<T: Record>: Send + Sync {
    /// Fetch all persisted records matching the predicate.
    async fn fetch(&self, predicate: &Predicate<T>) -> Result<Vec<T>, BackingError>;

    /// Persist the given records, replacing any stored under the same
    /// primary key.
    async fn save(&self, records: &[Arc<T>]) -> Result<(), BackingError>;

    /// Remove all persisted records matching the predicate.
    async fn delete(&self, predicate: &Predicate<T>) -> Result<(), BackingError>;
}

/// In-memory `PersistentStore` implementation.
///
/// The reference backend for tests and for applications that want the
/// reactive layer without durability.
pub struct MemoryStore<T: Record> {
    records: Mutex<Vec<Arc<T>>>,
}

impl<T: Record> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    /// Number of persisted records.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

impl<T: Record> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<T: Record + Clone> PersistentStore<T> for MemoryStore<T> {
    async fn fetch(&self, predicate: &Predicate<T>) -> Result<Vec<T>, BackingError> {
        let records = self.records.lock().await;
        Ok(records
            .iter()
            .filter(|r| predicate.matches(r))
            .map(|r| T::clone(r))
            .collect())
    }

    async fn save(&self, incoming: &[Arc<T>]) -> Result<(), BackingError> {
        let mut records = self.records.lock().await;
        for record in incoming {
            let key = record.primary_key();
            if let Some(slot) = records.iter_mut().find(|r| r.primary_key() == key) {
                *slot = Arc::clone(record);
            } else {
                records.push(Arc::clone(record));
            }
        }
        Ok(())
    }

    async fn delete(&self, predicate: &Predicate<T>) -> Result<(), BackingError> {
        let mut records = self.records.lock().await;
        records.retain(|r| !predicate.matches(r));
        Ok(())
    }
}

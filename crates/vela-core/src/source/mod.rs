// ── Data sources ──
//
// Facades composing the store with its collaborators: `LocalSource`
// binds store + notifier + decoder, `RemoteSource` binds the HTTP
// collection API.

mod remote;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

pub use remote::RemoteSource;

use crate::config::SyncConfig;
use crate::error::CoreError;
use crate::observer::DataObserver;
use crate::query::{LiveQuery, Predicate, QueryStream};
use crate::record::Record;
use crate::store::RecordStore;

/// Facade over the in-memory store for application consumers.
///
/// Bundles fetch, mutation, live-query construction, and JSON import
/// behind one handle, carrying the layer's tuning config. Cheaply
/// cloneable.
#[derive(Clone)]
pub struct LocalSource {
    inner: Arc<LocalSourceInner>,
}

struct LocalSourceInner {
    store: RecordStore,
    config: SyncConfig,
    last_import: watch::Sender<Option<DateTime<Utc>>>,
}

impl LocalSource {
    pub fn new(store: RecordStore) -> Self {
        Self::with_config(store, SyncConfig::default())
    }

    pub fn with_config(store: RecordStore, config: SyncConfig) -> Self {
        let (last_import, _) = watch::channel(None);
        Self {
            inner: Arc::new(LocalSourceInner {
                store,
                config,
                last_import,
            }),
        }
    }

    /// The underlying store.
    pub fn store(&self) -> &RecordStore {
        &self.inner.store
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    // ── Record operations ────────────────────────────────────────────

    /// One-shot fetch through a predicate.
    pub async fn fetch<T: Record>(
        &self,
        predicate: &Predicate<T>,
    ) -> Result<Vec<Arc<T>>, CoreError> {
        self.inner.store.fetch(predicate).await
    }

    /// Insert or update records, signaling live queries.
    pub async fn insert_or_update<T: Record>(&self, records: Vec<T>) -> Result<(), CoreError> {
        self.inner.store.insert_or_update(records, false).await
    }

    /// Delete records matching a predicate.
    pub async fn delete<T: Record>(&self, predicate: &Predicate<T>) -> Result<usize, CoreError> {
        self.inner.store.delete(predicate).await
    }

    // ── Live queries ─────────────────────────────────────────────────

    /// Spawn a standing live query with this source's configured buffer.
    pub fn live_query<T: Record>(&self, predicate: Predicate<T>) -> (LiveQuery<T>, QueryStream<T>) {
        LiveQuery::spawn(&self.inner.store, predicate, self.inner.config.query_buffer)
    }

    /// Bind an unmapped observer over a live query.
    pub fn observe<T: Record>(&self, predicate: Predicate<T>) -> DataObserver<T> {
        DataObserver::bind_inner(
            &self.inner.store,
            predicate,
            Arc::clone,
            self.inner.config.query_buffer,
        )
    }

    /// Bind an observer with a value mapping.
    pub fn observe_mapped<T: Record, V: Send + 'static>(
        &self,
        predicate: Predicate<T>,
        mapper: impl Fn(&Arc<T>) -> V + Send + Sync + 'static,
    ) -> DataObserver<T, V> {
        DataObserver::bind_inner(
            &self.inner.store,
            predicate,
            mapper,
            self.inner.config.query_buffer,
        )
    }

    // ── Import ───────────────────────────────────────────────────────

    /// Decode a raw JSON payload (an array of records, or one record
    /// object) and merge it into the store.
    ///
    /// The merge preserves records absent from the payload, so paged or
    /// partial imports never delete unrelated data. A decode failure
    /// aborts with the store untouched. Returns the number of records
    /// imported.
    pub async fn import_json<T>(&self, payload: Value) -> Result<usize, CoreError>
    where
        T: Record + DeserializeOwned,
    {
        let records: Vec<T> = match payload {
            Value::Array(_) => serde_json::from_value(payload)?,
            Value::Object(_) => vec![serde_json::from_value(payload)?],
            other => {
                return Err(CoreError::Decode {
                    message: format!("expected an object or array, got {other}"),
                });
            }
        };

        let count = records.len();
        self.inner.store.import_merge(records).await?;
        let _ = self.inner.last_import.send(Some(Utc::now()));

        debug!(count, "import merged into store");
        Ok(count)
    }

    // ── Metadata ─────────────────────────────────────────────────────

    /// When the last successful import completed, if ever.
    pub fn last_import(&self) -> Option<DateTime<Utc>> {
        *self.inner.last_import.borrow()
    }

    /// How long ago the last import occurred, or `None` if never.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.last_import().map(|t| Utc::now() - t)
    }
}

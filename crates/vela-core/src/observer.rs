// ── Data observer ──
//
// Wraps one live query with an optional value mapping and exposes both
// push (subscribe) and pull (fetch_once) access. The ID-accumulation
// capability is what the paginator uses to scope the live feed to the
// pages actually fetched.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::SyncConfig;
use crate::error::CoreError;
use crate::query::{LiveQuery, Predicate, QueryStream};
use crate::record::{Record, RecordKey};
use crate::store::RecordStore;

/// Key-set accumulation capability, held by the paginator.
///
/// Both operations narrow the underlying query to "primary key ∈ the
/// accumulated set" (empty set after `reset_ids`), triggering an
/// immediate re-evaluation.
#[async_trait]
pub trait IdAccumulator<K: RecordKey>: Send + Sync {
    /// Clear the accumulated keys; the feed now matches nothing.
    async fn reset_ids(&self);

    /// Extend the accumulated keys; the feed now matches everything
    /// accumulated so far.
    async fn append_ids(&self, ids: Vec<K>);
}

/// A live query wrapper delivering mapped domain values.
///
/// `V` defaults to `Arc<T>` (no mapping). A custom mapper must be pure
/// and side-effect free: it runs once per record per delivery, across
/// arbitrarily many re-evaluations.
///
/// Cheaply cloneable; clones share the subscription and accumulated IDs.
/// Tear down with [`shutdown()`](Self::shutdown).
pub struct DataObserver<T: Record, V = Arc<T>> {
    inner: Arc<ObserverInner<T, V>>,
}

struct ObserverInner<T: Record, V> {
    store: RecordStore,
    query: LiveQuery<T>,
    stream: Mutex<Option<QueryStream<T>>>,
    mapper: Arc<dyn Fn(&Arc<T>) -> V + Send + Sync>,
    accumulated: Mutex<HashSet<T::Key>>,
    delivery: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl<T: Record> DataObserver<T> {
    /// Bind an observer with no mapping: values are delivered as
    /// `Arc<T>`.
    pub fn bind(store: &RecordStore, predicate: Predicate<T>) -> Self {
        Self::bind_mapped(store, predicate, Arc::clone)
    }
}

impl<T: Record, V: Send + 'static> DataObserver<T, V> {
    /// Bind an observer with a value mapping applied before delivery or
    /// pull.
    pub fn bind_mapped(
        store: &RecordStore,
        predicate: Predicate<T>,
        mapper: impl Fn(&Arc<T>) -> V + Send + Sync + 'static,
    ) -> Self {
        Self::bind_inner(store, predicate, mapper, SyncConfig::default().query_buffer)
    }

    pub(crate) fn bind_inner(
        store: &RecordStore,
        predicate: Predicate<T>,
        mapper: impl Fn(&Arc<T>) -> V + Send + Sync + 'static,
        buffer: usize,
    ) -> Self {
        let (query, stream) = LiveQuery::spawn(store, predicate, buffer);

        Self {
            inner: Arc::new(ObserverInner {
                store: store.clone(),
                query,
                stream: Mutex::new(Some(stream)),
                mapper: Arc::new(mapper),
                accumulated: Mutex::new(HashSet::new()),
                delivery: Mutex::new(None),
                cancel: CancellationToken::new(),
            }),
        }
    }

    /// Push mode: invoke `on_update` with the mapped values of every
    /// non-redundant delivery, starting with the initial snapshot.
    ///
    /// One subscription per observer; a second call fails with
    /// [`CoreError::AlreadySubscribed`].
    pub async fn subscribe(
        &self,
        mut on_update: impl FnMut(Vec<V>) + Send + 'static,
    ) -> Result<(), CoreError> {
        let mut stream = self
            .inner
            .stream
            .lock()
            .await
            .take()
            .ok_or(CoreError::AlreadySubscribed)?;

        let mapper = Arc::clone(&self.inner.mapper);
        let cancel = self.inner.cancel.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    next = stream.next() => {
                        let Some(snapshot) = next else { break };
                        on_update(snapshot.iter().map(|r| mapper(r)).collect());
                    }
                }
            }
        });

        *self.inner.delivery.lock().await = Some(task);
        Ok(())
    }

    /// Pull mode: one-shot snapshot through the current predicate,
    /// mapped.
    pub async fn fetch_once(&self) -> Result<Vec<V>, CoreError> {
        let predicate = self.inner.query.predicate();
        let records = self.inner.store.fetch::<T>(&predicate).await?;
        Ok(records.iter().map(|r| (self.inner.mapper)(r)).collect())
    }

    /// Replace the underlying query predicate directly.
    pub fn set_predicate(&self, predicate: Predicate<T>) {
        self.inner.query.set_predicate(predicate);
    }

    /// This observer as a type-erased ID accumulator, for handing to a
    /// paginator.
    pub fn id_filter(&self) -> Arc<dyn IdAccumulator<T::Key>> {
        Arc::new(self.clone())
    }

    /// Stop the delivery task and the wrapped query. Mandatory at end of
    /// life; the update callback is never invoked afterwards.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        if let Some(task) = self.inner.delivery.lock().await.take() {
            let _ = task.await;
        }
        self.inner.query.shutdown().await;
    }
}

impl<T: Record, V> Clone for DataObserver<T, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl<T: Record, V: Send + 'static> IdAccumulator<T::Key> for DataObserver<T, V> {
    async fn reset_ids(&self) {
        let mut accumulated = self.inner.accumulated.lock().await;
        accumulated.clear();
        self.inner.query.set_predicate(Predicate::none());
    }

    async fn append_ids(&self, ids: Vec<T::Key>) {
        let mut accumulated = self.inner.accumulated.lock().await;
        accumulated.extend(ids);
        self.inner
            .query
            .set_predicate(Predicate::InIds(accumulated.clone()));
    }
}

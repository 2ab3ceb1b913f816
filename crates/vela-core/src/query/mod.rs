// ── Live queries ──
//
// A live query is a standing subscription: (record type, predicate).
// It re-evaluates against the store on every change signal and delivers
// a fresh snapshot only when the ordered key list actually changed.

mod predicate;

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use arc_swap::ArcSwap;
use futures_core::Stream;
use tokio::sync::{Mutex, Notify, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub use predicate::Predicate;

use crate::record::Record;
use crate::store::{ChangeSignal, RecordStore};

/// A delivered query result: one internally consistent snapshot.
pub type Snapshot<T> = Arc<Vec<Arc<T>>>;

/// A standing predicate query that re-evaluates on every store change.
///
/// Construction performs an initial fetch-and-deliver, so the subscriber
/// observes current data without waiting for the first mutation. After
/// that, a snapshot is delivered if and only if the ordered key list
/// differs from the last delivered one -- content-only rewrites under
/// identical keys are suppressed.
///
/// Teardown is explicit: call [`shutdown()`](Self::shutdown). A query
/// that is never shut down leaks its evaluation task for the lifetime of
/// the store.
pub struct LiveQuery<T: Record> {
    shared: Arc<QueryShared<T>>,
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct QueryShared<T: Record> {
    store: RecordStore,
    predicate: ArcSwap<Predicate<T>>,
    reeval: Notify,
}

impl<T: Record> LiveQuery<T> {
    /// Spawn a live query with the given delivery buffer.
    ///
    /// Returns the query handle and the stream its snapshots arrive on.
    /// Delivery runs on the returned stream's channel, decoupled from the
    /// store's writer mutex and from subscriber processing time.
    pub fn spawn(
        store: &RecordStore,
        predicate: Predicate<T>,
        buffer: usize,
    ) -> (Self, QueryStream<T>) {
        let (tx, rx) = mpsc::channel(buffer);
        let signal = store.notifier().subscribe();
        let cancel = CancellationToken::new();

        let shared = Arc::new(QueryShared {
            store: store.clone(),
            predicate: ArcSwap::from_pointee(predicate),
            reeval: Notify::new(),
        });

        let task = tokio::spawn(eval_loop(
            Arc::clone(&shared),
            signal,
            tx,
            cancel.clone(),
        ));

        (
            Self {
                shared,
                cancel,
                task: Mutex::new(Some(task)),
            },
            QueryStream { rx },
        )
    }

    /// The currently bound predicate.
    pub fn predicate(&self) -> Arc<Predicate<T>> {
        self.shared.predicate.load_full()
    }

    /// Replace the predicate, forcing an immediate re-evaluation. A new
    /// snapshot is delivered iff the result's key list changed.
    pub fn set_predicate(&self, predicate: Predicate<T>) {
        self.shared.predicate.store(Arc::new(predicate));
        self.shared.reeval.notify_one();
    }

    /// Stop the evaluation task and deregister from the notifier.
    ///
    /// Mandatory at end of life; the query delivers nothing afterwards.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        if let Some(task) = self.task.lock().await.take() {
            let _ = task.await;
        }
    }
}

/// Evaluation loop: evaluate immediately (the initial deliver), then
/// wake on every change signal or predicate replacement.
async fn eval_loop<T: Record>(
    shared: Arc<QueryShared<T>>,
    mut signal: ChangeSignal,
    tx: mpsc::Sender<Snapshot<T>>,
    cancel: CancellationToken,
) {
    let mut last_keys: Option<Vec<T::Key>> = None;

    loop {
        if let Some(snapshot) = evaluate(&shared, &mut last_keys).await {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                sent = tx.send(snapshot) => {
                    if sent.is_err() {
                        break;
                    }
                }
            }
        }

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = signal.changed() => {
                if changed.is_none() {
                    debug!("notifier dropped; live query stopping");
                    break;
                }
            }
            () = shared.reeval.notified() => {}
        }
    }
}

/// One evaluation pass: fetch through the current predicate and diff
/// against the last delivered key list. Returns the snapshot to deliver,
/// or `None` when the result is key-set-identical to the previous one.
async fn evaluate<T: Record>(
    shared: &QueryShared<T>,
    last_keys: &mut Option<Vec<T::Key>>,
) -> Option<Snapshot<T>> {
    let predicate = shared.predicate.load_full();

    // A fetch failure degrades to an empty result: a continuously live
    // feed favors availability over strictness.
    let records = match shared.store.fetch::<T>(&predicate).await {
        Ok(records) => records,
        Err(e) => {
            warn!(error = %e, "live query fetch failed; delivering empty result");
            Vec::new()
        }
    };

    let keys: Vec<T::Key> = records.iter().map(|r| r.primary_key()).collect();
    if last_keys.as_ref() == Some(&keys) {
        return None;
    }
    *last_keys = Some(keys);

    Some(Arc::new(records))
}

/// The receiving side of a live query's deliveries.
///
/// Yields one snapshot per observed difference. Also usable as a
/// `futures_core::Stream` with `StreamExt` combinators.
pub struct QueryStream<T: Record> {
    rx: mpsc::Receiver<Snapshot<T>>,
}

impl<T: Record> QueryStream<T> {
    /// Wait for the next delivered snapshot. Returns `None` once the
    /// query has shut down.
    pub async fn next(&mut self) -> Option<Snapshot<T>> {
        self.rx.recv().await
    }
}

impl<T: Record> Stream for QueryStream<T> {
    type Item = Snapshot<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

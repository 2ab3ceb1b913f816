// ── Offset/limit pagination ──
//
// Drives a remote loader page-by-page and feeds discovered IDs into a
// bound observer. At most one load is in flight; a response that arrives
// after a concurrent refresh reset the cursor is discarded by comparing
// the offset captured *before* the call against the cursor afterwards.
// That comparison is the only cancellation mechanism -- in-flight loader
// calls are never force-aborted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::{Mutex, watch};
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::CoreError;
use crate::observer::IdAccumulator;
use crate::record::RecordKey;

/// One page of remote results: the discovered primary keys and the
/// collection's total size.
#[derive(Debug, Clone)]
pub struct PageData<K> {
    pub ids: Vec<K>,
    pub total: u64,
}

/// The remote loader collaborator: `(offset, limit)` to one page.
///
/// Timeout and retry policy belong to the loader, not the paginator.
pub type PageLoader<K> =
    Arc<dyn Fn(u64, u64) -> BoxFuture<'static, Result<PageData<K>, CoreError>> + Send + Sync>;

/// Wrap an async closure into a [`PageLoader`].
pub fn page_loader<K, Fut>(f: impl Fn(u64, u64) -> Fut + Send + Sync + 'static) -> PageLoader<K>
where
    K: RecordKey,
    Fut: Future<Output = Result<PageData<K>, CoreError>> + Send + 'static,
{
    Arc::new(move |offset, limit| f(offset, limit).boxed())
}

/// Observable paginator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaginatorPhase {
    Idle,
    Loading,
    Exhausted,
}

type ExhaustedCallback = Arc<dyn Fn() + Send + Sync>;

struct Cursor {
    next_offset: u64,
    exhausted: bool,
}

/// Incremental offset/limit pagination over a remote collection.
///
/// Successful non-stale pages append their IDs to the bound observer
/// (narrowing its live feed to exactly the pages fetched) and advance
/// the cursor by `limit`. Once the cursor passes the reported total, the
/// paginator transitions to `Exhausted` and invokes the callback bound
/// by [`refresh()`](Self::refresh) exactly once per refresh cycle.
pub struct OffsetLimitPaginator<K: RecordKey> {
    observer: Arc<dyn IdAccumulator<K>>,
    limit: u64,
    cursor: Mutex<Cursor>,
    loader: Mutex<Option<PageLoader<K>>>,
    on_exhausted: Mutex<Option<ExhaustedCallback>>,
    is_loading: AtomicBool,
    phase: watch::Sender<PaginatorPhase>,
}

impl<K: RecordKey> OffsetLimitPaginator<K> {
    /// Create a paginator with the default page limit.
    pub fn new(observer: Arc<dyn IdAccumulator<K>>) -> Self {
        Self::with_limit(observer, SyncConfig::default().page_limit)
    }

    /// Create a paginator with an explicit page limit.
    pub fn with_limit(observer: Arc<dyn IdAccumulator<K>>, limit: u64) -> Self {
        let (phase, _) = watch::channel(PaginatorPhase::Idle);
        Self {
            observer,
            limit,
            cursor: Mutex::new(Cursor {
                next_offset: 0,
                exhausted: false,
            }),
            loader: Mutex::new(None),
            on_exhausted: Mutex::new(None),
            is_loading: AtomicBool::new(false),
            phase,
        }
    }

    // ── State observation ────────────────────────────────────────────

    /// Subscribe to phase transitions.
    pub fn phase(&self) -> watch::Receiver<PaginatorPhase> {
        self.phase.subscribe()
    }

    /// The offset the next page load will request.
    pub async fn next_offset(&self) -> u64 {
        self.cursor.lock().await.next_offset
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::SeqCst)
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Bind a loader and exhaustion callback, reset all pagination
    /// state (cursor, in-flight flag, the observer's accumulated IDs),
    /// and load the first page.
    ///
    /// Any load still outstanding when `refresh` runs becomes stale: its
    /// response will fail the offset comparison and be discarded.
    pub async fn refresh(
        &self,
        loader: PageLoader<K>,
        on_exhausted: impl Fn() + Send + Sync + 'static,
    ) -> Result<(), CoreError> {
        *self.loader.lock().await = Some(loader);
        *self.on_exhausted.lock().await = Some(Arc::new(on_exhausted));

        self.observer.reset_ids().await;
        {
            let mut cursor = self.cursor.lock().await;
            cursor.next_offset = 0;
            cursor.exhausted = false;
        }
        self.is_loading.store(false, Ordering::SeqCst);
        let _ = self.phase.send(PaginatorPhase::Idle);

        self.load_next().await
    }

    /// Load the next page.
    ///
    /// Fails immediately -- mutating nothing -- with
    /// [`CoreError::NoLoader`] if `refresh` has never bound a loader, or
    /// [`CoreError::AlreadyLoading`] if a load is already in flight.
    /// A stale completion (the cursor moved while the call was
    /// outstanding) returns [`CoreError::Cancelled`] and mutates
    /// nothing, including the in-flight flag, which the concurrent
    /// refresh already handed to its own replacement call.
    pub async fn load_next(&self) -> Result<(), CoreError> {
        let loader = self
            .loader
            .lock()
            .await
            .clone()
            .ok_or(CoreError::NoLoader)?;

        if self.is_loading.swap(true, Ordering::SeqCst) {
            return Err(CoreError::AlreadyLoading);
        }

        // Captured before the call; the staleness anchor.
        let offset = self.cursor.lock().await.next_offset;
        let limit = self.limit;

        let _ = self.phase.send(PaginatorPhase::Loading);
        debug!(offset, limit, "loading next page");

        let result = loader(offset, limit).await;

        let mut cursor = self.cursor.lock().await;
        if offset != cursor.next_offset {
            debug!(
                captured = offset,
                current = cursor.next_offset,
                "discarding stale page response"
            );
            return Err(CoreError::Cancelled);
        }

        let page = match result {
            Ok(page) => page,
            Err(e) => {
                self.is_loading.store(false, Ordering::SeqCst);
                let _ = self.phase.send(PaginatorPhase::Idle);
                return Err(e);
            }
        };

        debug!(
            offset,
            loaded = page.ids.len(),
            total = page.total,
            "page loaded"
        );

        self.observer.append_ids(page.ids).await;
        cursor.next_offset += limit;

        if cursor.next_offset >= page.total && !cursor.exhausted {
            cursor.exhausted = true;
            let _ = self.phase.send(PaginatorPhase::Exhausted);
            if let Some(callback) = self.on_exhausted.lock().await.clone() {
                // Delivered off the loading path, like every other
                // subscriber-facing callback.
                tokio::spawn(async move { callback() });
            }
        } else if !cursor.exhausted {
            let _ = self.phase.send(PaginatorPhase::Idle);
        }

        self.is_loading.store(false, Ordering::SeqCst);
        Ok(())
    }
}

// Integration tests for the offset/limit paginator state machine:
// monotonic advancement, exhaustion, double-load rejection, and
// stale-response discard after a concurrent refresh.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_test::assert_ok;

use vela_core::{
    CoreError, IdAccumulator, OffsetLimitPaginator, PageData, PageLoader, PaginatorPhase,
    page_loader,
};

// ── Test doubles ────────────────────────────────────────────────────

/// Records every accumulator call the paginator makes.
#[derive(Default)]
struct RecordingAccumulator {
    ids: Mutex<Vec<String>>,
    resets: AtomicUsize,
}

impl RecordingAccumulator {
    async fn ids(&self) -> Vec<String> {
        self.ids.lock().await.clone()
    }
}

#[async_trait]
impl IdAccumulator<String> for RecordingAccumulator {
    async fn reset_ids(&self) {
        self.ids.lock().await.clear();
        self.resets.fetch_add(1, Ordering::SeqCst);
    }

    async fn append_ids(&self, ids: Vec<String>) {
        self.ids.lock().await.extend(ids);
    }
}

type PendingRequest = (u64, u64, oneshot::Sender<Result<PageData<String>, CoreError>>);

/// A loader whose responses the test controls: each invocation parks on
/// a oneshot until the test responds.
fn channel_loader() -> (PageLoader<String>, mpsc::UnboundedReceiver<PendingRequest>) {
    let (req_tx, req_rx) = mpsc::unbounded_channel();
    let loader = page_loader(move |offset, limit| {
        let req_tx = req_tx.clone();
        async move {
            let (tx, rx) = oneshot::channel();
            req_tx.send((offset, limit, tx)).expect("harness dropped");
            rx.await.expect("responder dropped")
        }
    });
    (loader, req_rx)
}

fn ids(range: std::ops::Range<u64>) -> Vec<String> {
    range.map(|i| format!("id-{i}")).collect()
}

fn page(id_range: std::ops::Range<u64>, total: u64) -> Result<PageData<String>, CoreError> {
    Ok(PageData {
        ids: ids(id_range),
        total,
    })
}

struct Harness {
    paginator: Arc<OffsetLimitPaginator<String>>,
    recorder: Arc<RecordingAccumulator>,
    requests: mpsc::UnboundedReceiver<PendingRequest>,
    exhausted: Arc<AtomicUsize>,
}

/// Spawn `refresh` with a fresh channel loader and return once the first
/// page request is pending.
async fn start_refresh(limit: u64) -> (Harness, PendingRequest, tokio::task::JoinHandle<Result<(), CoreError>>) {
    let recorder = Arc::new(RecordingAccumulator::default());
    let paginator = Arc::new(OffsetLimitPaginator::with_limit(
        Arc::clone(&recorder) as Arc<dyn IdAccumulator<String>>,
        limit,
    ));
    let (loader, mut requests) = channel_loader();
    let exhausted = Arc::new(AtomicUsize::new(0));

    let refresh_task = {
        let paginator = Arc::clone(&paginator);
        let exhausted = Arc::clone(&exhausted);
        tokio::spawn(async move {
            paginator
                .refresh(loader, move || {
                    exhausted.fetch_add(1, Ordering::SeqCst);
                })
                .await
        })
    };

    let request = requests.recv().await.unwrap();
    (
        Harness {
            paginator,
            recorder,
            requests,
            exhausted,
        },
        request,
        refresh_task,
    )
}

/// Spawn `load_next` and return once its page request is pending.
async fn start_load(
    harness: &mut Harness,
) -> (PendingRequest, tokio::task::JoinHandle<Result<(), CoreError>>) {
    let paginator = Arc::clone(&harness.paginator);
    let task = tokio::spawn(async move { paginator.load_next().await });
    let request = harness.requests.recv().await.unwrap();
    (request, task)
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn offsets_advance_monotonically_and_exhaust_once() {
    // limit 20, total 45: pages at 0, 20, 40, exhausted after the third.
    let (mut harness, (offset, limit, respond), refresh_task) = start_refresh(20).await;
    assert_eq!((offset, limit), (0, 20));
    respond.send(page(0..20, 45)).unwrap();
    assert_ok!(refresh_task.await.unwrap());
    assert_eq!(harness.paginator.next_offset().await, 20);
    assert_eq!(harness.recorder.resets.load(Ordering::SeqCst), 1);

    let ((offset, _, respond), task) = start_load(&mut harness).await;
    assert_eq!(offset, 20);
    respond.send(page(20..40, 45)).unwrap();
    assert_ok!(task.await.unwrap());
    assert_eq!(harness.paginator.next_offset().await, 40);
    assert_eq!(harness.exhausted.load(Ordering::SeqCst), 0);

    let ((offset, _, respond), task) = start_load(&mut harness).await;
    assert_eq!(offset, 40);
    respond.send(page(40..45, 45)).unwrap();
    assert_ok!(task.await.unwrap());

    // 60 >= 45: exhausted, callback delivered off the loading path.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(harness.exhausted.load(Ordering::SeqCst), 1);
    assert_eq!(*harness.paginator.phase().borrow(), PaginatorPhase::Exhausted);
    assert_eq!(harness.recorder.ids().await.len(), 45);

    // Loading past the end never re-fires the callback.
    let ((offset, _, respond), task) = start_load(&mut harness).await;
    assert_eq!(offset, 60);
    respond.send(page(60..60, 45)).unwrap();
    assert_ok!(task.await.unwrap());
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert_eq!(harness.exhausted.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn load_next_without_loader_fails_without_mutation() {
    let recorder = Arc::new(RecordingAccumulator::default());
    let paginator =
        OffsetLimitPaginator::with_limit(Arc::clone(&recorder) as Arc<dyn IdAccumulator<String>>, 20);

    let err = paginator.load_next().await.unwrap_err();
    assert!(matches!(err, CoreError::NoLoader));
    assert_eq!(paginator.next_offset().await, 0);
    assert!(!paginator.is_loading());
    assert_eq!(recorder.resets.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn concurrent_load_is_rejected_without_a_second_request() {
    let (mut harness, (_, _, respond), refresh_task) = start_refresh(20).await;

    // First load is parked on the harness; a second must fail fast.
    let err = harness.paginator.load_next().await.unwrap_err();
    assert!(matches!(err, CoreError::AlreadyLoading));
    assert!(harness.paginator.is_loading());

    respond.send(page(0..20, 45)).unwrap();
    assert_ok!(refresh_task.await.unwrap());

    // Exactly one loader invocation happened.
    assert!(harness.requests.try_recv().is_err());
}

#[tokio::test]
async fn stale_response_after_refresh_mutates_nothing() {
    // Page one loads normally.
    let (mut harness, (_, _, respond), refresh_task) = start_refresh(20).await;
    respond.send(page(0..20, 45)).unwrap();
    assert_ok!(refresh_task.await.unwrap());
    assert_eq!(harness.paginator.next_offset().await, 20);

    // Page two goes out and stays outstanding.
    let ((offset, _, respond_stale), stale_task) = start_load(&mut harness).await;
    assert_eq!(offset, 20);

    // A refresh lands while that call is in flight: cursor back to 0,
    // accumulated IDs cleared, a new first-page request issued.
    let (new_loader, mut new_requests) = channel_loader();
    let refresh_task = {
        let paginator = Arc::clone(&harness.paginator);
        tokio::spawn(async move { paginator.refresh(new_loader, || {}).await })
    };
    let (offset, _, respond_new) = new_requests.recv().await.unwrap();
    assert_eq!(offset, 0);
    assert_eq!(harness.recorder.resets.load(Ordering::SeqCst), 2);

    // The stale page-two response arrives: discarded as Cancelled, and
    // neither the cursor, the accumulated IDs, nor the in-flight flag
    // of the replacement call may move.
    respond_stale
        .send(Ok(PageData {
            ids: vec!["stale".to_string()],
            total: 45,
        }))
        .unwrap();
    let err = stale_task.await.unwrap().unwrap_err();
    assert!(matches!(err, CoreError::Cancelled));

    assert_eq!(harness.paginator.next_offset().await, 0);
    assert!(harness.paginator.is_loading());
    assert!(!harness.recorder.ids().await.contains(&"stale".to_string()));

    // The replacement call completes normally.
    respond_new.send(page(0..20, 45)).unwrap();
    assert_ok!(refresh_task.await.unwrap());
    assert_eq!(harness.paginator.next_offset().await, 20);
    assert_eq!(harness.recorder.ids().await.len(), 20);
}

#[tokio::test]
async fn transport_error_resets_loading_and_preserves_cursor() {
    let (mut harness, (_, _, respond), refresh_task) = start_refresh(20).await;
    respond.send(page(0..20, 45)).unwrap();
    assert_ok!(refresh_task.await.unwrap());

    let ((offset, _, respond), task) = start_load(&mut harness).await;
    assert_eq!(offset, 20);
    respond
        .send(Err(CoreError::Api(vela_api::Error::Api {
            status: 503,
            message: "maintenance".into(),
        })))
        .unwrap();

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, CoreError::Api(_)));

    // No offset or ID mutation; ready to load again immediately.
    assert_eq!(harness.paginator.next_offset().await, 20);
    assert!(!harness.paginator.is_loading());
    assert_eq!(harness.recorder.ids().await.len(), 20);
    assert_eq!(*harness.paginator.phase().borrow(), PaginatorPhase::Idle);

    let ((offset, _, respond), task) = start_load(&mut harness).await;
    assert_eq!(offset, 20);
    respond.send(page(20..40, 45)).unwrap();
    assert_ok!(task.await.unwrap());
    assert_eq!(harness.paginator.next_offset().await, 40);
}

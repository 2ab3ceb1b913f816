//! Reactive local data layer between `vela-api` and application consumers.
//!
//! This crate keeps an in-memory, typed record store synchronized with a
//! persistent backing store and a remote API, and exposes live queries
//! that re-evaluate whenever the underlying data changes:
//!
//! - **[`RecordStore`]** — Type-partitioned storage. Each registered
//!   record type owns one ordered, key-unique collection behind its own
//!   writer mutex; batch mutations apply atomically and broadcast a
//!   payload-less change signal.
//!
//! - **[`LiveQuery`]** — A standing (type, predicate) subscription that
//!   re-fetches on every change signal and delivers a snapshot only when
//!   the ordered key list actually changed.
//!
//! - **[`DataObserver`]** — Wraps a live query with an optional value
//!   mapping, push/pull access, and the ID-accumulation capability the
//!   paginator narrows the feed through.
//!
//! - **[`OffsetLimitPaginator`]** — Drives a remote loader page-by-page
//!   with exactly-one-in-flight loading and stale-response rejection.
//!
//! - **[`LocalSource`] / [`RemoteSource`]** — Facades composing the
//!   store with its collaborators: JSON import-merge on the local side,
//!   page loaders and collection pulls on the remote side.
//!
//! The store, notifier, and sources are plain values constructed and
//! injected by the composing application; nothing here is ambient.

pub mod backing;
pub mod config;
pub mod error;
pub mod observer;
pub mod paginator;
pub mod query;
pub mod record;
pub mod source;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use backing::{BackingError, MemoryStore, PersistentStore};
pub use config::SyncConfig;
pub use error::CoreError;
pub use observer::{DataObserver, IdAccumulator};
pub use paginator::{OffsetLimitPaginator, PageData, PageLoader, PaginatorPhase, page_loader};
pub use query::{LiveQuery, Predicate, QueryStream, Snapshot};
pub use record::{Record, RecordKey};
pub use source::{LocalSource, RemoteSource};
pub use store::{ChangeNotifier, ChangeSignal, RecordStore};

// ── Core error types ──
//
// User-facing errors from vela-core. Transport details stay behind
// `CoreError::Api`; callers never see reqwest types directly.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Store errors ─────────────────────────────────────────────────
    /// A store operation targeted a record type that was never
    /// registered. Programmer error: register the type at composition
    /// time, never retry.
    #[error("no collection registered for record type {type_name}")]
    UnregisteredType { type_name: &'static str },

    /// An import payload failed to decode. The store is left unchanged.
    #[error("import decode failed: {message}")]
    Decode { message: String },

    // ── Paginator errors ─────────────────────────────────────────────
    /// `load_next()` was called before `refresh()` bound a loader.
    #[error("no loader bound -- call refresh() first")]
    NoLoader,

    /// `load_next()` was called while a page load was already in flight.
    #[error("a page load is already in flight")]
    AlreadyLoading,

    /// A page response arrived after a concurrent `refresh()` reset the
    /// pagination cursor. The response was discarded without mutating
    /// any state.
    #[error("stale page response discarded after concurrent refresh")]
    Cancelled,

    // ── Observer errors ──────────────────────────────────────────────
    /// `subscribe()` was called on an observer that already has an
    /// active subscription.
    #[error("observer already has an active subscription")]
    AlreadySubscribed,

    // ── Remote errors (wrapped, not exposed raw) ─────────────────────
    /// Error from the remote collection API.
    #[error("remote API error: {0}")]
    Api(#[from] vela_api::Error),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Decode {
            message: err.to_string(),
        }
    }
}

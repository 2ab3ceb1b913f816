// ── Record identity ──
//
// Everything the store holds is identified strictly by primary key.
// Structural equality of record values is never consulted.

use std::fmt::Debug;
use std::hash::Hash;

/// Capability bound for primary keys.
///
/// String keys are the common case; any cheap, hashable, comparable type
/// works. Blanket-implemented, never implemented by hand.
pub trait RecordKey: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

impl<K> RecordKey for K where K: Clone + Eq + Hash + Debug + Send + Sync + 'static {}

/// A value held by the store, identified by its primary key.
///
/// Two records with the same key are the same logical entity: inserting
/// the second replaces the first. `primary_key` may be called many times
/// per operation and should be cheap.
pub trait Record: Send + Sync + 'static {
    type Key: RecordKey;

    fn primary_key(&self) -> Self::Key;
}

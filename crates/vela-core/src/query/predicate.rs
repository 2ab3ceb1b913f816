// ── Filter predicates for record queries ──
//
// Predicates must be pure and re-invocable: a live query re-runs them
// against every store version, so they must not capture store-internal
// mutable state.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::record::Record;

/// A pure filter over records of one type.
///
/// The structured variants cover the common cases (everything, key
/// lookup, key-set membership, boolean composition); `Custom` carries an
/// arbitrary closure for domain-specific filtering.
pub enum Predicate<T: Record> {
    /// Matches every record.
    All,
    /// Matches the record with exactly this primary key.
    ById(T::Key),
    /// Matches records whose primary key is in the set. An empty set
    /// matches nothing.
    InIds(HashSet<T::Key>),
    Not(Box<Predicate<T>>),
    And(Vec<Predicate<T>>),
    Or(Vec<Predicate<T>>),
    Custom(Arc<dyn Fn(&T) -> bool + Send + Sync>),
}

impl<T: Record> Predicate<T> {
    /// Build an `InIds` predicate from any key iterator.
    pub fn in_ids(ids: impl IntoIterator<Item = T::Key>) -> Self {
        Self::InIds(ids.into_iter().collect())
    }

    /// Build a `Custom` predicate from a closure.
    pub fn custom(f: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    /// The match-nothing predicate.
    pub fn none() -> Self {
        Self::InIds(HashSet::new())
    }

    /// Evaluate this predicate against a record.
    pub fn matches(&self, record: &T) -> bool {
        match self {
            Self::All => true,
            Self::ById(key) => record.primary_key() == *key,
            Self::InIds(keys) => keys.contains(&record.primary_key()),
            Self::Not(inner) => !inner.matches(record),
            Self::And(parts) => parts.iter().all(|p| p.matches(record)),
            Self::Or(parts) => parts.iter().any(|p| p.matches(record)),
            Self::Custom(f) => f(record),
        }
    }
}

impl<T: Record> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        match self {
            Self::All => Self::All,
            Self::ById(key) => Self::ById(key.clone()),
            Self::InIds(keys) => Self::InIds(keys.clone()),
            Self::Not(inner) => Self::Not(inner.clone()),
            Self::And(parts) => Self::And(parts.clone()),
            Self::Or(parts) => Self::Or(parts.clone()),
            Self::Custom(f) => Self::Custom(Arc::clone(f)),
        }
    }
}

impl<T: Record> fmt::Debug for Predicate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "All"),
            Self::ById(key) => f.debug_tuple("ById").field(key).finish(),
            Self::InIds(keys) => f.debug_tuple("InIds").field(keys).finish(),
            Self::Not(inner) => f.debug_tuple("Not").field(inner).finish(),
            Self::And(parts) => f.debug_tuple("And").field(parts).finish(),
            Self::Or(parts) => f.debug_tuple("Or").field(parts).finish(),
            Self::Custom(_) => write!(f, "Custom(..)"),
        }
    }
}

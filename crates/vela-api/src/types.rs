// Wire types for the remote collection API.
//
// The server pages every collection with the same camelCase envelope:
// `{ offset, limit, count, totalCount, data: [...] }`.

use serde::Deserialize;

/// One page of a remote collection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Offset this page starts at.
    pub offset: u64,
    /// Page size that was requested.
    pub limit: u64,
    /// Number of items in this page.
    #[serde(default)]
    pub count: u64,
    /// Total number of items in the collection.
    pub total_count: u64,
    /// The page payload.
    pub data: Vec<T>,
}

impl<T> Page<T> {
    /// Whether this page reaches the end of the collection.
    pub fn is_last(&self) -> bool {
        self.offset + self.limit >= self.total_count
    }
}

/// Minimal record projection carrying only the primary key.
///
/// Used by paging flows that fetch keys first and hydrate the full
/// records separately.
#[derive(Debug, Clone, Deserialize)]
pub struct IdRecord {
    pub id: String,
}

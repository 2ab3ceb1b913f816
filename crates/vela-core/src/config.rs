// ── Runtime tuning configuration ──
//
// Carried by the composing application and handed into sources and
// paginators. Never read from disk here.

/// Tuning knobs for the data layer.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Page size for offset/limit pagination.
    pub page_limit: u64,
    /// Capacity of each live query's delivery channel. A slow subscriber
    /// backpressures its own query's deliveries, never the store.
    pub query_buffer: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_limit: 20,
            query_buffer: 64,
        }
    }
}

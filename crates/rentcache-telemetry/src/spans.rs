//! Span creation helpers for cache searches and snapshot I/O

use crate::attributes::*;

/// Attributes for tracing a product search
#[derive(Debug, Clone)]
pub struct SearchSpanAttributes {
    pub query: String,
    pub filters_json: String,
    /// Products left after hard filters
    pub candidates: usize,
    /// Products returned
    pub results: usize,
}

/// Attributes for tracing a snapshot load, save or erase
#[derive(Debug, Clone)]
pub struct SnapshotSpanAttributes {
    pub operation: &'static str,
    pub store: String,
    pub bytes: usize,
    pub outcome: &'static str,
}

/// Record a span for one product search.
pub fn trace_search(attrs: SearchSpanAttributes) {
    let span = tracing::debug_span!(
        "search_products",
        { RENTCACHE_OPERATION } = "search_products",
        { RENTCACHE_SEARCH_QUERY } = %attrs.query,
        { RENTCACHE_SEARCH_FILTERS } = %attrs.filters_json,
        { RENTCACHE_SEARCH_CANDIDATES } = attrs.candidates,
        { RENTCACHE_SEARCH_RESULTS } = attrs.results,
    );

    // Enter and immediately exit the span (it's recorded)
    let _guard = span.enter();
}

/// Record a span for one snapshot operation.
pub fn trace_snapshot(attrs: SnapshotSpanAttributes) {
    let span = tracing::info_span!(
        "snapshot",
        { RENTCACHE_OPERATION } = attrs.operation,
        { RENTCACHE_SNAPSHOT_STORE } = %attrs.store,
        { RENTCACHE_SNAPSHOT_BYTES } = attrs.bytes,
        { RENTCACHE_SNAPSHOT_OUTCOME } = attrs.outcome,
    );

    let _guard = span.enter();
}

/// Helper to safely serialize to JSON string
pub fn safe_serialize<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "<not serializable>".to_string())
}

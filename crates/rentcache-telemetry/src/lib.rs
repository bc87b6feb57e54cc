//! # rentcache Telemetry
//!
//! Structured logging and OpenTelemetry tracing for the memory cache.
//!
//! [`init_telemetry`] installs a `tracing` subscriber driven by the
//! `[observability]` config section. The span helpers record searches and
//! snapshot I/O with stable attribute names so they can be queried in any
//! OpenTelemetry backend.

mod spans;
mod tracer;

pub use spans::{
    SearchSpanAttributes, SnapshotSpanAttributes, safe_serialize, trace_search, trace_snapshot,
};
pub use tracer::{init_telemetry, register_span_processor, tracer_provider};

/// Span attribute names used by the cache.
pub mod attributes {
    pub const RENTCACHE_OPERATION: &str = "rentcache.operation";

    // Search attributes
    pub const RENTCACHE_SEARCH_QUERY: &str = "rentcache.search.query";
    pub const RENTCACHE_SEARCH_FILTERS: &str = "rentcache.search.filters";
    pub const RENTCACHE_SEARCH_CANDIDATES: &str = "rentcache.search.candidates";
    pub const RENTCACHE_SEARCH_RESULTS: &str = "rentcache.search.results";

    // Snapshot attributes
    pub const RENTCACHE_SNAPSHOT_STORE: &str = "rentcache.snapshot.store";
    pub const RENTCACHE_SNAPSHOT_BYTES: &str = "rentcache.snapshot.bytes";
    pub const RENTCACHE_SNAPSHOT_OUTCOME: &str = "rentcache.snapshot.outcome";

    /// Default tracer name when no service name is configured
    pub const SYSTEM_NAME: &str = "rentcache";
}

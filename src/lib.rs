//! # rentcache
//!
//! Conversation and product memory for a rental-marketplace chat agent.
//!
//! This crate re-exports the workspace members:
//!
//! - [`core`]: domain records, errors and configuration
//! - [`store`]: snapshot persistence backends
//! - [`memory`]: the [`MemoryCache`] service
//! - [`telemetry`]: logging and tracing setup

pub use rentcache_core as core;
pub use rentcache_memory as memory;
pub use rentcache_store as store;
pub use rentcache_telemetry as telemetry;

pub use rentcache_core::{Error, RentCacheConfig, Result};
pub use rentcache_memory::{CacheUpdate, MemoryCache, MemoryStats};

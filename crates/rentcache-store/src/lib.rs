//! # rentcache Snapshot Store
//!
//! Persistence for the memory cache. A snapshot is one JSON document holding
//! the whole cache state, wrapped in a versioned envelope so older documents
//! can be recognised and discarded instead of misparsed.
//!
//! ## Backends
//!
//! - **File**: one file on local disk, replaced atomically on every save
//! - **In-memory**: a shared text slot, for tests and ephemeral deployments

mod envelope;
mod filesystem;
mod memory;
mod service;

pub use envelope::{SCHEMA_VERSION, SnapshotEnvelope, decode_envelope, encode_envelope};
pub use filesystem::FileSnapshotStore;
pub use memory::InMemorySnapshotStore;
pub use service::*;

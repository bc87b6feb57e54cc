//! Versioned framing for snapshot documents

use chrono::{DateTime, Utc};
use rentcache_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Version written by this build. Documents carrying any other version are rejected.
pub const SCHEMA_VERSION: u32 = 1;

/// `{ "schemaVersion": 1, "savedAt": "...", "payload": { ... } }`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEnvelope<T> {
    pub schema_version: u32,
    pub saved_at: DateTime<Utc>,
    pub payload: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeHeader {
    schema_version: Option<u32>,
}

/// Wrap `payload` in an envelope stamped with the current version and time.
pub fn encode_envelope<T: Serialize>(payload: &T) -> Result<String> {
    let envelope = SnapshotEnvelope {
        schema_version: SCHEMA_VERSION,
        saved_at: Utc::now(),
        payload,
    };
    Ok(serde_json::to_string(&envelope)?)
}

/// Parse an envelope, checking the version before touching the payload.
///
/// Documents without a `schemaVersion` field predate the envelope and are
/// reported as [`Error::Snapshot`]; other versions as [`Error::SchemaMismatch`].
pub fn decode_envelope<T: DeserializeOwned>(text: &str) -> Result<SnapshotEnvelope<T>> {
    let header: EnvelopeHeader = serde_json::from_str(text)?;

    let found = header
        .schema_version
        .ok_or_else(|| Error::snapshot_error("document has no schemaVersion"))?;

    if found != SCHEMA_VERSION {
        return Err(Error::SchemaMismatch {
            found,
            expected: SCHEMA_VERSION,
        });
    }

    Ok(serde_json::from_str(text)?)
}

//! Snapshot envelope
//!
//! Wraps the serialized session map with a format version, the time it was
//! taken and a SHA-256 of the payload.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::StorageError;
use crate::Result;

pub const ENVELOPE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotEnvelope {
    /// Envelope format version
    pub version: u32,
    /// When the snapshot was taken
    pub saved_at: DateTime<Utc>,
    /// Lowercase hex SHA-256 of the compact payload encoding
    pub checksum: String,
    /// The snapshot itself
    pub payload: Value,
}

impl SnapshotEnvelope {
    /// Wrap an already-serialized payload
    pub fn new(payload: Value) -> Result<Self> {
        let checksum = checksum(&payload)?;

        Ok(Self {
            version: ENVELOPE_VERSION,
            saved_at: Utc::now(),
            checksum,
            payload,
        })
    }

    /// Serialize `payload` and wrap it
    pub fn wrap<T: Serialize>(payload: &T) -> Result<Self> {
        Self::new(serde_json::to_value(payload)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parse and verify an envelope read back from disk
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let envelope: SnapshotEnvelope = serde_json::from_slice(bytes)?;

        if envelope.version != ENVELOPE_VERSION {
            return Err(StorageError::UnsupportedVersion(envelope.version));
        }

        let actual = checksum(&envelope.payload)?;
        if actual != envelope.checksum {
            return Err(StorageError::ChecksumMismatch {
                expected: envelope.checksum,
                actual,
            });
        }

        Ok(envelope)
    }

    pub fn into_payload<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.payload)?)
    }
}

fn checksum(payload: &Value) -> Result<String> {
    let bytes = serde_json::to_vec(payload)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

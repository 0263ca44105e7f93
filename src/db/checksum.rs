//! Checksums over clear-audit snapshot blobs.
//!
//! Every `schedule_clear_audit` row stores a SHA-256 digest beside its
//! snapshot JSON; reconstruction verifies the blob against the digest
//! before decoding it.

use sha2::{Digest, Sha256};

/// Hex SHA-256 digest of a serialized snapshot blob.
pub fn snapshot_checksum(blob: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(blob.to_string().as_bytes());
    hex::encode(hasher.finalize())
}

/// Check a stored blob against the digest recorded with it.
pub fn verify_snapshot_blob(blob: &serde_json::Value, recorded: &str) -> bool {
    snapshot_checksum(blob) == recorded
}

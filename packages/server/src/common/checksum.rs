//! Content checksums for upload deduplication.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 over the raw bytes. `(user_id, checksum)` is the
/// dedup key for uploads: identical bytes map to the same document.
pub fn content_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

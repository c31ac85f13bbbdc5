//! Content digests used for change detection.
//!
//! Always computed over the raw bytes on disk; never over decoded text.

use sha2::{Digest, Sha256};

/// Hex-encoded SHA-256 of `bytes`.
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

//! Content digest of raw snapshot bytes

use sha2::{Digest, Sha256};

/// SHA-256 of the raw document, hex encoded.
///
/// Two reads with the same digest are the same logical write.
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

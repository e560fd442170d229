//! An in-memory memoizing cache.
//!
//! Entries are generated lazily by caller-supplied functions. Each key is
//! generated at most once: concurrent requests for a key that is still being
//! generated block until the first generator finishes, while requests for
//! other keys proceed independently. Failed generations are not cached, so
//! the next request for the same key runs its generator again.
#![warn(missing_docs)]

use sha2::{Digest, Sha256};

pub mod mem;

/// Hashes the given bytes with SHA-256.
pub fn hash(val: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(val);
    hasher.finalize()[..].into()
}

/// Hashes the given bytes with SHA-256, returning the lowercase hex digest.
///
/// # Examples
///
/// ```
/// assert_eq!(
///     cache::hex_digest(b""),
///     "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855",
/// );
/// ```
pub fn hex_digest(val: &[u8]) -> String {
    hex::encode(hash(val))
}

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Content fingerprint of durable state content.
///
/// A `ContentHash` is the hex-encoded BLAKE3 digest of a content unit. The
/// digest is opaque to every consumer; only equality matters. The cache's
/// recorded hash matching the durable content's current hash is what marks
/// cached state as fresh.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Digest of raw bytes.
    pub fn of_bytes(data: &[u8]) -> Self {
        Self(hex::encode(blake3::hash(data).as_bytes()))
    }

    /// Digest of one account's compressed content unit.
    ///
    /// Hashes the *string form* of the compressed bytes (lossy UTF-8), not
    /// the raw bytes and not the pre-compression text. Historical state
    /// files were fingerprinted this way; changing it would invalidate
    /// every recorded hash, so it is kept byte-compatible. The compression
    /// level is pinned in the codec for the same reason.
    pub fn of_compressed(compressed: &[u8]) -> Self {
        let text = String::from_utf8_lossy(compressed);
        Self::of_bytes(text.as_bytes())
    }

    /// Fold per-account digests into a single workspace-level digest.
    ///
    /// Input order does not matter: digests are sorted before combining, so
    /// the result is stable across account enumeration orders.
    pub fn combine(hashes: &[ContentHash]) -> Self {
        let mut sorted: Vec<&str> = hashes.iter().map(|h| h.as_str()).collect();
        sorted.sort_unstable();
        Self::of_bytes(sorted.concat().as_bytes())
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// The hex digest string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> &str {
        &self.0[..8]
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//! Content hashes identifying audit payloads.
//!
//! A [`DataHash`] is exactly 32 bytes. Submitters usually compute it off-line;
//! [`DataHash::digest`] offers BLAKE3 for tooling that hashes a document
//! locally.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of a content hash in bytes.
pub const HASH_LEN: usize = 32;

/// A 32-byte content hash, unique per admitted audit.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DataHash([u8; HASH_LEN]);

impl DataHash {
    /// Hash a document with BLAKE3.
    #[must_use]
    pub fn digest(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Create from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }

    /// Try to create from a slice.
    ///
    /// Returns `None` if the slice is not exactly 32 bytes.
    #[must_use]
    pub fn try_from_slice(slice: &[u8]) -> Option<Self> {
        <[u8; HASH_LEN]>::try_from(slice).ok().map(Self)
    }

    /// Get the raw bytes.
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; HASH_LEN] {
        &self.0
    }

    /// Encode as lowercase hex.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Decode from hex.
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid hex or not 32 bytes.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        Self::try_from_slice(&bytes).ok_or(hex::FromHexError::InvalidStringLength)
    }
}

impl fmt::Debug for DataHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DataHash({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for DataHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for DataHash {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for DataHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for DataHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl AsRef<[u8]> for DataHash {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; HASH_LEN]> for DataHash {
    fn from(bytes: [u8; HASH_LEN]) -> Self {
        Self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_from_slice_length() {
        assert!(DataHash::try_from_slice(&[1u8; 32]).is_some());
        assert!(DataHash::try_from_slice(&[1u8; 31]).is_none());
        assert!(DataHash::try_from_slice(&[1u8; 33]).is_none());
        assert!(DataHash::try_from_slice(&[]).is_none());
    }

    #[test]
    fn test_digest_is_deterministic() {
        assert_eq!(DataHash::digest(b"report"), DataHash::digest(b"report"));
        assert_ne!(DataHash::digest(b"report"), DataHash::digest(b"other"));
    }

    #[test]
    fn test_hex_rejects_short_input() {
        let short = hex::encode([7u8; 31]);
        assert!(DataHash::from_hex(&short).is_err());
        assert!(DataHash::from_hex("zz").is_err());
    }

    #[test]
    fn test_serde_as_hex() {
        let hash = DataHash::from_bytes([0xab; 32]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", "ab".repeat(32)));
        let back: DataHash = serde_json::from_str(&json).unwrap();
        assert_eq!(back, hash);
    }

    #[test]
    fn test_debug_is_truncated() {
        let hash = DataHash::from_bytes([1u8; 32]);
        assert_eq!(format!("{hash:?}"), "DataHash(0101010101010101)");
    }
}

//! Strong type definitions for the escrow ledger.
//!
//! The physical storage address of a record is a newtype so it cannot be
//! confused with the literal key it was derived from.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain separator mixed into every key digest.
const KEY_DOMAIN: &[u8] = b"escrow-ledger-key-v0:";

/// A 32-byte key digest, computed as Blake3(domain || key).
///
/// This is the content-address under which a record's value is stored.
/// The literal key lives in the index and points here.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeyDigest(pub [u8; 32]);

impl KeyDigest {
    /// Digest a literal key.
    pub fn of(key: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(KEY_DOMAIN);
        hasher.update(key.as_bytes());
        Self(*hasher.finalize().as_bytes())
    }

    /// Create a new KeyDigest from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from hex string.
    pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(hex::FromHexError::InvalidStringLength);
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for KeyDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KeyDigest({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for KeyDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for KeyDigest {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for KeyDigest {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for KeyDigest {
    type Error = std::array::TryFromSliceError;

    fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 32] = slice.try_into()?;
        Ok(Self(arr))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_is_deterministic() {
        assert_eq!(KeyDigest::of("ec:1042"), KeyDigest::of("ec:1042"));
        assert_ne!(KeyDigest::of("ec:1042"), KeyDigest::of("ec:1043"));
    }

    #[test]
    fn test_digest_is_domain_separated() {
        let plain = *blake3::hash(b"ec:1").as_bytes();
        assert_ne!(KeyDigest::of("ec:1").0, plain);
    }

    #[test]
    fn test_key_digest_hex_roundtrip() {
        let digest = KeyDigest::of("rf:7");
        let recovered = KeyDigest::from_hex(&digest.to_hex()).unwrap();
        assert_eq!(digest, recovered);
        assert!(KeyDigest::from_hex("abcd").is_err());
    }

    #[test]
    fn test_key_digest_display() {
        let digest = KeyDigest::from_bytes([0xab; 32]);
        assert_eq!(format!("{}", digest), "abababababababab");
        assert!(format!("{:?}", digest).starts_with("KeyDigest("));
    }
}

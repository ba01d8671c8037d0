//! Transaction hash type using SHA-384.

use sha2::{Digest, Sha384};
use std::fmt;

/// A 48-byte SHA-384 digest of a signed transaction.
///
/// This is the hash the ledger reports for a submitted transaction.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionHash([u8; 48]);

impl TransactionHash {
    /// Size of hash in bytes.
    pub const BYTES: usize = 48;

    /// Hash the given bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let digest = Sha384::digest(bytes);
        let mut arr = [0u8; 48];
        arr.copy_from_slice(&digest);
        Self(arr)
    }

    /// Parse hash from hex string.
    pub fn from_hex(hex: &str) -> Result<Self, HexError> {
        if hex.len() != Self::BYTES * 2 {
            return Err(HexError::InvalidLength {
                expected: Self::BYTES * 2,
                actual: hex.len(),
            });
        }

        let mut bytes = [0u8; 48];
        hex::decode_to_slice(hex, &mut bytes).map_err(|_| HexError::InvalidHex)?;

        Ok(Self(bytes))
    }

    /// Convert hash to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Get bytes as slice reference.
    pub fn as_bytes(&self) -> &[u8; 48] {
        &self.0
    }
}

impl fmt::Debug for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        write!(f, "TransactionHash({}..{})", &hex[..8], &hex[88..])
    }
}

impl fmt::Display for TransactionHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Errors that can occur when parsing hex strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HexError {
    /// Invalid hex string length.
    #[error("Invalid hex length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Invalid hex characters.
    #[error("Invalid hex string")]
    InvalidHex,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_deterministic() {
        let data = b"signed transaction";
        assert_eq!(
            TransactionHash::from_bytes(data),
            TransactionHash::from_bytes(data)
        );
        assert_ne!(
            TransactionHash::from_bytes(b"a"),
            TransactionHash::from_bytes(b"b")
        );
    }

    #[test]
    fn test_known_digest() {
        let hash = TransactionHash::from_bytes(b"abc");
        assert_eq!(
            hash.to_hex(),
            "cb00753f45a35e8bb5a03d699ac65007272c32ab0eded1631a8b605a43ff5bed\
             8086072ba1e7cc2358baeca134c825a7"
        );
    }

    #[test]
    fn test_hex_roundtrip() {
        let hash = TransactionHash::from_bytes(b"data");
        assert_eq!(TransactionHash::from_hex(&hash.to_hex()).unwrap(), hash);
        assert!(matches!(
            TransactionHash::from_hex("abcd"),
            Err(HexError::InvalidLength { .. })
        ));
    }
}

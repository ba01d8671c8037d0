//! Keys, signatures and the signing capability.
//!
//! Transactions are signed by anything implementing [`Signer`]. The bundled
//! implementation is [`Ed25519Signer`], which keeps the private key in memory.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// A public key identifying a signer.
///
/// Ordering is total so keys can be used as sorted map keys; signature maps
/// rely on this for deterministic serialization.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PublicKey {
    /// ED25519 public key (32 bytes).
    Ed25519([u8; 32]),
}

impl PublicKey {
    /// Parse a raw ED25519 public key.
    pub fn ed25519_from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let array: [u8; 32] = bytes.try_into().map_err(|_| KeyError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        ed25519_dalek::VerifyingKey::from_bytes(&array).map_err(|_| KeyError::InvalidKey)?;
        Ok(PublicKey::Ed25519(array))
    }

    /// Verify a signature.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        match (self, signature) {
            (PublicKey::Ed25519(pk_bytes), Signature::Ed25519(sig_bytes)) => {
                use ed25519_dalek::Verifier;
                let pk = match ed25519_dalek::VerifyingKey::from_bytes(pk_bytes) {
                    Ok(pk) => pk,
                    Err(_) => return false,
                };
                let sig_array: [u8; 64] = match sig_bytes.as_slice().try_into() {
                    Ok(arr) => arr,
                    Err(_) => return false,
                };
                let sig = ed25519_dalek::Signature::from_bytes(&sig_array);
                pk.verify(message, &sig).is_ok()
            }
        }
    }

    /// Get public key as bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            PublicKey::Ed25519(bytes) => bytes.as_slice(),
        }
    }

    /// Lowercase hex of the raw key bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PublicKey::Ed25519(bytes) => {
                write!(f, "PublicKey::Ed25519({})", hex::encode(bytes))
            }
        }
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A cryptographic signature.
#[derive(Clone, PartialEq, Eq)]
pub enum Signature {
    /// ED25519 signature (64 bytes).
    Ed25519(Vec<u8>),
}

impl Signature {
    /// Get signature as bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            Signature::Ed25519(bytes) => bytes.clone(),
        }
    }

    /// Get signature as byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Signature::Ed25519(bytes) => bytes.as_slice(),
        }
    }

    /// Consume the signature, returning its bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Signature::Ed25519(bytes) => bytes,
        }
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Signature::Ed25519(bytes) => {
                let hex = hex::encode(bytes);
                write!(f, "Signature::Ed25519({}..)", &hex[..hex.len().min(16)])
            }
        }
    }
}

/// Something that can produce signatures over transaction bodies.
///
/// Implementations must be deterministic for a given message if they are to be
/// used with [`PublicKey::verify`]-based consistency checks; ED25519 is.
pub trait Signer: Send + Sync {
    /// The public key matching the signatures this signer produces.
    fn public_key(&self) -> PublicKey;

    /// Sign a message.
    fn sign(&self, message: &[u8]) -> Signature;
}

impl<S: Signer + ?Sized> Signer for Arc<S> {
    fn public_key(&self) -> PublicKey {
        (**self).public_key()
    }

    fn sign(&self, message: &[u8]) -> Signature {
        (**self).sign(message)
    }
}

impl<S: Signer + ?Sized> Signer for Box<S> {
    fn public_key(&self) -> PublicKey {
        (**self).public_key()
    }

    fn sign(&self, message: &[u8]) -> Signature {
        (**self).sign(message)
    }
}

/// An in-memory ED25519 private key.
#[derive(Clone)]
pub struct Ed25519Signer {
    key: ed25519_dalek::SigningKey,
}

impl Ed25519Signer {
    /// Generate a new random key.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Derive a key from a 32-byte seed (for tests and fixtures).
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Parse a raw 32-byte private key.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        let seed: [u8; 32] = bytes.try_into().map_err(|_| KeyError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        Ok(Self::from_seed(&seed))
    }
}

impl Signer for Ed25519Signer {
    fn public_key(&self) -> PublicKey {
        PublicKey::Ed25519(self.key.verifying_key().to_bytes())
    }

    fn sign(&self, message: &[u8]) -> Signature {
        use ed25519_dalek::Signer as _;
        Signature::Ed25519(self.key.sign(message).to_bytes().to_vec())
    }
}

impl FromStr for Ed25519Signer {
    type Err = KeyError;

    /// Parse a hex encoded private key, with or without a `0x` prefix.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|_| KeyError::InvalidHex)?;
        Self::from_bytes(&bytes)
    }
}

impl fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ed25519Signer({})", self.public_key().to_hex())
    }
}

/// Errors that can occur when parsing keys.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum KeyError {
    /// Wrong number of key bytes.
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidLength {
        /// Expected length.
        expected: usize,
        /// Actual length.
        actual: usize,
    },

    /// Invalid hex characters.
    #[error("Invalid hex string")]
    InvalidHex,

    /// Bytes do not form a valid key.
    #[error("Invalid key")]
    InvalidKey,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ed25519_sign_verify() {
        let signer = Ed25519Signer::generate();
        let message = b"test message";

        let signature = signer.sign(message);
        let pubkey = signer.public_key();

        assert!(pubkey.verify(message, &signature));
    }

    #[test]
    fn test_ed25519_verify_fails_wrong_message() {
        let signer = Ed25519Signer::generate();
        let signature = signer.sign(b"test message");

        assert!(!signer.public_key().verify(b"wrong message", &signature));
    }

    #[test]
    fn test_seeded_signer_is_deterministic() {
        let a = Ed25519Signer::from_seed(&[7u8; 32]);
        let b = Ed25519Signer::from_seed(&[7u8; 32]);

        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.sign(b"body"), b.sign(b"body"));
    }

    #[test]
    fn test_parse_hex_private_key() {
        let hex_key = hex::encode([3u8; 32]);
        let parsed: Ed25519Signer = format!("0x{hex_key}").parse().unwrap();
        assert_eq!(
            parsed.public_key(),
            Ed25519Signer::from_seed(&[3u8; 32]).public_key()
        );

        assert_eq!(
            "abcd".parse::<Ed25519Signer>().unwrap_err(),
            KeyError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
        assert_eq!(
            "zz".parse::<Ed25519Signer>().unwrap_err(),
            KeyError::InvalidHex
        );
    }

    #[test]
    fn test_public_key_from_bytes() {
        let signer = Ed25519Signer::from_seed(&[1u8; 32]);
        let pk = signer.public_key();
        assert_eq!(PublicKey::ed25519_from_bytes(pk.as_bytes()).unwrap(), pk);
        assert!(PublicKey::ed25519_from_bytes(&[0u8; 5]).is_err());
    }
}

//! Test helpers for ledgerlink.
//!
//! - [`MockTransport`]: a scripted [`Transport`](ledgerlink_network::Transport)
//!   that records every connect, call and close
//! - [`TestSigners`]: deterministic Ed25519 signers
//! - [`fixtures`]: node maps and encoded node responses
//!
//! # Example
//!
//! ```rust
//! use ledgerlink_test_helpers::{fixtures, MockTransport};
//! use ledgerlink_types::Status;
//!
//! let transport = MockTransport::new();
//! let node = fixtures::node_address(3);
//! transport.push_response(&node, Ok(fixtures::precheck_response(Status::Busy)));
//! transport.push_response(&node, Ok(fixtures::precheck_response(Status::Ok)));
//! assert_eq!(transport.pending_responses(&node), 2);
//! ```

pub mod fixtures;
mod mock;

pub use mock::{MockChannel, MockTransport, RecordedCall};

use ledgerlink_types::{Ed25519Signer, PublicKey, Signer};

/// A set of signers with deterministic keys.
pub struct TestSigners {
    signers: Vec<Ed25519Signer>,
}

impl std::fmt::Debug for TestSigners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestSigners")
            .field("size", &self.signers.len())
            .finish()
    }
}

impl TestSigners {
    /// Create `count` signers whose keys derive from `seed`.
    pub fn new(count: usize, seed: u64) -> Self {
        let signers = (0..count)
            .map(|i| {
                let mut key_seed = [0u8; 32];
                key_seed[..8].copy_from_slice(&seed.to_le_bytes());
                key_seed[8..16].copy_from_slice(&(i as u64).to_le_bytes());
                Ed25519Signer::from_seed(&key_seed)
            })
            .collect();
        Self { signers }
    }

    /// The signer at `index`.
    pub fn signer(&self, index: usize) -> &Ed25519Signer {
        &self.signers[index]
    }

    /// Public key of the signer at `index`.
    pub fn public_key(&self, index: usize) -> PublicKey {
        self.signers[index].public_key()
    }

    pub fn len(&self) -> usize {
        self.signers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signers.is_empty()
    }
}

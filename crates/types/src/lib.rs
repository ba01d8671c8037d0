//! Core types for the ledgerlink client.
//!
//! This crate provides the foundational types used by the network and client
//! layers:
//!
//! - **Identifiers**: AccountId, FileId, TopicId, Timestamp, TransactionId
//! - **Addressing**: NodeAddress and the well-known service ports
//! - **Primitives**: TransactionHash, public keys, signatures and the Signer capability
//! - **Status codes**: precheck and receipt statuses
//!
//! It does not depend on any other workspace crates.

mod address;
mod crypto;
mod hash;
mod identifiers;
mod status;

pub use address::{
    NodeAddress, CONSENSUS_PLAINTEXT_PORT, CONSENSUS_TLS_PORT, MIRROR_PLAINTEXT_PORT,
    MIRROR_TLS_PORT,
};
pub use crypto::{Ed25519Signer, KeyError, PublicKey, Signature, Signer};
pub use hash::{HexError, TransactionHash};
pub use identifiers::{AccountId, FileId, ParseError, Timestamp, TopicId, TransactionId};
pub use status::Status;

//! Client for submitting transactions and queries to a ledger network.
//!
//! # Architecture
//!
//! ```text
//! Transaction<D> ──freeze──▶ FrozenTransaction<D> ──sign──▶ execute
//!                                                             │
//!                                  ┌──────────────────────────┘
//!                                  ▼
//!                     retry loop (node selection, backoff)
//!                                  │
//!                                  ▼
//!                 ManagedNetwork ─▶ ChannelPool ─▶ Transport
//! ```
//!
//! A [`Client`] owns two [`ManagedNetwork`](ledgerlink_network::ManagedNetwork)s,
//! consensus and mirror, plus the operator account and execution settings.
//! Every unary request runs through one retry loop that picks healthy nodes,
//! penalizes failing ones and gives up on terminal statuses.
//!
//! # Example
//!
//! ```no_run
//! use ledgerlink_client::{AccountId, Client, Ed25519Signer, TransferTransaction};
//!
//! # async fn run() -> Result<(), ledgerlink_client::Error> {
//! let client = Client::for_testnet()?;
//! client.set_operator(AccountId::from_num(1001), Ed25519Signer::generate());
//!
//! let mut tx = TransferTransaction::new()
//!     .hbar_transfer(AccountId::from_num(1001), -10)
//!     .hbar_transfer(AccountId::from_num(1002), 10)
//!     .freeze_with(&client)?;
//! let response = tx.execute(&client).await?;
//! let receipt = response.get_receipt(&client).await?;
//! println!("{}", receipt.status);
//! # Ok(())
//! # }
//! ```

mod client;
mod config;
mod error;
mod execute;
mod mirror;
pub mod query;
mod response;
pub mod transaction;

pub use client::Client;
pub use config::{
    ChunkingSection, ClientConfig, ExecutionSection, ExecutionSettings, NetworkPreset,
    NetworkSection, OperatorSection,
};
pub use error::{ConfigError, Error, TransactionError};
pub use execute::{Execute, ExecutorStats, Outcome};
pub use query::{TransactionReceipt, TransactionReceiptQuery, TransactionRecord, TransactionRecordQuery};
pub use response::TransactionResponse;
pub use transaction::{
    AnyTransactionData, ChunkContext, FileAppendData, FileAppendTransaction, FrozenTransaction,
    SignatureMap, TopicMessageData, TopicMessageSubmitTransaction, Transaction, TransactionData,
    TransferData, TransferTransaction,
};

pub use ledgerlink_network::{GrpcTransport, NetworkChange, Transport};
pub use ledgerlink_types::{
    AccountId, Ed25519Signer, FileId, NodeAddress, PublicKey, Signer, Status, TopicId,
    TransactionHash, TransactionId,
};

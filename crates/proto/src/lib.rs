//! Wire messages exchanged with ledger nodes.
//!
//! Messages are declared with `prost` derives directly rather than generated
//! from `.proto` files, and cover only what the client core needs:
//!
//! - **Transactions**: `TransactionBody` and its operation payloads,
//!   `SignedTransaction`, `Transaction`, `TransactionList`, `SignatureMap`
//! - **Queries**: receipt and record queries plus their responses
//! - **Conversions**: to and from the `ledgerlink-types` identifiers
//!
//! Every message uses deterministic field ordering so re-encoding a decoded
//! body yields the same bytes, which the transaction consistency check relies on.

mod basic;
mod convert;
mod queries;
pub mod services;
mod transaction;

pub use basic::{AccountId, Duration, FileId, Timestamp, TopicId, TransactionId};
pub use convert::ProtoError;
pub use queries::{
    query, response, Query, QueryHeader, Response, ResponseHeader, ResponseType,
    TransactionGetReceiptQuery, TransactionGetReceiptResponse, TransactionGetRecordQuery,
    TransactionGetRecordResponse, TransactionReceipt, TransactionRecord,
};
pub use transaction::{
    signature_pair, transaction_body, AccountAmount, ConsensusMessageChunkInfo,
    ConsensusSubmitMessageTransactionBody, CryptoTransferTransactionBody,
    FileAppendTransactionBody, SignatureMap, SignaturePair, SignedTransaction, Transaction,
    TransactionBody, TransactionList, TransactionResponse, TransferList,
};

/// Re-exported so downstream crates can call `encode_to_vec` / `decode`
/// without naming `prost` themselves.
pub use prost::{DecodeError, Message};

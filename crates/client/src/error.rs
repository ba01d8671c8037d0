//! Client error types.

use ledgerlink_network::{NetworkError, TransportError};
use ledgerlink_proto::ProtoError;
use crate::TransactionResponse;
use ledgerlink_types::{AccountId, NodeAddress, PublicKey, Status, TransactionId};

/// Errors raised locally while building, freezing, signing or decoding a transaction.
///
/// These never reach the network and are never retried.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransactionError {
    /// Freeze was attempted without node account ids.
    #[error("no node account ids set")]
    NoNodeAccountIds,

    /// The same node account id appears more than once.
    #[error("node account id {0} listed more than once")]
    DuplicateNodeAccountId(AccountId),

    /// Freeze was attempted without a transaction id and none could be generated.
    #[error("no transaction id set and no operator to generate one")]
    NoTransactionId,

    /// The content needs more chunks than allowed.
    #[error("content needs {required} chunks but at most {max} are allowed")]
    MaxChunksExceeded {
        /// Chunks the content would need.
        required: usize,
        /// Configured limit.
        max: usize,
    },

    /// Chunk size of zero.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,

    /// The key has no signatures on this transaction.
    #[error("no signatures from {0}")]
    NoSuchSigner(PublicKey),

    /// `add_signature` was given the wrong number of signatures.
    #[error("expected {expected} signatures (one per chunk and node), got {actual}")]
    SignatureCountMismatch {
        /// Number of (chunk, node) bodies.
        expected: usize,
        /// Number supplied.
        actual: usize,
    },

    /// Per-node variants of a deserialized transaction differ beyond the node account id.
    #[error("transaction {transaction_id} body for node {node} differs from other nodes")]
    InconsistentBodies {
        /// Chunk transaction id.
        transaction_id: TransactionId,
        /// Node whose body differs.
        node: AccountId,
    },

    /// Chunks of a deserialized transaction target different node lists.
    #[error("chunk {transaction_id} targets a different node list")]
    InconsistentNodes {
        /// Chunk transaction id.
        transaction_id: TransactionId,
    },

    /// The serialized bytes contained no transactions.
    #[error("no transactions in list")]
    Empty,

    /// A deserialized body is for a different operation than expected.
    #[error("unexpected transaction body: expected {expected}")]
    UnexpectedBody {
        /// Operation the caller asked for.
        expected: &'static str,
    },

    /// A required field was missing or malformed while decoding.
    #[error("malformed transaction: {0}")]
    Malformed(#[from] ProtoError),
}

/// Errors from loading client configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that was read.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The TOML was malformed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value was out of range or unparseable.
    #[error("invalid config value for `{field}`: {reason}")]
    Invalid {
        /// Dotted path of the offending field.
        field: String,
        /// What was wrong.
        reason: String,
    },
}

/// Top-level client error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Local construction or decoding failure.
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    /// A node rejected the request with a terminal precheck status.
    #[error("node {node} rejected {} with {status}", describe_transaction(.transaction_id))]
    PrecheckStatus {
        /// Node that answered.
        node: AccountId,
        /// Status returned.
        status: Status,
        /// Transaction the status refers to, if any.
        transaction_id: Option<TransactionId>,
    },

    /// The transaction reached consensus but did not succeed.
    #[error("transaction {transaction_id} failed with receipt status {status}")]
    ReceiptStatus {
        /// Final status.
        status: Status,
        /// Transaction the receipt belongs to.
        transaction_id: TransactionId,
    },

    /// Every allowed attempt failed with a retryable error.
    #[error("gave up after {attempts} attempts (last node {}): {source}", describe_node(.last_node))]
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Node tried last.
        last_node: Option<AccountId>,
        /// The last error observed.
        #[source]
        source: Box<Error>,
    },

    /// A chunk after the first failed. Earlier chunks were already accepted.
    #[error("chunk {} of {total} failed: {source}", .completed.len() + 1)]
    ChunkFailed {
        /// Responses of the chunks accepted before the failure, in order.
        completed: Vec<TransactionResponse>,
        /// Number of chunks in the transaction.
        total: usize,
        /// Why the failing chunk did not go through.
        #[source]
        source: Box<Error>,
    },

    /// The overall call deadline passed before an attempt succeeded.
    #[error("request timed out{}", describe_last_error(.last_error))]
    TimedOut {
        /// The last error observed before the deadline, if any attempt was made.
        last_error: Option<Box<Error>>,
    },

    /// Transport failure against one node.
    #[error("transport error at {address}: {source}")]
    Transport {
        /// Address of the node.
        address: NodeAddress,
        /// Underlying error.
        #[source]
        source: TransportError,
    },

    /// Network reconfiguration failed.
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// Configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The client was closed.
    #[error("client is closed")]
    Closed,

    /// None of the requested nodes are known to the client.
    #[error("no nodes available for request")]
    NoNodes,

    /// The operation needs an operator account and key.
    #[error("client has no operator")]
    NoOperator,

    /// A node response could not be decoded.
    #[error("failed to decode response: {0}")]
    Decode(#[from] ProtoError),
}

impl Error {
    /// The precheck or receipt status carried by this error, looking through
    /// retry wrappers.
    pub fn status(&self) -> Option<Status> {
        match self {
            Error::PrecheckStatus { status, .. } | Error::ReceiptStatus { status, .. } => {
                Some(*status)
            }
            Error::Exhausted { source, .. } | Error::ChunkFailed { source, .. } => source.status(),
            Error::TimedOut {
                last_error: Some(e),
            } => e.status(),
            _ => None,
        }
    }
}

impl From<ledgerlink_proto::DecodeError> for Error {
    fn from(e: ledgerlink_proto::DecodeError) -> Self {
        Error::Decode(ProtoError::Decode(e))
    }
}

impl From<ledgerlink_proto::DecodeError> for TransactionError {
    fn from(e: ledgerlink_proto::DecodeError) -> Self {
        TransactionError::Malformed(ProtoError::Decode(e))
    }
}

fn describe_transaction(id: &Option<TransactionId>) -> String {
    id.map(|id| id.to_string())
        .unwrap_or_else(|| "query".to_string())
}

fn describe_node(node: &Option<AccountId>) -> String {
    node.map(|n| n.to_string())
        .unwrap_or_else(|| "none".to_string())
}

fn describe_last_error(error: &Option<Box<Error>>) -> String {
    error.as_ref().map(|e| format!(": {e}")).unwrap_or_default()
}

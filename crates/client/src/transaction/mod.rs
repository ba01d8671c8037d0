//! Transactions: build, freeze, sign, serialize and execute.
//!
//! A transaction goes through two types:
//!
//! 1. [`Transaction<D>`] is a builder. Content setters consume and return it.
//! 2. [`Transaction::freeze`] (or [`Transaction::freeze_with`]) turns it into a
//!    [`FrozenTransaction<D>`]: node list, transaction id and one encoded body
//!    per (chunk, node) are fixed. Only signatures can change from here on.
//!
//! Operations whose payload can exceed one chunk (topic messages, file
//! appends) are split into chunks at freeze time. Chunk `i` uses the base
//! transaction id advanced by `i` nanoseconds.
//!
//! ```compile_fail
//! use ledgerlink_client::{AccountId, TransferTransaction, TransactionId};
//!
//! let frozen = TransferTransaction::new()
//!     .node_account_ids([AccountId::from_num(3)])
//!     .transaction_id(TransactionId::generate(AccountId::from_num(2)))
//!     .freeze()
//!     .unwrap();
//! // A frozen transaction has no content setters and cannot be frozen again.
//! frozen.freeze();
//! ```

mod chunk;
pub mod data;
mod execute;
mod frozen;
mod serialize;
mod signature_map;

pub use data::{
    AnyTransactionData, FileAppendData, FileAppendTransaction, TopicMessageData,
    TopicMessageSubmitTransaction, TransferData, TransferTransaction,
};
pub use frozen::FrozenTransaction;
pub use signature_map::SignatureMap;

use crate::{Client, Error, TransactionError};
use ledgerlink_network::Transport;
use ledgerlink_proto::transaction_body;
use ledgerlink_types::{AccountId, TransactionId};
use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

/// Default validity window of a transaction.
pub const DEFAULT_VALID_DURATION: Duration = Duration::from_secs(120);

/// Default bytes of content per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Default limit on the number of chunks.
pub const DEFAULT_MAX_CHUNKS: usize = 20;

/// Position of one chunk within a chunked submission.
#[derive(Debug, Clone, Copy)]
pub struct ChunkContext<'a> {
    /// Zero-based chunk index.
    pub index: usize,
    /// Number of chunks.
    pub total: usize,
    /// Transaction id of the first chunk.
    pub initial_transaction_id: TransactionId,
    /// This chunk's share of the content; empty for unchunked operations.
    pub content: &'a [u8],
}

/// Operation-specific part of a transaction.
pub trait TransactionData: Clone + fmt::Debug + Send + Sync + 'static {
    /// Operation name used in errors.
    const NAME: &'static str;

    /// gRPC method the transaction is submitted to.
    fn method_path(&self) -> &'static str;

    /// Content split across chunks, if the operation is chunked.
    fn chunk_content(&self) -> Option<&[u8]> {
        None
    }

    /// The body payload for one chunk.
    fn to_body_data(&self, chunk: &ChunkContext<'_>) -> transaction_body::Data;

    /// Rebuild the operation from the payloads of its chunks, in order.
    fn from_chunks(chunks: Vec<transaction_body::Data>) -> Result<Self, TransactionError>;
}

/// A transaction under construction.
#[derive(Debug, Clone)]
pub struct Transaction<D> {
    data: D,
    node_account_ids: Option<Vec<AccountId>>,
    transaction_id: Option<TransactionId>,
    max_transaction_fee: Option<u64>,
    valid_duration: Duration,
    memo: String,
    chunk_size: Option<usize>,
    max_chunks: Option<usize>,
}

impl<D: TransactionData + Default> Default for Transaction<D> {
    fn default() -> Self {
        Self::from_data(D::default())
    }
}

impl<D: TransactionData + Default> Transaction<D> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<D: TransactionData> Transaction<D> {
    /// Wrap operation data with default transaction settings.
    pub fn from_data(data: D) -> Self {
        Self {
            data,
            node_account_ids: None,
            transaction_id: None,
            max_transaction_fee: None,
            valid_duration: DEFAULT_VALID_DURATION,
            memo: String::new(),
            chunk_size: None,
            max_chunks: None,
        }
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub(crate) fn data_mut(&mut self) -> &mut D {
        &mut self.data
    }

    /// Nodes the transaction may be submitted to, in preference order.
    pub fn node_account_ids(mut self, ids: impl IntoIterator<Item = AccountId>) -> Self {
        self.node_account_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn transaction_id(mut self, id: TransactionId) -> Self {
        self.transaction_id = Some(id);
        self
    }

    /// Highest fee, in tinybars, the payer is willing to pay.
    pub fn max_transaction_fee(mut self, fee: u64) -> Self {
        self.max_transaction_fee = Some(fee);
        self
    }

    /// How long after its valid start the transaction may reach consensus.
    pub fn valid_duration(mut self, duration: Duration) -> Self {
        self.valid_duration = duration;
        self
    }

    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    /// Bytes of content per chunk, for chunked operations.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = Some(size);
        self
    }

    /// Most chunks the content may be split into.
    pub fn max_chunks(mut self, max: usize) -> Self {
        self.max_chunks = Some(max);
        self
    }

    /// Freeze with explicit node ids and transaction id.
    pub fn freeze(self) -> Result<FrozenTransaction<D>, TransactionError> {
        let chunk_size = self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        let max_chunks = self.max_chunks.unwrap_or(DEFAULT_MAX_CHUNKS);
        let fee = self.max_transaction_fee.unwrap_or_default();
        self.build(fee, chunk_size, max_chunks)
    }

    /// Freeze, filling unset fields from the client.
    ///
    /// Node ids default to a selection of healthy nodes from the client's
    /// network. A transaction id is generated from the operator account when
    /// the client allows it.
    pub fn freeze_with<T: Transport>(
        mut self,
        client: &Client<T>,
    ) -> Result<FrozenTransaction<D>, Error> {
        let settings = client.execution_settings();

        if self.node_account_ids.is_none() {
            let ids: Vec<_> = client
                .network()
                .nodes_for_attempt(settings.max_nodes_per_transaction)
                .iter()
                .filter_map(|node| node.account_id())
                .collect();
            if ids.is_empty() {
                return Err(Error::NoNodes);
            }
            self.node_account_ids = Some(ids);
        }

        if self.transaction_id.is_none() && settings.auto_generate_transaction_id {
            if let Some(payer) = client.operator_account_id() {
                self.transaction_id = Some(TransactionId::generate(payer));
            }
        }

        let chunk_size = self.chunk_size.unwrap_or(settings.chunk_size);
        let max_chunks = self.max_chunks.unwrap_or(settings.max_chunks);
        let fee = self
            .max_transaction_fee
            .unwrap_or(settings.default_max_transaction_fee);
        Ok(self.build(fee, chunk_size, max_chunks)?)
    }

    fn build(
        self,
        fee: u64,
        chunk_size: usize,
        max_chunks: usize,
    ) -> Result<FrozenTransaction<D>, TransactionError> {
        let node_account_ids = self
            .node_account_ids
            .filter(|ids| !ids.is_empty())
            .ok_or(TransactionError::NoNodeAccountIds)?;
        ensure_distinct_nodes(&node_account_ids)?;
        let transaction_id = self
            .transaction_id
            .ok_or(TransactionError::NoTransactionId)?;

        let content = self.data.chunk_content().unwrap_or_default();
        let ranges = if self.data.chunk_content().is_some() {
            chunk::plan(content.len(), chunk_size, max_chunks)?
        } else {
            vec![0..0]
        };

        let settings = frozen::BodySettings {
            max_transaction_fee: fee,
            valid_duration: self.valid_duration,
            memo: self.memo,
        };
        let total = ranges.len();
        let chunks = ranges
            .into_iter()
            .enumerate()
            .map(|(index, range)| {
                let ctx = ChunkContext {
                    index,
                    total,
                    initial_transaction_id: transaction_id,
                    content: &content[range],
                };
                frozen::FrozenChunk::new(
                    transaction_id.for_chunk(index),
                    self.data.to_body_data(&ctx),
                    &node_account_ids,
                    &settings,
                )
            })
            .collect();

        Ok(FrozenTransaction::from_parts(
            self.data,
            node_account_ids,
            transaction_id,
            settings,
            chunks,
            SignatureMap::new(),
        ))
    }
}

/// Every body is keyed by its node, so a node may appear only once.
pub(crate) fn ensure_distinct_nodes(nodes: &[AccountId]) -> Result<(), TransactionError> {
    let mut seen = HashSet::with_capacity(nodes.len());
    match nodes.iter().find(|node| !seen.insert(**node)) {
        Some(node) => Err(TransactionError::DuplicateNodeAccountId(*node)),
        None => Ok(()),
    }
}

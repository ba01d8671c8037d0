//! Concrete transaction operations.

mod file_append;
mod topic_message;
mod transfer;

pub use file_append::{FileAppendData, FileAppendTransaction};
pub use topic_message::{TopicMessageData, TopicMessageSubmitTransaction};
pub use transfer::{TransferData, TransferTransaction};

use super::{ChunkContext, TransactionData};
use crate::TransactionError;
use ledgerlink_proto::{transaction_body, ProtoError};

/// Any supported operation, for deserializing transactions of unknown kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnyTransactionData {
    Transfer(TransferData),
    TopicMessage(TopicMessageData),
    FileAppend(FileAppendData),
}

impl TransactionData for AnyTransactionData {
    const NAME: &'static str = "transaction";

    fn method_path(&self) -> &'static str {
        match self {
            Self::Transfer(data) => data.method_path(),
            Self::TopicMessage(data) => data.method_path(),
            Self::FileAppend(data) => data.method_path(),
        }
    }

    fn chunk_content(&self) -> Option<&[u8]> {
        match self {
            Self::Transfer(data) => data.chunk_content(),
            Self::TopicMessage(data) => data.chunk_content(),
            Self::FileAppend(data) => data.chunk_content(),
        }
    }

    fn to_body_data(&self, chunk: &ChunkContext<'_>) -> transaction_body::Data {
        match self {
            Self::Transfer(data) => data.to_body_data(chunk),
            Self::TopicMessage(data) => data.to_body_data(chunk),
            Self::FileAppend(data) => data.to_body_data(chunk),
        }
    }

    fn from_chunks(chunks: Vec<transaction_body::Data>) -> Result<Self, TransactionError> {
        match chunks.first() {
            Some(transaction_body::Data::CryptoTransfer(_)) => {
                TransferData::from_chunks(chunks).map(Self::Transfer)
            }
            Some(transaction_body::Data::ConsensusSubmitMessage(_)) => {
                TopicMessageData::from_chunks(chunks).map(Self::TopicMessage)
            }
            Some(transaction_body::Data::FileAppend(_)) => {
                FileAppendData::from_chunks(chunks).map(Self::FileAppend)
            }
            None => Err(TransactionError::Empty),
        }
    }
}

/// Unwrap every chunk payload with `extract`, failing if any is another operation.
fn expect_single_kind<T>(
    chunks: Vec<transaction_body::Data>,
    expected: &'static str,
    extract: impl Fn(transaction_body::Data) -> Option<T>,
) -> Result<Vec<T>, TransactionError> {
    if chunks.is_empty() {
        return Err(TransactionError::Empty);
    }
    chunks
        .into_iter()
        .map(|data| extract(data).ok_or(TransactionError::UnexpectedBody { expected }))
        .collect()
}

/// Check a chunk's one-based `number` and `total` against its position.
fn ordered_chunk(number: i32, total: i32, index: usize, count: usize) -> Result<(), ProtoError> {
    if total as usize != count {
        return Err(ProtoError::InvalidValue {
            field: "chunk_info.total",
            reason: format!("{total} does not match {count} chunks"),
        });
    }
    if number as usize != index + 1 {
        return Err(ProtoError::InvalidValue {
            field: "chunk_info.number",
            reason: format!("chunk {number} found at position {}", index + 1),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::FrozenTransaction;
    use ledgerlink_types::{AccountId, FileId, Timestamp, TopicId, TransactionId};

    fn tx_id() -> TransactionId {
        TransactionId::with_valid_start(AccountId::from_num(2), Timestamp::new(1_700_000_000, 0))
    }

    #[test]
    fn test_topic_message_chunks_reassemble() {
        let message: Vec<u8> = (0..2500u32).map(|i| (i % 251) as u8).collect();
        let frozen = TopicMessageSubmitTransaction::new()
            .topic_id(TopicId::from_num(1001))
            .message(message.clone())
            .node_account_ids([AccountId::from_num(3)])
            .transaction_id(tx_id())
            .freeze()
            .unwrap();
        assert_eq!(frozen.chunk_count(), 3);

        let ids = frozen.chunk_transaction_ids();
        assert_eq!(ids[0], tx_id());
        assert_eq!(ids[2], tx_id().for_chunk(2));

        let decoded =
            FrozenTransaction::<TopicMessageData>::from_bytes(&frozen.to_bytes()).unwrap();
        assert_eq!(decoded.data().message(), message.as_slice());
        assert_eq!(decoded.data().topic_id(), Some(TopicId::from_num(1001)));
    }

    #[test]
    fn test_any_data_dispatches_on_body() {
        let frozen = FileAppendTransaction::new()
            .file_id(FileId::from_num(150))
            .contents(vec![7u8; 10])
            .chunk_size(4)
            .node_account_ids([AccountId::from_num(3), AccountId::from_num(4)])
            .transaction_id(tx_id())
            .freeze()
            .unwrap();
        assert_eq!(frozen.chunk_count(), 3);

        let any = FrozenTransaction::<AnyTransactionData>::from_bytes(&frozen.to_bytes()).unwrap();
        match any.data() {
            AnyTransactionData::FileAppend(data) => {
                assert_eq!(data.contents(), &[7u8; 10]);
                assert_eq!(data.file_id(), Some(FileId::from_num(150)));
            }
            other => panic!("unexpected data {other:?}"),
        }
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let frozen = TransferTransaction::new()
            .hbar_transfer(AccountId::from_num(2), -10)
            .hbar_transfer(AccountId::from_num(3), 10)
            .node_account_ids([AccountId::from_num(3)])
            .transaction_id(tx_id())
            .freeze()
            .unwrap();
        assert_eq!(frozen.data().net_amount(), 0);

        let err = FrozenTransaction::<FileAppendData>::from_bytes(&frozen.to_bytes()).unwrap_err();
        assert_eq!(
            err,
            TransactionError::UnexpectedBody {
                expected: "file append"
            }
        );
    }

    #[test]
    fn test_chunk_numbers_checked() {
        assert!(ordered_chunk(1, 2, 0, 2).is_ok());
        assert!(ordered_chunk(2, 2, 0, 2).is_err());
        assert!(ordered_chunk(1, 3, 0, 2).is_err());
    }
}

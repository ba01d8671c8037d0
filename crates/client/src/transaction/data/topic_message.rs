//! Consensus topic messages, chunked.

use super::super::{ChunkContext, Transaction, TransactionData};
use super::{expect_single_kind, ordered_chunk};
use crate::TransactionError;
use ledgerlink_proto::{self as proto, services, transaction_body, ProtoError};
use ledgerlink_types::TopicId;

/// A message submitted to a consensus topic.
///
/// Messages longer than the chunk size are split; every chunk carries its
/// position and the first chunk's transaction id so the topic can reassemble
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicMessageData {
    topic_id: Option<TopicId>,
    message: Vec<u8>,
}

/// Builder for a topic message submission.
pub type TopicMessageSubmitTransaction = Transaction<TopicMessageData>;

impl TopicMessageData {
    pub fn topic_id(&self) -> Option<TopicId> {
        self.topic_id
    }

    pub fn message(&self) -> &[u8] {
        &self.message
    }
}

impl Transaction<TopicMessageData> {
    pub fn topic_id(mut self, topic_id: TopicId) -> Self {
        self.data_mut().topic_id = Some(topic_id);
        self
    }

    pub fn message(mut self, message: impl Into<Vec<u8>>) -> Self {
        self.data_mut().message = message.into();
        self
    }
}

impl TransactionData for TopicMessageData {
    const NAME: &'static str = "topic message submit";

    fn method_path(&self) -> &'static str {
        services::SUBMIT_MESSAGE
    }

    fn chunk_content(&self) -> Option<&[u8]> {
        Some(&self.message)
    }

    fn to_body_data(&self, chunk: &ChunkContext<'_>) -> transaction_body::Data {
        transaction_body::Data::ConsensusSubmitMessage(proto::ConsensusSubmitMessageTransactionBody {
            topic_id: self.topic_id.map(Into::into),
            message: chunk.content.to_vec(),
            chunk_info: Some(proto::ConsensusMessageChunkInfo {
                initial_transaction_id: Some(chunk.initial_transaction_id.into()),
                total: chunk.total as i32,
                number: chunk.index as i32 + 1,
            }),
        })
    }

    fn from_chunks(chunks: Vec<transaction_body::Data>) -> Result<Self, TransactionError> {
        let bodies = expect_single_kind(chunks, Self::NAME, |data| match data {
            transaction_body::Data::ConsensusSubmitMessage(body) => Some(body),
            _ => None,
        })?;
        let total = bodies.len();

        let topic_id = bodies[0].topic_id.map(TopicId::try_from).transpose()?;
        let mut message = Vec::new();
        for (index, body) in bodies.into_iter().enumerate() {
            if let Some(info) = body.chunk_info {
                ordered_chunk(info.number, info.total, index, total)?;
            }
            if body.topic_id.map(TopicId::try_from).transpose()? != topic_id {
                return Err(ProtoError::InvalidValue {
                    field: "topic_id",
                    reason: "chunks target different topics".to_string(),
                }
                .into());
            }
            message.extend_from_slice(&body.message);
        }
        Ok(Self { topic_id, message })
    }
}

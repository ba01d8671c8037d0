//! File appends, chunked.

use super::super::{ChunkContext, Transaction, TransactionData};
use super::expect_single_kind;
use crate::TransactionError;
use ledgerlink_proto::{self as proto, services, transaction_body, ProtoError};
use ledgerlink_types::FileId;

/// Contents appended to a file. Large contents are appended chunk by chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileAppendData {
    file_id: Option<FileId>,
    contents: Vec<u8>,
}

/// Builder for a file append.
pub type FileAppendTransaction = Transaction<FileAppendData>;

impl FileAppendData {
    pub fn file_id(&self) -> Option<FileId> {
        self.file_id
    }

    pub fn contents(&self) -> &[u8] {
        &self.contents
    }
}

impl Transaction<FileAppendData> {
    pub fn file_id(mut self, file_id: FileId) -> Self {
        self.data_mut().file_id = Some(file_id);
        self
    }

    pub fn contents(mut self, contents: impl Into<Vec<u8>>) -> Self {
        self.data_mut().contents = contents.into();
        self
    }
}

impl TransactionData for FileAppendData {
    const NAME: &'static str = "file append";

    fn method_path(&self) -> &'static str {
        services::APPEND_CONTENT
    }

    fn chunk_content(&self) -> Option<&[u8]> {
        Some(&self.contents)
    }

    fn to_body_data(&self, chunk: &ChunkContext<'_>) -> transaction_body::Data {
        transaction_body::Data::FileAppend(proto::FileAppendTransactionBody {
            file_id: self.file_id.map(Into::into),
            contents: chunk.content.to_vec(),
        })
    }

    fn from_chunks(chunks: Vec<transaction_body::Data>) -> Result<Self, TransactionError> {
        let bodies = expect_single_kind(chunks, Self::NAME, |data| match data {
            transaction_body::Data::FileAppend(body) => Some(body),
            _ => None,
        })?;

        let file_id = bodies[0].file_id.map(FileId::try_from).transpose()?;
        let mut contents = Vec::new();
        for body in bodies {
            if body.file_id.map(FileId::try_from).transpose()? != file_id {
                return Err(ProtoError::InvalidValue {
                    field: "file_id",
                    reason: "chunks target different files".to_string(),
                }
                .into());
            }
            contents.extend_from_slice(&body.contents);
        }
        Ok(Self { file_id, contents })
    }
}

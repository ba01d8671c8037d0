//! Submitting frozen transactions.

use super::{FrozenTransaction, TransactionData};
use crate::execute::{self, Execute, Outcome};
use crate::{Client, Error, TransactionResponse};
use bytes::Bytes;
use ledgerlink_network::Transport;
use ledgerlink_proto::{self as proto, Message};
use ledgerlink_types::{AccountId, Signer, Status, TransactionHash, TransactionId};
use tracing::{debug, warn};

impl<D: TransactionData> FrozenTransaction<D> {
    /// Sign with the client's operator key, unless it already signed.
    pub fn sign_with_operator<T: Transport>(&mut self, client: &Client<T>) -> Result<&mut Self, Error> {
        let operator = client.operator().ok_or(Error::NoOperator)?;
        if !self.is_signed_by(&operator.signer.public_key()) {
            self.sign(&operator.signer);
        }
        Ok(self)
    }

    /// Submit every chunk and return the response for the first one.
    ///
    /// Signs with the client's operator first if it has not signed yet.
    pub async fn execute<T: Transport>(&mut self, client: &Client<T>) -> Result<TransactionResponse, Error> {
        let mut responses = self.execute_all(client).await?;
        if responses.is_empty() {
            return Err(Error::NoNodes);
        }
        Ok(responses.swap_remove(0))
    }

    /// Submit every chunk in order, returning one response per chunk.
    ///
    /// Between chunks the receipt of the previous chunk is awaited, so a later
    /// chunk never reaches consensus before an earlier one. Once any chunk has
    /// been accepted, a later failure is reported as [`Error::ChunkFailed`]
    /// carrying the responses gathered so far.
    pub async fn execute_all<T: Transport>(
        &mut self,
        client: &Client<T>,
    ) -> Result<Vec<TransactionResponse>, Error> {
        if client.operator().is_some() {
            self.sign_with_operator(client)?;
        }

        let total = self.chunks.len();
        let mut responses: Vec<TransactionResponse> = Vec::with_capacity(total);
        for index in 0..total {
            let result = match responses.last() {
                Some(previous) => match previous.get_receipt(client).await {
                    Ok(_) => self.submit_chunk(client, index).await,
                    Err(e) => Err(e),
                },
                None => self.submit_chunk(client, index).await,
            };
            match result {
                Ok(response) => responses.push(response),
                Err(e) if responses.is_empty() => return Err(e),
                Err(e) => {
                    warn!(
                        transaction_id = %self.transaction_id(),
                        completed = responses.len(),
                        total,
                        error = %e,
                        "Chunked submission stopped"
                    );
                    return Err(Error::ChunkFailed {
                        completed: responses,
                        total,
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(responses)
    }

    async fn submit_chunk<T: Transport>(
        &self,
        client: &Client<T>,
        index: usize,
    ) -> Result<TransactionResponse, Error> {
        let submission = ChunkSubmission { tx: self, index };
        let response = execute::execute(client, &submission).await?;
        debug!(
            transaction_id = %response.transaction_id,
            node = %response.node_id,
            chunk = index + 1,
            total = self.chunks.len(),
            "Chunk accepted"
        );
        Ok(response)
    }
}

/// One chunk of a frozen transaction, as seen by the executor.
struct ChunkSubmission<'a, D> {
    tx: &'a FrozenTransaction<D>,
    index: usize,
}

impl<D: TransactionData> ChunkSubmission<'_, D> {
    fn chunk_transaction_id(&self) -> TransactionId {
        self.tx.chunks[self.index].transaction_id
    }

    fn node_index(&self, node: AccountId) -> Result<usize, Error> {
        self.tx.node_index(node).ok_or(Error::NoNodes)
    }
}

impl<D: TransactionData> Execute for ChunkSubmission<'_, D> {
    type Response = TransactionResponse;

    fn describe(&self) -> String {
        format!(
            "{} {} (chunk {}/{})",
            D::NAME,
            self.chunk_transaction_id(),
            self.index + 1,
            self.tx.chunks.len()
        )
    }

    fn node_account_ids(&self) -> Option<&[AccountId]> {
        Some(&self.tx.node_account_ids)
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        Some(self.chunk_transaction_id())
    }

    fn path(&self) -> &'static str {
        self.tx.data.method_path()
    }

    fn make_request(&self, node: AccountId) -> Result<Bytes, Error> {
        let node_index = self.node_index(node)?;
        self.tx
            .envelope_bytes(self.index, node_index)
            .map(Bytes::from)
            .ok_or(Error::NoNodes)
    }

    fn handle_response(&self, node: AccountId, response: Bytes) -> Outcome<TransactionResponse> {
        let response = match proto::TransactionResponse::decode(response) {
            Ok(response) => response,
            Err(e) => return Outcome::Fail(e.into()),
        };
        let transaction_id = self.chunk_transaction_id();
        let status = Status::from_code(response.node_transaction_precheck_code);
        let error = || Error::PrecheckStatus {
            node,
            status,
            transaction_id: Some(transaction_id),
        };

        match status {
            Status::Ok => {}
            s if s.is_transient() => return Outcome::Transient(error()),
            _ => return Outcome::Fail(error()),
        }

        let transaction_hash = match self
            .node_index(node)
            .ok()
            .and_then(|i| self.tx.signed_transaction_bytes(self.index, i))
        {
            Some(signed) => TransactionHash::from_bytes(&signed),
            None => return Outcome::Fail(Error::NoNodes),
        };
        Outcome::Done(TransactionResponse {
            node_id: node,
            transaction_id,
            transaction_hash,
            transaction_node_account_ids: self.tx.node_account_ids.clone(),
        })
    }
}

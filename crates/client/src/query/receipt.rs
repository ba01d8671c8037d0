//! Transaction receipt query.

use super::{accepted, is_receipt_pending};
use crate::execute::{self, Execute, Outcome};
use crate::{Client, Error};
use bytes::Bytes;
use ledgerlink_network::Transport;
use ledgerlink_proto::{self as proto, query, response, services, Message, ProtoError};
use ledgerlink_types::{AccountId, FileId, Status, TopicId, TransactionId};

/// Outcome of a transaction once it has reached consensus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionReceipt {
    pub status: Status,
    /// Account created by the transaction, if any.
    pub account_id: Option<AccountId>,
    /// File created by the transaction, if any.
    pub file_id: Option<FileId>,
    /// Topic created by the transaction, if any.
    pub topic_id: Option<TopicId>,
    /// Sequence number of a submitted topic message.
    pub topic_sequence_number: u64,
    /// Running hash of a topic after a submitted message.
    pub topic_running_hash: Vec<u8>,
}

impl TryFrom<proto::TransactionReceipt> for TransactionReceipt {
    type Error = ProtoError;

    fn try_from(receipt: proto::TransactionReceipt) -> Result<Self, Self::Error> {
        Ok(Self {
            status: Status::from_code(receipt.status),
            account_id: receipt.account_id.map(AccountId::try_from).transpose()?,
            file_id: receipt.file_id.map(FileId::try_from).transpose()?,
            topic_id: receipt.topic_id.map(TopicId::try_from).transpose()?,
            topic_sequence_number: receipt.topic_sequence_number,
            topic_running_hash: receipt.topic_running_hash,
        })
    }
}

impl TransactionReceipt {
    /// `Ok(self)` if the transaction succeeded, otherwise a
    /// [`Error::ReceiptStatus`].
    pub fn validate(self, transaction_id: TransactionId) -> Result<Self, Error> {
        if self.status == Status::Success {
            Ok(self)
        } else {
            Err(Error::ReceiptStatus {
                status: self.status,
                transaction_id,
            })
        }
    }
}

/// Asks a node for the receipt of a transaction.
///
/// Receipts are free; no payment is attached. While the transaction has not
/// reached consensus the query is retried without penalizing the node.
#[derive(Debug, Clone)]
pub struct TransactionReceiptQuery {
    transaction_id: TransactionId,
    node_account_ids: Option<Vec<AccountId>>,
    include_duplicates: bool,
    include_child_receipts: bool,
}

impl TransactionReceiptQuery {
    pub fn new(transaction_id: TransactionId) -> Self {
        Self {
            transaction_id,
            node_account_ids: None,
            include_duplicates: false,
            include_child_receipts: false,
        }
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// Nodes to ask, in order.
    pub fn node_account_ids(mut self, ids: impl IntoIterator<Item = AccountId>) -> Self {
        self.node_account_ids = Some(ids.into_iter().collect());
        self
    }

    pub fn nodes(&self) -> Option<&[AccountId]> {
        self.node_account_ids.as_deref()
    }

    pub fn include_duplicates(mut self, include: bool) -> Self {
        self.include_duplicates = include;
        self
    }

    pub fn include_child_receipts(mut self, include: bool) -> Self {
        self.include_child_receipts = include;
        self
    }

    /// Fetch the receipt, whatever its final status.
    pub async fn execute<T: Transport>(&self, client: &Client<T>) -> Result<TransactionReceipt, Error> {
        execute::execute(client, self).await
    }
}

impl Execute for TransactionReceiptQuery {
    type Response = TransactionReceipt;

    fn describe(&self) -> String {
        format!("receipt of {}", self.transaction_id)
    }

    fn node_account_ids(&self) -> Option<&[AccountId]> {
        self.nodes()
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        Some(self.transaction_id)
    }

    fn path(&self) -> &'static str {
        services::GET_TRANSACTION_RECEIPTS
    }

    fn make_request(&self, _node: AccountId) -> Result<Bytes, Error> {
        let query = proto::Query {
            query: Some(query::Query::TransactionGetReceipt(
                proto::TransactionGetReceiptQuery {
                    header: Some(proto::QueryHeader {
                        payment: None,
                        response_type: proto::ResponseType::AnswerOnly as i32,
                    }),
                    transaction_id: Some(self.transaction_id.into()),
                    include_duplicates: self.include_duplicates,
                    include_child_receipts: self.include_child_receipts,
                },
            )),
        };
        Ok(query.encode_to_vec().into())
    }

    fn handle_response(&self, node: AccountId, response: Bytes) -> Outcome<TransactionReceipt> {
        let response = match accepted(node, self.transaction_id, response) {
            Ok(response::Response::TransactionGetReceipt(r)) => r,
            Ok(_) => {
                return Outcome::Fail(ProtoError::MissingField("transaction_get_receipt").into())
            }
            Err(outcome) => return outcome,
        };
        let receipt = match response.receipt.map(TransactionReceipt::try_from) {
            Some(Ok(receipt)) => receipt,
            Some(Err(e)) => return Outcome::Fail(e.into()),
            None => return Outcome::Fail(ProtoError::MissingField("receipt").into()),
        };

        if is_receipt_pending(receipt.status) {
            return Outcome::Pending(Error::ReceiptStatus {
                status: receipt.status,
                transaction_id: self.transaction_id,
            });
        }
        Outcome::Done(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerlink_types::Timestamp;

    fn query() -> TransactionReceiptQuery {
        TransactionReceiptQuery::new(TransactionId::with_valid_start(
            AccountId::from_num(2),
            Timestamp::new(1_700_000_000, 0),
        ))
    }

    fn response(precheck: Status, status: Status) -> Bytes {
        proto::Response {
            response: Some(response::Response::TransactionGetReceipt(
                proto::TransactionGetReceiptResponse {
                    header: Some(proto::ResponseHeader {
                        node_transaction_precheck_code: precheck.code(),
                        response_type: 0,
                        cost: 0,
                    }),
                    receipt: Some(proto::TransactionReceipt {
                        status: status.code(),
                        ..Default::default()
                    }),
                },
            )),
        }
        .encode_to_vec()
        .into()
    }

    #[test]
    fn test_classifies_responses() {
        let q = query();
        let node = AccountId::from_num(3);

        assert!(matches!(
            q.handle_response(node, response(Status::Ok, Status::Success)),
            Outcome::Done(TransactionReceipt { status: Status::Success, .. })
        ));
        assert!(matches!(
            q.handle_response(node, response(Status::Busy, Status::Unknown)),
            Outcome::Transient(_)
        ));
        assert!(matches!(
            q.handle_response(node, response(Status::ReceiptNotFound, Status::Unknown)),
            Outcome::Pending(_)
        ));
        assert!(matches!(
            q.handle_response(node, response(Status::Ok, Status::Unknown)),
            Outcome::Pending(Error::ReceiptStatus { status: Status::Unknown, .. })
        ));
        assert!(matches!(
            q.handle_response(node, response(Status::InvalidTransactionId, Status::Unknown)),
            Outcome::Fail(Error::PrecheckStatus { status: Status::InvalidTransactionId, .. })
        ));
        // A final failure is still a receipt; validation happens in the caller.
        assert!(matches!(
            q.handle_response(node, response(Status::Ok, Status::InsufficientPayerBalance)),
            Outcome::Done(_)
        ));
        assert!(matches!(
            q.handle_response(node, Bytes::from_static(&[0xff, 0xff])),
            Outcome::Fail(Error::Decode(_))
        ));
    }

    #[test]
    fn test_validate() {
        let id = query().transaction_id();
        let receipt = TransactionReceipt {
            status: Status::FailBalance,
            account_id: None,
            file_id: None,
            topic_id: None,
            topic_sequence_number: 0,
            topic_running_hash: Vec::new(),
        };
        assert!(matches!(
            receipt.validate(id),
            Err(Error::ReceiptStatus { status: Status::FailBalance, .. })
        ));
    }
}

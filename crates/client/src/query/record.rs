//! Transaction record query.

use super::receipt::TransactionReceipt;
use super::{accepted, is_receipt_pending};
use crate::client::Operator;
use crate::execute::{self, Execute, Outcome};
use crate::transaction::TransferTransaction;
use crate::{Client, Error};
use bytes::Bytes;
use ledgerlink_network::Transport;
use ledgerlink_proto::{self as proto, query, response, services, Message, ProtoError};
use ledgerlink_types::{AccountId, Timestamp, TransactionId};
use tracing::trace;

/// Full record of a transaction that reached consensus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRecord {
    pub receipt: TransactionReceipt,
    /// SHA-384 hash of the signed transaction.
    pub transaction_hash: Vec<u8>,
    pub consensus_timestamp: Option<Timestamp>,
    pub transaction_id: Option<TransactionId>,
    pub memo: String,
    /// Fee actually charged, in tinybars.
    pub transaction_fee: u64,
    /// Net balance changes, in tinybars.
    pub transfers: Vec<(AccountId, i64)>,
}

impl TryFrom<proto::TransactionRecord> for TransactionRecord {
    type Error = ProtoError;

    fn try_from(record: proto::TransactionRecord) -> Result<Self, Self::Error> {
        let receipt: TransactionReceipt = record
            .receipt
            .ok_or(ProtoError::MissingField("receipt"))?
            .try_into()?;
        let transfers = record
            .transfer_list
            .unwrap_or_default()
            .account_amounts
            .into_iter()
            .map(|aa| {
                let account = aa
                    .account_id
                    .ok_or(ProtoError::MissingField("account_amounts.account_id"))?;
                Ok((AccountId::try_from(account)?, aa.amount))
            })
            .collect::<Result<_, ProtoError>>()?;
        Ok(Self {
            receipt,
            transaction_hash: record.transaction_hash,
            consensus_timestamp: record
                .consensus_timestamp
                .map(Timestamp::try_from)
                .transpose()?,
            transaction_id: record
                .transaction_id
                .map(TransactionId::try_from)
                .transpose()?,
            memo: record.memo,
            transaction_fee: record.transaction_fee,
            transfers,
        })
    }
}

/// Asks a node for the record of a transaction.
///
/// Records are paid queries: each attempt attaches a transfer from the
/// operator to the node being asked, signed by the operator.
#[derive(Debug, Clone)]
pub struct TransactionRecordQuery {
    transaction_id: TransactionId,
    node_account_ids: Option<Vec<AccountId>>,
    include_duplicates: bool,
    payment: Option<u64>,
}

impl TransactionRecordQuery {
    pub fn new(transaction_id: TransactionId) -> Self {
        Self {
            transaction_id,
            node_account_ids: None,
            include_duplicates: false,
            payment: None,
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

    /// Tinybars paid to the node per attempt. Defaults to the client's query payment.
    pub fn payment(mut self, tinybars: u64) -> Self {
        self.payment = Some(tinybars);
        self
    }

    /// Fetch the record. Requires an operator to pay for the query.
    pub async fn execute<T: Transport>(&self, client: &Client<T>) -> Result<TransactionRecord, Error> {
        let payer = client.operator().ok_or(Error::NoOperator)?;
        let settings = client.execution_settings();
        let request = PaidRecordRequest {
            query: self,
            payer,
            payment: self.payment.unwrap_or(settings.default_query_payment),
            max_fee: settings.default_max_transaction_fee,
        };
        execute::execute(client, &request).await
    }
}

/// A record query bound to the operator paying for it.
struct PaidRecordRequest<'a> {
    query: &'a TransactionRecordQuery,
    payer: Operator,
    payment: u64,
    max_fee: u64,
}

impl PaidRecordRequest<'_> {
    /// Operator-signed transfer of the query payment to `node`.
    fn payment_transaction(&self, node: AccountId) -> Result<proto::Transaction, Error> {
        let amount = i64::try_from(self.payment).unwrap_or(i64::MAX);
        let mut frozen = TransferTransaction::new()
            .hbar_transfer(self.payer.account_id, -amount)
            .hbar_transfer(node, amount)
            .node_account_ids([node])
            .transaction_id(TransactionId::generate(self.payer.account_id))
            .max_transaction_fee(self.max_fee)
            .freeze()?;
        frozen.sign(&self.payer.signer);
        let bytes = frozen.envelope_bytes(0, 0).ok_or(Error::NoNodes)?;
        Ok(proto::Transaction::decode(bytes.as_slice())?)
    }
}

impl Execute for PaidRecordRequest<'_> {
    type Response = TransactionRecord;

    fn describe(&self) -> String {
        format!("record of {}", self.query.transaction_id)
    }

    fn node_account_ids(&self) -> Option<&[AccountId]> {
        self.query.nodes()
    }

    fn transaction_id(&self) -> Option<TransactionId> {
        Some(self.query.transaction_id)
    }

    fn path(&self) -> &'static str {
        services::GET_TX_RECORD_BY_TX_ID
    }

    fn make_request(&self, node: AccountId) -> Result<Bytes, Error> {
        let payment = self.payment_transaction(node)?;
        trace!(%node, payment = self.payment, "Attached query payment");
        let query = proto::Query {
            query: Some(query::Query::TransactionGetRecord(
                proto::TransactionGetRecordQuery {
                    header: Some(proto::QueryHeader {
                        payment: Some(payment),
                        response_type: proto::ResponseType::AnswerOnly as i32,
                    }),
                    transaction_id: Some(self.query.transaction_id.into()),
                    include_duplicates: self.query.include_duplicates,
                    include_child_records: false,
                },
            )),
        };
        Ok(query.encode_to_vec().into())
    }

    fn handle_response(&self, node: AccountId, response: Bytes) -> Outcome<TransactionRecord> {
        let transaction_id = self.query.transaction_id;
        let response = match accepted(node, transaction_id, response) {
            Ok(response::Response::TransactionGetRecord(r)) => r,
            Ok(_) => {
                return Outcome::Fail(ProtoError::MissingField("transaction_get_record").into())
            }
            Err(outcome) => return outcome,
        };
        let record = match response.transaction_record.map(TransactionRecord::try_from) {
            Some(Ok(record)) => record,
            Some(Err(e)) => return Outcome::Fail(e.into()),
            None => return Outcome::Fail(ProtoError::MissingField("transaction_record").into()),
        };

        if is_receipt_pending(record.receipt.status) {
            return Outcome::Pending(Error::ReceiptStatus {
                status: record.receipt.status,
                transaction_id,
            });
        }
        Outcome::Done(record)
    }
}

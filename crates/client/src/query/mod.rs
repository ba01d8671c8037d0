//! Receipt and record queries.
//!
//! Both are executed through the same retry loop as transactions. Their answers
//! are classified in two steps: first the node's precheck status, then the
//! status inside the receipt, which stays non-final until consensus is reached.

mod receipt;
mod record;

pub use receipt::{TransactionReceipt, TransactionReceiptQuery};
pub use record::{TransactionRecord, TransactionRecordQuery};

use crate::execute::Outcome;
use crate::Error;
use bytes::Bytes;
use ledgerlink_proto::{self as proto, response, Message, ProtoError};
use ledgerlink_types::{AccountId, Status, TransactionId};

/// Decode a query response and classify its precheck status.
///
/// Returns the inner response when the node accepted the query.
fn accepted<R>(
    node: AccountId,
    transaction_id: TransactionId,
    bytes: Bytes,
) -> Result<response::Response, Outcome<R>> {
    let response = proto::Response::decode(bytes)
        .map_err(|e| Outcome::Fail(Error::from(e)))?;
    let header = response
        .header()
        .copied()
        .ok_or_else(|| Outcome::Fail(ProtoError::MissingField("header").into()))?;

    let status = Status::from_code(header.node_transaction_precheck_code);
    let error = || Error::PrecheckStatus {
        node,
        status,
        transaction_id: Some(transaction_id),
    };
    match status {
        Status::Ok => {}
        s if s.is_transient() => return Err(Outcome::Transient(error())),
        s if s.is_pending() => return Err(Outcome::Pending(error())),
        _ => return Err(Outcome::Fail(error())),
    }

    response
        .response
        .ok_or_else(|| Outcome::Fail(ProtoError::MissingField("response").into()))
}

/// Whether a receipt status means the transaction has not reached consensus yet.
fn is_receipt_pending(status: Status) -> bool {
    matches!(
        status,
        Status::Unknown
            | Status::Ok
            | Status::Busy
            | Status::ReceiptNotFound
            | Status::RecordNotFound
            | Status::PlatformNotActive
    )
}

//! Node maps and encoded node responses for tests.

use bytes::Bytes;
use ledgerlink_proto::{self as proto, Message};
use ledgerlink_types::{AccountId, NodeAddress, Status};
use std::collections::HashMap;

/// Address of the test node with account number `num`.
pub fn node_address(num: u64) -> NodeAddress {
    NodeAddress::new(format!("node{num}.test"), 50211).expect("host is non-empty")
}

/// Network map for consensus nodes `0.0.first ..= 0.0.(first + count - 1)`,
/// one address each.
pub fn node_map(first: u64, count: u64) -> HashMap<AccountId, Vec<NodeAddress>> {
    (first..first + count)
        .map(|num| (AccountId::from_num(num), vec![node_address(num)]))
        .collect()
}

/// Encoded `TransactionResponse` carrying `status` as its precheck code.
pub fn precheck_response(status: Status) -> Bytes {
    proto::TransactionResponse {
        node_transaction_precheck_code: status.code(),
        cost: 0,
    }
    .encode_to_vec()
    .into()
}

/// Encoded receipt query response.
pub fn receipt_response(precheck: Status, receipt_status: Status) -> Bytes {
    let receipt = proto::TransactionReceipt {
        status: receipt_status.code(),
        ..Default::default()
    };
    proto::Response {
        response: Some(proto::response::Response::TransactionGetReceipt(
            proto::TransactionGetReceiptResponse {
                header: Some(header(precheck)),
                receipt: Some(receipt),
            },
        )),
    }
    .encode_to_vec()
    .into()
}

/// Encoded record query response.
pub fn record_response(precheck: Status, receipt_status: Status, memo: &str) -> Bytes {
    let record = proto::TransactionRecord {
        receipt: Some(proto::TransactionReceipt {
            status: receipt_status.code(),
            ..Default::default()
        }),
        memo: memo.to_string(),
        ..Default::default()
    };
    proto::Response {
        response: Some(proto::response::Response::TransactionGetRecord(
            proto::TransactionGetRecordResponse {
                header: Some(header(precheck)),
                transaction_record: Some(record),
            },
        )),
    }
    .encode_to_vec()
    .into()
}

fn header(precheck: Status) -> proto::ResponseHeader {
    proto::ResponseHeader {
        node_transaction_precheck_code: precheck.code(),
        response_type: proto::ResponseType::AnswerOnly as i32,
        cost: 0,
    }
}

/// Decode the signed body of a submitted transaction envelope.
pub fn decode_submitted_body(request: &[u8]) -> proto::TransactionBody {
    let tx = proto::Transaction::decode(request).expect("transaction envelope");
    let signed = proto::SignedTransaction::decode(tx.signed_transaction_bytes.as_slice())
        .expect("signed transaction");
    proto::TransactionBody::decode(signed.body_bytes.as_slice()).expect("transaction body")
}

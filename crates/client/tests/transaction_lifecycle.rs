//! Freezing, chunking, signing and (de)serializing transactions.

use ledgerlink_client::{
    AccountId, Client, ClientConfig, Error, FileAppendData, FileAppendTransaction, FileId,
    FrozenTransaction, TransactionError, TransactionId, TransferData, TransferTransaction,
};
use ledgerlink_proto::{self as proto, Message};
use ledgerlink_test_helpers::{fixtures, MockTransport, TestSigners};
use ledgerlink_types::{Signature, Timestamp};
use std::collections::BTreeSet;
use std::sync::Arc;

fn tx_id() -> TransactionId {
    TransactionId::with_valid_start(AccountId::from_num(2), Timestamp::new(1_700_000_000, 42))
}

fn nodes() -> [AccountId; 2] {
    [AccountId::from_num(3), AccountId::from_num(4)]
}

fn frozen_transfer() -> FrozenTransaction<TransferData> {
    TransferTransaction::new()
        .hbar_transfer(AccountId::from_num(2), -100)
        .hbar_transfer(AccountId::from_num(1001), 100)
        .memo("rent")
        .node_account_ids(nodes())
        .transaction_id(tx_id())
        .max_transaction_fee(100_000)
        .freeze()
        .unwrap()
}

fn frozen_append(len: usize, chunk_size: usize) -> FrozenTransaction<FileAppendData> {
    FileAppendTransaction::new()
        .file_id(FileId::from_num(150))
        .contents((0..len).map(|i| i as u8).collect::<Vec<_>>())
        .chunk_size(chunk_size)
        .node_account_ids(nodes())
        .transaction_id(tx_id())
        .freeze()
        .unwrap()
}

#[test]
fn test_freeze_requires_nodes_and_transaction_id() {
    let err = TransferTransaction::new()
        .transaction_id(tx_id())
        .freeze()
        .unwrap_err();
    assert_eq!(err, TransactionError::NoNodeAccountIds);

    let err = TransferTransaction::new()
        .node_account_ids(Vec::new())
        .transaction_id(tx_id())
        .freeze()
        .unwrap_err();
    assert_eq!(err, TransactionError::NoNodeAccountIds);

    let err = TransferTransaction::new()
        .node_account_ids(nodes())
        .freeze()
        .unwrap_err();
    assert_eq!(err, TransactionError::NoTransactionId);
}

#[test]
fn test_duplicate_node_account_ids_rejected() {
    let node = AccountId::from_num(3);
    let err = TransferTransaction::new()
        .node_account_ids([node, AccountId::from_num(4), node])
        .transaction_id(tx_id())
        .freeze()
        .unwrap_err();
    assert_eq!(err, TransactionError::DuplicateNodeAccountId(node));

    // The same variant listed twice on the wire.
    let mut frozen = frozen_transfer();
    frozen.sign(TestSigners::new(1, 4).signer(0));
    let mut list = proto::TransactionList::decode(frozen.to_bytes().as_slice()).unwrap();
    list.transaction_list[1] = list.transaction_list[0].clone();

    assert_eq!(
        FrozenTransaction::<TransferData>::from_bytes(&list.encode_to_vec()).unwrap_err(),
        TransactionError::DuplicateNodeAccountId(node)
    );
}

#[test]
fn test_sign_serialize_deserialize_two_nodes() {
    let signers = TestSigners::new(1, 11);
    let mut frozen = frozen_transfer();
    frozen.sign(signers.signer(0));

    let bytes = frozen.to_bytes();
    let decoded = FrozenTransaction::<TransferData>::from_bytes(&bytes).unwrap();

    assert_eq!(decoded.node_account_ids(), &nodes());
    assert_eq!(decoded.transaction_id(), tx_id());
    assert_eq!(decoded.memo(), "rent");
    assert_eq!(decoded.max_transaction_fee(), 100_000);
    assert_eq!(decoded.data(), frozen.data());
    assert_eq!(decoded.signatures(), frozen.signatures());

    let body_3 = decoded.body_bytes(0, nodes()[0]).unwrap();
    let body_4 = decoded.body_bytes(0, nodes()[1]).unwrap();
    let mut logical_3 = proto::TransactionBody::decode(body_3).unwrap();
    let mut logical_4 = proto::TransactionBody::decode(body_4).unwrap();
    assert_eq!(logical_3.node_account_id, Some(nodes()[0].into()));
    assert_eq!(logical_4.node_account_id, Some(nodes()[1].into()));
    logical_3.node_account_id = None;
    logical_4.node_account_id = None;
    assert_eq!(logical_3, logical_4);

    let key = signers.public_key(0);
    for (node, body) in [(nodes()[0], body_3), (nodes()[1], body_4)] {
        let signature = decoded.signatures().get(node, tx_id()).unwrap()[&key].clone();
        assert!(key.verify(body, &Signature::Ed25519(signature)));
    }
    assert!(decoded.invalid_signers().is_empty());
}

#[test]
fn test_signing_is_idempotent() {
    let signers = TestSigners::new(2, 3);
    let mut frozen = frozen_append(25, 10);
    frozen.sign(signers.signer(0));
    let once = frozen.signatures().clone();
    frozen.sign(signers.signer(0));
    assert_eq!(frozen.signatures(), &once);
    assert_eq!(once.len(), 3 * 2);

    frozen.sign(signers.signer(1));
    assert_eq!(frozen.signatures().len(), 3 * 2 * 2);
    assert!(frozen.is_signed_by(&signers.public_key(1)));
}

#[test]
fn test_tampered_body_rejected() {
    let mut frozen = frozen_transfer();
    frozen.sign(TestSigners::new(1, 1).signer(0));

    let mut list = proto::TransactionList::decode(frozen.to_bytes().as_slice()).unwrap();
    let envelope = &mut list.transaction_list[1];
    let mut signed =
        proto::SignedTransaction::decode(envelope.signed_transaction_bytes.as_slice()).unwrap();
    let mut body = proto::TransactionBody::decode(signed.body_bytes.as_slice()).unwrap();
    body.memo = "something else".to_string();
    signed.body_bytes = body.encode_to_vec();
    envelope.signed_transaction_bytes = signed.encode_to_vec();

    let err = FrozenTransaction::<TransferData>::from_bytes(&list.encode_to_vec()).unwrap_err();
    assert_eq!(
        err,
        TransactionError::InconsistentBodies {
            transaction_id: tx_id(),
            node: nodes()[1],
        }
    );
}

#[test]
fn test_missing_node_in_later_chunk_rejected() {
    let frozen = frozen_append(25, 10);
    let mut list = proto::TransactionList::decode(frozen.to_bytes().as_slice()).unwrap();
    // Chunk-major order: drop node 4's envelope of the second chunk.
    list.transaction_list.remove(3);

    let err = FrozenTransaction::<FileAppendData>::from_bytes(&list.encode_to_vec()).unwrap_err();
    assert_eq!(
        err,
        TransactionError::InconsistentNodes {
            transaction_id: tx_id().for_chunk(1),
        }
    );
}

#[test]
fn test_missing_fields_and_empty_list_rejected() {
    assert_eq!(
        FrozenTransaction::<TransferData>::from_bytes(&[]).unwrap_err(),
        TransactionError::Empty
    );

    let body = proto::TransactionBody {
        node_account_id: Some(nodes()[0].into()),
        ..Default::default()
    };
    let list = proto::TransactionList {
        transaction_list: vec![proto::Transaction {
            signed_transaction_bytes: proto::SignedTransaction {
                body_bytes: body.encode_to_vec(),
                sig_map: None,
            }
            .encode_to_vec(),
        }],
    };
    assert!(matches!(
        FrozenTransaction::<TransferData>::from_bytes(&list.encode_to_vec()),
        Err(TransactionError::Malformed(
            ledgerlink_proto::ProtoError::MissingField("transaction_id")
        ))
    ));
}

#[test]
fn test_chunk_count_and_reassembly() {
    for (len, chunk_size, expected) in [(0, 10, 1), (10, 10, 1), (11, 10, 2), (2048, 1024, 2)] {
        let frozen = frozen_append(len, chunk_size);
        assert_eq!(frozen.chunk_count(), expected, "len {len}, chunk {chunk_size}");

        let mut contents = Vec::new();
        for chunk in 0..frozen.chunk_count() {
            let body = proto::TransactionBody::decode(frozen.body_bytes(chunk, nodes()[0]).unwrap())
                .unwrap();
            match body.data {
                Some(proto::transaction_body::Data::FileAppend(append)) => {
                    contents.extend(append.contents)
                }
                other => panic!("unexpected body {other:?}"),
            }
        }
        assert_eq!(contents, (0..len).map(|i| i as u8).collect::<Vec<_>>());
    }
}

#[test]
fn test_chunk_transaction_ids_are_distinct() {
    let frozen = frozen_append(35, 10);
    let ids = frozen.chunk_transaction_ids();
    assert_eq!(ids.len(), 4);
    assert_eq!(ids[0], tx_id());
    assert_eq!(ids.iter().collect::<BTreeSet<_>>().len(), 4);
    assert!(ids.iter().all(|id| id.account_id == tx_id().account_id));
}

#[test]
fn test_remove_then_add_signature_round_trip() {
    let signers = TestSigners::new(2, 5);
    let mut frozen = frozen_append(25, 10);
    frozen.sign(signers.signer(0)).sign(signers.signer(1));
    let before = frozen.signatures().clone();

    let removed = frozen.remove_signature(&signers.public_key(0)).unwrap();
    assert_eq!(removed.len(), 3 * 2);
    assert!(removed.iter().all(Option::is_some));
    assert!(!frozen.is_signed_by(&signers.public_key(0)));
    assert!(frozen.is_signed_by(&signers.public_key(1)));

    frozen.add_signature(signers.public_key(0), removed).unwrap();
    assert_eq!(frozen.signatures(), &before);
    assert!(frozen.invalid_signers().is_empty());
}

#[test]
fn test_partially_signed_round_trip_keeps_positions() {
    let signers = TestSigners::new(1, 17);
    let key = signers.public_key(0);
    let mut signed = frozen_transfer();
    signed.sign(signers.signer(0));

    // Only node 3's variant keeps its signature.
    let mut list = proto::TransactionList::decode(signed.to_bytes().as_slice()).unwrap();
    let envelope = &mut list.transaction_list[1];
    let mut variant =
        proto::SignedTransaction::decode(envelope.signed_transaction_bytes.as_slice()).unwrap();
    variant.sig_map = None;
    envelope.signed_transaction_bytes = variant.encode_to_vec();

    let mut frozen = FrozenTransaction::<TransferData>::from_bytes(&list.encode_to_vec()).unwrap();
    let before = frozen.signatures().clone();
    assert_eq!(before.len(), 1);
    assert!(!frozen.is_signed_by(&key));

    let removed = frozen.remove_signature(&key).unwrap();
    assert_eq!(removed.len(), 2);
    assert!(removed[0].is_some());
    assert!(removed[1].is_none());
    assert!(frozen.signatures().is_empty());

    frozen.add_signature(key, removed).unwrap();
    assert_eq!(frozen.signatures(), &before);
    assert!(frozen
        .signatures()
        .is_signed_by(nodes()[0], tx_id(), &key));
    assert!(!frozen.signatures().is_signed_by(nodes()[1], tx_id(), &key));
    assert!(frozen.invalid_signers().is_empty());
}

#[test]
fn test_remove_unknown_signer_fails() {
    let signers = TestSigners::new(2, 9);
    let mut frozen = frozen_transfer();
    frozen.sign(signers.signer(0));

    assert_eq!(
        frozen.remove_signature(&signers.public_key(1)).unwrap_err(),
        TransactionError::NoSuchSigner(signers.public_key(1))
    );
    assert_eq!(
        frozen
            .add_signature(signers.public_key(1), vec![Some(vec![0; 64])])
            .unwrap_err(),
        TransactionError::SignatureCountMismatch {
            expected: 2,
            actual: 1
        }
    );
}

#[test]
fn test_remove_all_signatures() {
    let signers = TestSigners::new(3, 21);
    let mut frozen = frozen_transfer();
    for i in 0..signers.len() {
        frozen.sign(signers.signer(i));
    }

    let removed = frozen.remove_all_signatures();
    let expected: BTreeSet<_> = (0..3).map(|i| signers.public_key(i)).collect();
    assert_eq!(removed.keys().copied().collect::<BTreeSet<_>>(), expected);
    assert!(removed.values().all(|sigs| sigs.len() == 2));
    assert!(frozen.signatures().is_empty());
    assert!(frozen.remove_all_signatures().is_empty());
}

#[test]
fn test_bad_signature_detected() {
    let signers = TestSigners::new(1, 2);
    let mut frozen = frozen_transfer();
    frozen
        .add_signature(signers.public_key(0), vec![Some(vec![1; 64]), Some(vec![2; 64])])
        .unwrap();
    assert_eq!(frozen.invalid_signers(), vec![signers.public_key(0)]);
}

#[tokio::test]
async fn test_freeze_with_fills_from_client() {
    let transport = Arc::new(MockTransport::new());
    let client = Client::with_transport(transport, &ClientConfig::default()).unwrap();
    client.set_network(&fixtures::node_map(3, 5)).unwrap();

    let err = TransferTransaction::new().freeze_with(&client).unwrap_err();
    assert!(matches!(
        err,
        Error::Transaction(TransactionError::NoTransactionId)
    ));

    client.set_operator(AccountId::from_num(2), TestSigners::new(1, 4).signer(0).clone());
    let frozen = TransferTransaction::new().freeze_with(&client).unwrap();

    assert_eq!(frozen.node_account_ids().len(), 3);
    assert_eq!(
        frozen
            .node_account_ids()
            .iter()
            .collect::<BTreeSet<_>>()
            .len(),
        3
    );
    assert_eq!(frozen.transaction_id().account_id, AccountId::from_num(2));
    assert_eq!(frozen.max_transaction_fee(), 200_000_000);
}

#[test]
fn test_sign_with_operator() {
    let transport = Arc::new(MockTransport::new());
    let client = Client::with_transport(transport, &ClientConfig::default()).unwrap();
    let mut frozen = frozen_transfer();

    assert!(matches!(
        frozen.sign_with_operator(&client),
        Err(Error::NoOperator)
    ));

    let signers = TestSigners::new(1, 30);
    client.set_operator(AccountId::from_num(2), signers.signer(0).clone());
    frozen.sign_with_operator(&client).unwrap();
    frozen.sign_with_operator(&client).unwrap();
    assert!(frozen.is_signed_by(&signers.public_key(0)));
    assert_eq!(frozen.signatures().len(), 2);
}

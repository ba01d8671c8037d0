//! Serialization of frozen transactions as a `TransactionList`.
//!
//! The list holds one signed envelope per (chunk, node), chunk-major. Reading
//! it back regroups envelopes by transaction id and checks that every node's
//! body of a chunk is the same apart from the node account id.

use super::frozen::{BodySettings, FrozenChunk, FrozenTransaction};
use super::{ensure_distinct_nodes, SignatureMap, TransactionData, DEFAULT_VALID_DURATION};
use crate::TransactionError;
use ledgerlink_proto::{self as proto, Message, ProtoError};
use ledgerlink_types::{AccountId, PublicKey, TransactionId};
use std::time::Duration;
use tracing::debug;

/// One decoded envelope.
struct Envelope {
    node: AccountId,
    body_bytes: Vec<u8>,
    body: proto::TransactionBody,
    sig_map: Option<proto::SignatureMap>,
}

impl Envelope {
    fn decode(transaction: &proto::Transaction) -> Result<(TransactionId, Self), TransactionError> {
        let signed = proto::SignedTransaction::decode(transaction.signed_transaction_bytes.as_slice())?;
        let body = proto::TransactionBody::decode(signed.body_bytes.as_slice())?;
        let transaction_id: TransactionId = body
            .transaction_id
            .ok_or(ProtoError::MissingField("transaction_id"))?
            .try_into()?;
        let node: AccountId = body
            .node_account_id
            .ok_or(ProtoError::MissingField("node_account_id"))?
            .try_into()?;
        Ok((
            transaction_id,
            Self {
                node,
                body_bytes: signed.body_bytes,
                body,
                sig_map: signed.sig_map,
            },
        ))
    }

    /// The body encoded without its node account id.
    fn node_independent_bytes(&self) -> Vec<u8> {
        let mut body = self.body.clone();
        body.node_account_id = None;
        body.encode_to_vec()
    }
}

impl<D: TransactionData> FrozenTransaction<D> {
    /// Serialize every signed body.
    pub fn to_bytes(&self) -> Vec<u8> {
        let transaction_list = (0..self.chunks.len())
            .flat_map(|chunk| (0..self.node_account_ids.len()).map(move |node| (chunk, node)))
            .filter_map(|(chunk, node)| self.signed_transaction_bytes(chunk, node))
            .map(|signed_transaction_bytes| proto::Transaction {
                signed_transaction_bytes,
            })
            .collect();
        proto::TransactionList { transaction_list }.encode_to_vec()
    }

    /// Rebuild a frozen transaction from [`FrozenTransaction::to_bytes`] output.
    ///
    /// Fails if any chunk targets a different node list than the first, or if
    /// two nodes' bodies of one chunk differ in anything but the node id.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let list = proto::TransactionList::decode(bytes)?;
        if list.transaction_list.is_empty() {
            return Err(TransactionError::Empty);
        }

        // Group by transaction id, keeping first-appearance order.
        let mut groups: Vec<(TransactionId, Vec<Envelope>)> = Vec::new();
        for transaction in &list.transaction_list {
            let (transaction_id, envelope) = Envelope::decode(transaction)?;
            match groups.iter_mut().find(|(id, _)| *id == transaction_id) {
                Some((_, envelopes)) => envelopes.push(envelope),
                None => groups.push((transaction_id, vec![envelope])),
            }
        }

        let node_account_ids: Vec<AccountId> = groups[0].1.iter().map(|e| e.node).collect();
        ensure_distinct_nodes(&node_account_ids)?;
        let mut chunks = Vec::with_capacity(groups.len());
        let mut payloads = Vec::with_capacity(groups.len());
        let mut signatures = SignatureMap::new();

        for (transaction_id, envelopes) in groups {
            let envelopes = order_by_nodes(transaction_id, envelopes, &node_account_ids)?;

            let reference = envelopes[0].node_independent_bytes();
            for envelope in &envelopes[1..] {
                if envelope.node_independent_bytes() != reference {
                    return Err(TransactionError::InconsistentBodies {
                        transaction_id,
                        node: envelope.node,
                    });
                }
            }

            for envelope in &envelopes {
                for (key, signature) in signature_pairs(envelope.sig_map.as_ref())? {
                    signatures.insert(envelope.node, transaction_id, key, signature);
                }
            }

            payloads.push(
                envelopes[0]
                    .body
                    .data
                    .clone()
                    .ok_or(ProtoError::MissingField("data"))?,
            );
            chunks.push(FrozenChunk {
                transaction_id,
                bodies: envelopes.into_iter().map(|e| e.body_bytes).collect(),
            });
        }

        let first = proto::TransactionBody::decode(chunks[0].bodies[0].as_slice())?;
        let settings = BodySettings {
            max_transaction_fee: first.transaction_fee,
            valid_duration: first
                .transaction_valid_duration
                .map(|d| Duration::from_secs(d.seconds.max(0) as u64))
                .unwrap_or(DEFAULT_VALID_DURATION),
            memo: first.memo,
        };
        let transaction_id = chunks[0].transaction_id;
        let data = D::from_chunks(payloads)?;

        debug!(
            %transaction_id,
            chunks = chunks.len(),
            nodes = node_account_ids.len(),
            signatures = signatures.len(),
            "Deserialized transaction"
        );

        Ok(Self::from_parts(
            data,
            node_account_ids,
            transaction_id,
            settings,
            chunks,
            signatures,
        ))
    }
}

/// Reorder a chunk's envelopes to `nodes`, requiring exactly one per node.
fn order_by_nodes(
    transaction_id: TransactionId,
    mut envelopes: Vec<Envelope>,
    nodes: &[AccountId],
) -> Result<Vec<Envelope>, TransactionError> {
    let inconsistent = || TransactionError::InconsistentNodes { transaction_id };
    if envelopes.len() != nodes.len() {
        return Err(inconsistent());
    }
    let mut ordered = Vec::with_capacity(nodes.len());
    for node in nodes {
        let position = envelopes
            .iter()
            .position(|e| e.node == *node)
            .ok_or_else(inconsistent)?;
        ordered.push(envelopes.swap_remove(position));
    }
    Ok(ordered)
}

fn signature_pairs(
    sig_map: Option<&proto::SignatureMap>,
) -> Result<Vec<(PublicKey, Vec<u8>)>, TransactionError> {
    let Some(sig_map) = sig_map else {
        return Ok(Vec::new());
    };
    sig_map
        .sig_pair
        .iter()
        .filter_map(|pair| {
            let proto::signature_pair::Signature::Ed25519(signature) = pair.signature.as_ref()?;
            Some((pair, signature))
        })
        .map(|(pair, signature)| {
            let key = PublicKey::ed25519_from_bytes(&pair.pub_key_prefix).map_err(|e| {
                ProtoError::InvalidValue {
                    field: "sig_pair.pub_key_prefix",
                    reason: e.to_string(),
                }
            })?;
            Ok((key, signature.clone()))
        })
        .collect()
}

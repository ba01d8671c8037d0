//! The frozen transaction: fixed bodies, mutable signatures.

use super::{SignatureMap, TransactionData};
use crate::TransactionError;
use ledgerlink_proto::{self as proto, transaction_body, Message};
use ledgerlink_types::{AccountId, PublicKey, Signature, Signer, TransactionHash, TransactionId};
use std::collections::BTreeMap;
use std::time::Duration;

/// Body fields shared by every chunk and node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BodySettings {
    pub(crate) max_transaction_fee: u64,
    pub(crate) valid_duration: Duration,
    pub(crate) memo: String,
}

/// One chunk: its transaction id and one encoded body per node, in node order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FrozenChunk {
    pub(crate) transaction_id: TransactionId,
    pub(crate) bodies: Vec<Vec<u8>>,
}

impl FrozenChunk {
    pub(crate) fn new(
        transaction_id: TransactionId,
        data: transaction_body::Data,
        nodes: &[AccountId],
        settings: &BodySettings,
    ) -> Self {
        let bodies = nodes
            .iter()
            .map(|node| {
                proto::TransactionBody {
                    transaction_id: Some(transaction_id.into()),
                    node_account_id: Some((*node).into()),
                    transaction_fee: settings.max_transaction_fee,
                    transaction_valid_duration: Some(proto::Duration {
                        seconds: settings.valid_duration.as_secs() as i64,
                    }),
                    memo: settings.memo.clone(),
                    data: Some(data.clone()),
                }
                .encode_to_vec()
            })
            .collect();
        Self {
            transaction_id,
            bodies,
        }
    }
}

/// A transaction whose content can no longer change.
///
/// Holds one encoded body per (chunk, node) pair. Bodies of the same chunk
/// differ only in their node account id. Signatures are tracked per body in a
/// [`SignatureMap`].
#[derive(Debug, Clone)]
pub struct FrozenTransaction<D> {
    pub(crate) data: D,
    pub(crate) node_account_ids: Vec<AccountId>,
    pub(crate) transaction_id: TransactionId,
    pub(crate) settings: BodySettings,
    pub(crate) chunks: Vec<FrozenChunk>,
    pub(crate) signatures: SignatureMap,
}

impl<D: TransactionData> FrozenTransaction<D> {
    pub(crate) fn from_parts(
        data: D,
        node_account_ids: Vec<AccountId>,
        transaction_id: TransactionId,
        settings: BodySettings,
        chunks: Vec<FrozenChunk>,
        signatures: SignatureMap,
    ) -> Self {
        Self {
            data,
            node_account_ids,
            transaction_id,
            settings,
            chunks,
            signatures,
        }
    }

    pub fn data(&self) -> &D {
        &self.data
    }

    pub fn node_account_ids(&self) -> &[AccountId] {
        &self.node_account_ids
    }

    /// Transaction id of the first chunk.
    pub fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// Transaction ids of every chunk, in order.
    pub fn chunk_transaction_ids(&self) -> Vec<TransactionId> {
        self.chunks.iter().map(|c| c.transaction_id).collect()
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn max_transaction_fee(&self) -> u64 {
        self.settings.max_transaction_fee
    }

    pub fn valid_duration(&self) -> Duration {
        self.settings.valid_duration
    }

    pub fn memo(&self) -> &str {
        &self.settings.memo
    }

    /// Encoded body for chunk `chunk` as sent to `node`.
    pub fn body_bytes(&self, chunk: usize, node: AccountId) -> Option<&[u8]> {
        let node_index = self.node_index(node)?;
        self.chunks
            .get(chunk)
            .map(|c| c.bodies[node_index].as_slice())
    }

    pub fn signatures(&self) -> &SignatureMap {
        &self.signatures
    }

    /// Sign every body not yet signed by `signer`.
    pub fn sign<S: Signer + ?Sized>(&mut self, signer: &S) -> &mut Self {
        let key = signer.public_key();
        for chunk in &self.chunks {
            for (node, body) in self.node_account_ids.iter().zip(&chunk.bodies) {
                if self.signatures.is_signed_by(*node, chunk.transaction_id, &key) {
                    continue;
                }
                let signature = signer.sign(body).into_bytes();
                self.signatures
                    .insert(*node, chunk.transaction_id, key, signature);
            }
        }
        self
    }

    /// Whether `key` has signed every body.
    pub fn is_signed_by(&self, key: &PublicKey) -> bool {
        self.buckets()
            .all(|(node, tx)| self.signatures.is_signed_by(node, tx, key))
    }

    /// Check every recorded signature against the body it covers.
    ///
    /// Returns the keys with at least one signature that does not verify.
    pub fn invalid_signers(&self) -> Vec<PublicKey> {
        let mut invalid = Vec::new();
        for chunk in &self.chunks {
            for (node, body) in self.node_account_ids.iter().zip(&chunk.bodies) {
                let Some(sigs) = self.signatures.get(*node, chunk.transaction_id) else {
                    continue;
                };
                for (key, signature) in sigs {
                    let signature = Signature::Ed25519(signature.clone());
                    if !key.verify(body, &signature) && !invalid.contains(key) {
                        invalid.push(*key);
                    }
                }
            }
        }
        invalid
    }

    /// Add externally produced signatures by `key`, one slot per body in
    /// chunk-major then node order (the order [`FrozenTransaction::remove_signature`]
    /// returns). `None` slots leave that body unsigned by `key`.
    pub fn add_signature(
        &mut self,
        key: PublicKey,
        signatures: Vec<Option<Vec<u8>>>,
    ) -> Result<&mut Self, TransactionError> {
        let expected = self.chunks.len() * self.node_account_ids.len();
        if signatures.len() != expected {
            return Err(TransactionError::SignatureCountMismatch {
                expected,
                actual: signatures.len(),
            });
        }
        let buckets: Vec<_> = self.buckets().collect();
        for ((node, tx), signature) in buckets.into_iter().zip(signatures) {
            if let Some(signature) = signature {
                self.signatures.insert(node, tx, key, signature);
            }
        }
        Ok(self)
    }

    /// Remove every signature by `key`.
    ///
    /// Returns one slot per body in chunk-major then node order, `None` where
    /// `key` had not signed that body.
    pub fn remove_signature(
        &mut self,
        key: &PublicKey,
    ) -> Result<Vec<Option<Vec<u8>>>, TransactionError> {
        let buckets: Vec<_> = self.buckets().collect();
        let removed: Vec<_> = buckets
            .into_iter()
            .map(|(node, tx)| self.signatures.remove(node, tx, key))
            .collect();
        if removed.iter().all(Option::is_none) {
            return Err(TransactionError::NoSuchSigner(*key));
        }
        Ok(removed)
    }

    /// Remove every signature, grouped by signing key.
    pub fn remove_all_signatures(&mut self) -> BTreeMap<PublicKey, Vec<Option<Vec<u8>>>> {
        let signers = self.signatures.signers();
        signers
            .into_iter()
            .filter_map(|key| {
                let removed = self.remove_signature(&key).ok()?;
                Some((key, removed))
            })
            .collect()
    }

    /// Hash of the signed envelope sent to `node` for chunk `chunk`.
    pub fn transaction_hash(&self, chunk: usize, node: AccountId) -> Option<TransactionHash> {
        let node_index = self.node_index(node)?;
        let signed = self.signed_transaction_bytes(chunk, node_index)?;
        Some(TransactionHash::from_bytes(&signed))
    }

    pub(crate) fn node_index(&self, node: AccountId) -> Option<usize> {
        self.node_account_ids.iter().position(|n| *n == node)
    }

    /// `(node, chunk transaction id)` for every body, chunk-major.
    fn buckets(&self) -> impl Iterator<Item = (AccountId, TransactionId)> + '_ {
        self.chunks.iter().flat_map(move |chunk| {
            self.node_account_ids
                .iter()
                .map(move |node| (*node, chunk.transaction_id))
        })
    }

    /// Encoded `SignedTransaction` for one body.
    pub(crate) fn signed_transaction_bytes(&self, chunk: usize, node_index: usize) -> Option<Vec<u8>> {
        let frozen = self.chunks.get(chunk)?;
        let node = *self.node_account_ids.get(node_index)?;
        let signed = proto::SignedTransaction {
            body_bytes: frozen.bodies[node_index].clone(),
            sig_map: Some(self.signatures.to_proto(node, frozen.transaction_id)),
        };
        Some(signed.encode_to_vec())
    }

    /// Encoded `Transaction` envelope for one body.
    pub(crate) fn envelope_bytes(&self, chunk: usize, node_index: usize) -> Option<Vec<u8>> {
        let signed_transaction_bytes = self.signed_transaction_bytes(chunk, node_index)?;
        Some(
            proto::Transaction {
                signed_transaction_bytes,
            }
            .encode_to_vec(),
        )
    }
}

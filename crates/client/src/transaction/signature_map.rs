//! Signatures collected on a frozen transaction.

use ledgerlink_proto as proto;
use ledgerlink_types::{AccountId, PublicKey, TransactionId};
use std::collections::{BTreeMap, BTreeSet};

/// Signatures keyed by the body they cover.
///
/// A body is identified by `(node account id, chunk transaction id)`; each body
/// holds at most one signature per public key. Buckets left empty by a removal
/// are dropped, so two maps with the same signatures always compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureMap {
    entries: BTreeMap<(AccountId, TransactionId), BTreeMap<PublicKey, Vec<u8>>>,
}

impl SignatureMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `signature` by `key` over the body for `(node, transaction_id)`,
    /// replacing any earlier signature by the same key.
    pub fn insert(
        &mut self,
        node: AccountId,
        transaction_id: TransactionId,
        key: PublicKey,
        signature: Vec<u8>,
    ) -> Option<Vec<u8>> {
        self.entries
            .entry((node, transaction_id))
            .or_default()
            .insert(key, signature)
    }

    /// Signatures over the body for `(node, transaction_id)`.
    pub fn get(
        &self,
        node: AccountId,
        transaction_id: TransactionId,
    ) -> Option<&BTreeMap<PublicKey, Vec<u8>>> {
        self.entries.get(&(node, transaction_id))
    }

    /// Whether `key` signed the body for `(node, transaction_id)`.
    pub fn is_signed_by(
        &self,
        node: AccountId,
        transaction_id: TransactionId,
        key: &PublicKey,
    ) -> bool {
        self.get(node, transaction_id)
            .is_some_and(|sigs| sigs.contains_key(key))
    }

    /// Remove the signature by `key` over one body.
    pub fn remove(
        &mut self,
        node: AccountId,
        transaction_id: TransactionId,
        key: &PublicKey,
    ) -> Option<Vec<u8>> {
        let bucket = self.entries.get_mut(&(node, transaction_id))?;
        let removed = bucket.remove(key);
        if bucket.is_empty() {
            self.entries.remove(&(node, transaction_id));
        }
        removed
    }

    /// Every key with at least one signature.
    pub fn signers(&self) -> BTreeSet<PublicKey> {
        self.entries
            .values()
            .flat_map(|sigs| sigs.keys().copied())
            .collect()
    }

    /// Total number of signatures across all bodies.
    pub fn len(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate bodies and their signatures in key order.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&(AccountId, TransactionId), &BTreeMap<PublicKey, Vec<u8>>)> {
        self.entries.iter()
    }

    /// Wire form of the signatures over one body.
    pub(crate) fn to_proto(&self, node: AccountId, transaction_id: TransactionId) -> proto::SignatureMap {
        let sig_pair = self
            .get(node, transaction_id)
            .into_iter()
            .flatten()
            .map(|(key, signature)| proto::SignaturePair {
                pub_key_prefix: key.as_bytes().to_vec(),
                signature: Some(proto::signature_pair::Signature::Ed25519(signature.clone())),
            })
            .collect();
        proto::SignatureMap { sig_pair }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerlink_types::Timestamp;

    fn tx(seconds: i64) -> TransactionId {
        TransactionId::with_valid_start(AccountId::from_num(2), Timestamp::new(seconds, 0))
    }

    #[test]
    fn test_insert_replaces_per_key() {
        let key = PublicKey::Ed25519([1; 32]);
        let mut map = SignatureMap::new();
        assert!(map.insert(AccountId::from_num(3), tx(1), key, vec![1]).is_none());
        assert_eq!(
            map.insert(AccountId::from_num(3), tx(1), key, vec![2]),
            Some(vec![1])
        );
        assert_eq!(map.len(), 1);
        assert!(map.is_signed_by(AccountId::from_num(3), tx(1), &key));
        assert!(!map.is_signed_by(AccountId::from_num(4), tx(1), &key));
    }

    #[test]
    fn test_remove_drops_empty_buckets() {
        let a = PublicKey::Ed25519([1; 32]);
        let b = PublicKey::Ed25519([2; 32]);
        let node = AccountId::from_num(3);

        let mut map = SignatureMap::new();
        map.insert(node, tx(1), a, vec![1]);
        let before = map.clone();

        map.insert(node, tx(1), b, vec![2]);
        map.insert(node, tx(2), b, vec![3]);
        assert_eq!(map.signers(), BTreeSet::from([a, b]));

        assert_eq!(map.remove(node, tx(1), &b), Some(vec![2]));
        assert_eq!(map.remove(node, tx(2), &b), Some(vec![3]));
        assert_eq!(map.remove(node, tx(2), &b), None);
        assert_eq!(map, before);
    }

    #[test]
    fn test_to_proto_orders_by_key() {
        let node = AccountId::from_num(3);
        let mut map = SignatureMap::new();
        map.insert(node, tx(1), PublicKey::Ed25519([9; 32]), vec![9]);
        map.insert(node, tx(1), PublicKey::Ed25519([1; 32]), vec![1]);

        let wire = map.to_proto(node, tx(1));
        assert_eq!(wire.sig_pair.len(), 2);
        assert_eq!(wire.sig_pair[0].pub_key_prefix, vec![1; 32]);
        assert!(map.to_proto(AccountId::from_num(4), tx(1)).sig_pair.is_empty());
    }
}

//! Result of submitting a transaction.

use crate::query::{TransactionReceipt, TransactionReceiptQuery, TransactionRecord, TransactionRecordQuery};
use crate::{Client, Error};
use ledgerlink_network::Transport;
use ledgerlink_types::{AccountId, TransactionHash, TransactionId};

/// A node's acceptance of a submitted transaction.
///
/// Acceptance only means the node passed precheck. Whether the transaction
/// succeeded is known once its receipt is final.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResponse {
    /// Node that accepted the transaction.
    pub node_id: AccountId,
    pub transaction_id: TransactionId,
    /// SHA-384 of the signed transaction sent to `node_id`.
    pub transaction_hash: TransactionHash,
    /// Nodes the transaction was frozen for.
    pub transaction_node_account_ids: Vec<AccountId>,
}

impl TransactionResponse {
    /// Nodes to ask for the receipt or record.
    ///
    /// The submitting node always comes first. With failover allowed it is
    /// followed by the transaction's nodes, or `network` when those are unknown,
    /// without duplicates.
    pub fn follow_up_nodes(&self, allow_failover: bool, network: &[AccountId]) -> Vec<AccountId> {
        let mut nodes = vec![self.node_id];
        if !allow_failover {
            return nodes;
        }
        let fallback = if self.transaction_node_account_ids.is_empty() {
            network
        } else {
            self.transaction_node_account_ids.as_slice()
        };
        for node in fallback {
            if !nodes.contains(node) {
                nodes.push(*node);
            }
        }
        nodes
    }

    /// Receipt query targeting the follow-up nodes.
    pub fn receipt_query<T: Transport>(&self, client: &Client<T>) -> TransactionReceiptQuery {
        TransactionReceiptQuery::new(self.transaction_id).node_account_ids(self.client_follow_up_nodes(client))
    }

    /// Record query targeting the follow-up nodes.
    pub fn record_query<T: Transport>(&self, client: &Client<T>) -> TransactionRecordQuery {
        TransactionRecordQuery::new(self.transaction_id).node_account_ids(self.client_follow_up_nodes(client))
    }

    /// Wait for the receipt and require the transaction to have succeeded.
    pub async fn get_receipt<T: Transport>(&self, client: &Client<T>) -> Result<TransactionReceipt, Error> {
        self.receipt_query(client)
            .execute(client)
            .await?
            .validate(self.transaction_id)
    }

    /// Wait for the record and require the transaction to have succeeded.
    pub async fn get_record<T: Transport>(&self, client: &Client<T>) -> Result<TransactionRecord, Error> {
        let record = self.record_query(client).execute(client).await?;
        record.receipt.clone().validate(self.transaction_id)?;
        Ok(record)
    }

    fn client_follow_up_nodes<T: Transport>(&self, client: &Client<T>) -> Vec<AccountId> {
        let allow = client.execution_settings().allow_receipt_node_failover;
        let network = if allow && self.transaction_node_account_ids.is_empty() {
            client.network().account_ids()
        } else {
            Vec::new()
        };
        self.follow_up_nodes(allow, &network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(nums: &[u64]) -> Vec<AccountId> {
        nums.iter().copied().map(AccountId::from_num).collect()
    }

    fn response(node: u64, tx_nodes: &[u64]) -> TransactionResponse {
        TransactionResponse {
            node_id: AccountId::from_num(node),
            transaction_id: TransactionId::generate(AccountId::from_num(2)),
            transaction_hash: TransactionHash::from_bytes(b"signed"),
            transaction_node_account_ids: ids(tx_nodes),
        }
    }

    #[test]
    fn test_without_failover_only_submitting_node() {
        let r = response(3, &[3, 4, 5]);
        assert_eq!(r.follow_up_nodes(false, &ids(&[3, 4, 5, 6])), ids(&[3]));
    }

    #[test]
    fn test_failover_uses_transaction_nodes() {
        let r = response(3, &[3, 4, 5]);
        assert_eq!(r.follow_up_nodes(true, &ids(&[6, 3, 7])), ids(&[3, 4, 5]));
    }

    #[test]
    fn test_submitting_node_first_even_when_listed_later() {
        let r = response(5, &[3, 4, 5]);
        assert_eq!(r.follow_up_nodes(true, &[]), ids(&[5, 3, 4]));
    }

    #[test]
    fn test_failover_falls_back_to_network() {
        let r = response(4, &[]);
        assert_eq!(r.follow_up_nodes(true, &ids(&[3, 4, 5])), ids(&[4, 3, 5]));
    }
}

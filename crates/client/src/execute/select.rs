//! Candidate node selection within one call.

use ledgerlink_network::ManagedNode;
use ledgerlink_types::AccountId;
use std::collections::HashSet;
use std::sync::Arc;

/// Ordered candidates for one call, tried in rounds.
///
/// Within a round each node is tried at most once: a node that failed is not
/// picked again until every other candidate has been tried, even if its
/// backoff runs out in the meantime. Healthy nodes are preferred over nodes in
/// backoff, otherwise the candidate order is kept.
pub(super) struct NodeSelector {
    candidates: Vec<(AccountId, Arc<ManagedNode>)>,
    tried: HashSet<AccountId>,
    round: u32,
}

impl NodeSelector {
    pub(super) fn new(candidates: Vec<(AccountId, Arc<ManagedNode>)>) -> Self {
        Self {
            candidates,
            tried: HashSet::new(),
            round: 0,
        }
    }

    pub(super) fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Rounds started so far, counting the current one.
    pub(super) fn round(&self) -> u32 {
        self.round + 1
    }

    /// The next node to try, starting a new round once every candidate has been tried.
    pub(super) fn next(&mut self) -> Option<(AccountId, Arc<ManagedNode>)> {
        if self.candidates.is_empty() {
            return None;
        }
        if self
            .candidates
            .iter()
            .all(|(account, _)| self.tried.contains(account))
        {
            self.tried.clear();
            self.round += 1;
        }

        let untried = || {
            self.candidates
                .iter()
                .filter(|(account, _)| !self.tried.contains(account))
        };
        let picked = untried()
            .find(|(_, node)| node.is_healthy())
            .or_else(|| untried().min_by_key(|(_, node)| node.remaining_backoff()))
            .cloned()?;
        self.tried.insert(picked.0);
        Some(picked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerlink_network::{FailureKind, HealthConfig};
    use ledgerlink_types::NodeAddress;

    fn node(num: u64) -> (AccountId, Arc<ManagedNode>) {
        let account = AccountId::from_num(num);
        let address = NodeAddress::new(format!("node{num}.test"), 50211).unwrap();
        let node = ManagedNode::consensus(account, address, HealthConfig::default());
        (account, Arc::new(node))
    }

    fn picks(selector: &mut NodeSelector, n: usize) -> Vec<u64> {
        (0..n)
            .map(|_| selector.next().unwrap().0.num)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_rounds_keep_order() {
        let mut selector = NodeSelector::new(vec![node(3), node(4), node(5)]);
        assert_eq!(picks(&mut selector, 3), vec![3, 4, 5]);
        assert_eq!(selector.round(), 1);
        assert_eq!(picks(&mut selector, 2), vec![3, 4]);
        assert_eq!(selector.round(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_prefers_healthy_within_round() {
        let candidates = vec![node(3), node(4), node(5)];
        candidates[0].1.mark_failure(FailureKind::Transport);

        let mut selector = NodeSelector::new(candidates);
        // Node 3 is in backoff, so it goes last in the round.
        assert_eq!(picks(&mut selector, 3), vec![4, 5, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_least_backoff_first_when_all_unhealthy() {
        let candidates = vec![node(3), node(4)];
        candidates[0].1.mark_failure(FailureKind::Transport);
        candidates[0].1.mark_failure(FailureKind::Transport);
        candidates[1].1.mark_failure(FailureKind::Transport);

        let mut selector = NodeSelector::new(candidates);
        assert_eq!(picks(&mut selector, 2), vec![4, 3]);
    }

    #[test]
    fn test_empty() {
        let mut selector = NodeSelector::new(Vec::new());
        assert!(selector.is_empty());
        assert!(selector.next().is_none());
    }
}

//! The managed set of nodes for one ledger network.
//!
//! Nodes are indexed by address (exactly one node per address) and, for
//! consensus networks, by account id (one or more addresses per account).
//! Selection walks the node list from a persisted round-robin cursor,
//! returning healthy nodes before nodes in backoff.

use crate::node::{HealthConfig, ManagedNode, NodeKind};
use crate::pool::ChannelPool;
use crate::traits::{ResponseStream, Transport};
use crate::{NetworkError, TransportError};
use bytes::Bytes;
use ledgerlink_types::{AccountId, NodeAddress};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Configuration for a [`ManagedNetwork`].
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Maximum live channels per node address.
    pub channels_per_node: usize,

    /// Backoff bounds applied to every node.
    pub health: HealthConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            channels_per_node: 1,
            health: HealthConfig::default(),
        }
    }
}

/// What a reconfiguration changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkChange {
    /// Addresses of newly created nodes.
    pub added: Vec<NodeAddress>,
    /// Addresses of nodes that were closed and dropped.
    pub removed: Vec<NodeAddress>,
    /// Number of nodes carried over untouched.
    pub unchanged: usize,
}

#[derive(Default)]
struct NetworkState {
    nodes: Vec<Arc<ManagedNode>>,
    by_account: HashMap<AccountId, Vec<Arc<ManagedNode>>>,
    by_address: HashMap<NodeAddress, Arc<ManagedNode>>,
}

impl NetworkState {
    fn build(nodes: Vec<Arc<ManagedNode>>) -> Self {
        let mut by_account: HashMap<AccountId, Vec<Arc<ManagedNode>>> = HashMap::new();
        let mut by_address = HashMap::with_capacity(nodes.len());
        for node in &nodes {
            if let Some(account) = node.account_id() {
                by_account.entry(account).or_default().push(node.clone());
            }
            by_address.insert(node.address().clone(), node.clone());
        }
        Self {
            nodes,
            by_account,
            by_address,
        }
    }
}

/// The set of known nodes for a target network.
///
/// Channels are pooled per address and owned by this instance; removing a node
/// or closing the network closes its channels.
pub struct ManagedNetwork<T: Transport> {
    kind: NodeKind,
    config: NetworkConfig,
    pool: ChannelPool<T>,
    state: RwLock<NetworkState>,
    cursor: AtomicUsize,
    closed: AtomicBool,
}

impl<T: Transport> ManagedNetwork<T> {
    /// Create an empty consensus network (unary calls, nodes keyed by account).
    pub fn consensus(transport: Arc<T>, config: NetworkConfig) -> Self {
        Self::new(NodeKind::Unary, transport, config)
    }

    /// Create an empty mirror network (streaming calls, nodes keyed by address).
    pub fn mirror(transport: Arc<T>, config: NetworkConfig) -> Self {
        Self::new(NodeKind::Streaming, transport, config)
    }

    fn new(kind: NodeKind, transport: Arc<T>, config: NetworkConfig) -> Self {
        Self {
            kind,
            pool: ChannelPool::new(transport, config.channels_per_node),
            config,
            state: RwLock::new(NetworkState::default()),
            cursor: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// The channel pool, for inspection.
    pub fn pool(&self) -> &ChannelPool<T> {
        &self.pool
    }

    /// Replace the consensus node set with `network`.
    ///
    /// Nodes whose (account, address) pair is unchanged keep their identity and
    /// health. New pairs get fresh nodes; nodes no longer listed have their
    /// channels closed. All accounts must share one shard and realm.
    pub fn set_network(
        &self,
        network: &HashMap<AccountId, Vec<NodeAddress>>,
    ) -> Result<NetworkChange, NetworkError> {
        // Sorted so node order (and therefore selection order) is deterministic.
        let sorted: BTreeMap<&AccountId, &Vec<NodeAddress>> = network.iter().collect();

        let mut partition = None;
        let mut claimed: HashMap<&NodeAddress, AccountId> = HashMap::new();
        let mut entries = Vec::new();
        for (&account, addresses) in sorted {
            match partition {
                None => partition = Some(account.partition()),
                Some(expected) if expected != account.partition() => {
                    return Err(NetworkError::MixedPartitions {
                        expected,
                        found: account,
                    });
                }
                Some(_) => {}
            }
            if addresses.is_empty() {
                return Err(NetworkError::NoAddresses(account));
            }
            for address in addresses {
                if let Some(first) = claimed.insert(address, account) {
                    if first != account {
                        return Err(NetworkError::DuplicateAddress {
                            address: address.clone(),
                            first,
                            second: account,
                        });
                    }
                    continue;
                }
                entries.push((Some(account), address.clone()));
            }
        }

        self.apply(entries)
    }

    /// Replace the mirror node set with `addresses`.
    pub fn set_mirror_network(
        &self,
        addresses: &[NodeAddress],
    ) -> Result<NetworkChange, NetworkError> {
        let mut seen = HashSet::new();
        let entries = addresses
            .iter()
            .filter(|address| seen.insert(*address))
            .map(|address| (None, address.clone()))
            .collect();
        self.apply(entries)
    }

    fn apply(
        &self,
        entries: Vec<(Option<AccountId>, NodeAddress)>,
    ) -> Result<NetworkChange, NetworkError> {
        if self.is_closed() {
            return Err(NetworkError::Closed);
        }

        let mut change = NetworkChange::default();
        let removed_nodes = {
            let mut state = self.state.write();
            let mut previous = std::mem::take(&mut state.by_address);

            let mut replaced = Vec::new();
            let mut nodes = Vec::with_capacity(entries.len());
            for (account, address) in entries {
                let node = match previous.remove(&address) {
                    Some(node) if node.account_id() == account => {
                        change.unchanged += 1;
                        node
                    }
                    existing => {
                        // An address that moved to another account gets a fresh node.
                        replaced.extend(existing);
                        change.added.push(address.clone());
                        Arc::new(self.make_node(account, address))
                    }
                };
                nodes.push(node);
            }

            *state = NetworkState::build(nodes);
            replaced.extend(previous.into_values());
            replaced
        };

        for node in removed_nodes {
            change.removed.push(node.address().clone());
            self.pool.close_address(node.address());
        }

        info!(
            kind = ?self.kind,
            added = change.added.len(),
            removed = change.removed.len(),
            unchanged = change.unchanged,
            "Network reconfigured"
        );
        Ok(change)
    }

    fn make_node(&self, account: Option<AccountId>, address: NodeAddress) -> ManagedNode {
        match account {
            Some(account) => ManagedNode::consensus(account, address, self.config.health.clone()),
            None => ManagedNode::mirror(address, self.config.health.clone()),
        }
    }

    /// Every node, in selection order.
    pub fn nodes(&self) -> Vec<Arc<ManagedNode>> {
        self.state.read().nodes.clone()
    }

    pub fn len(&self) -> usize {
        self.state.read().nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().nodes.is_empty()
    }

    /// Distinct account ids of the consensus nodes, in selection order.
    pub fn account_ids(&self) -> Vec<AccountId> {
        let state = self.state.read();
        let mut seen = HashSet::new();
        state
            .nodes
            .iter()
            .filter_map(|node| node.account_id())
            .filter(|account| seen.insert(*account))
            .collect()
    }

    /// Shard and realm shared by every consensus node.
    pub fn partition(&self) -> Option<(u64, u64)> {
        self.state
            .read()
            .nodes
            .iter()
            .find_map(|node| node.account_id())
            .map(|account| account.partition())
    }

    /// The node at `address`.
    pub fn node_by_address(&self, address: &NodeAddress) -> Option<Arc<ManagedNode>> {
        self.state.read().by_address.get(address).cloned()
    }

    /// All nodes serving `account`.
    pub fn nodes_for_account(&self, account: &AccountId) -> Vec<Arc<ManagedNode>> {
        self.state
            .read()
            .by_account
            .get(account)
            .cloned()
            .unwrap_or_default()
    }

    /// One node serving `account`, preferring a healthy address.
    pub fn node_for_account(&self, account: &AccountId) -> Option<Arc<ManagedNode>> {
        let state = self.state.read();
        let nodes = state.by_account.get(account)?;
        nodes
            .iter()
            .find(|node| node.is_healthy())
            .or_else(|| nodes.first())
            .cloned()
    }

    /// Up to `count` distinct nodes for an attempt.
    ///
    /// Starting from a round-robin cursor that advances on every call, healthy
    /// nodes come first, then nodes in backoff. Consensus nodes are distinct by
    /// account id.
    pub fn nodes_for_attempt(&self, count: usize) -> Vec<Arc<ManagedNode>> {
        let state = self.state.read();
        let len = state.nodes.len();
        if len == 0 || count == 0 {
            return Vec::new();
        }

        let start = self.cursor.fetch_add(1, Ordering::Relaxed) % len;
        let rotated = state.nodes[start..].iter().chain(&state.nodes[..start]);
        let (healthy, unhealthy): (Vec<_>, Vec<_>) = rotated.partition(|node| node.is_healthy());

        let mut seen_accounts = HashSet::new();
        healthy
            .into_iter()
            .chain(unhealthy)
            .filter(|node| match node.account_id() {
                Some(account) => seen_accounts.insert(account),
                None => true,
            })
            .take(count)
            .cloned()
            .collect()
    }

    /// A channel to `node`, opened lazily through the pool.
    ///
    /// Fails with [`TransportError::NodeRemoved`] once `node` is no longer the
    /// current node for its address.
    pub async fn channel(&self, node: &ManagedNode) -> Result<T::Channel, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        let address = node.address();
        if !self.is_current(node) {
            return Err(TransportError::NodeRemoved(address.clone()));
        }

        let channel = self.pool.get_connection(address).await?;

        // Removed while connecting. A pool recreated for a vanished address is closed again.
        if !self.is_current(node) {
            if self.node_by_address(address).is_none() {
                self.pool.close_address(address);
            }
            return Err(TransportError::NodeRemoved(address.clone()));
        }
        Ok(channel)
    }

    fn is_current(&self, node: &ManagedNode) -> bool {
        self.state
            .read()
            .by_address
            .get(node.address())
            .is_some_and(|current| std::ptr::eq(Arc::as_ptr(current), node))
    }

    /// Issue a unary call to `node`.
    pub async fn unary(
        &self,
        node: &ManagedNode,
        path: &str,
        request: Bytes,
    ) -> Result<Bytes, TransportError> {
        let channel = self.channel(node).await?;
        node.mark_used();
        self.pool.transport().unary(&channel, path, request).await
    }

    /// Open a server stream on `node`.
    pub async fn server_streaming(
        &self,
        node: &ManagedNode,
        path: &str,
        request: Bytes,
    ) -> Result<ResponseStream, TransportError> {
        let channel = self.channel(node).await?;
        node.mark_used();
        self.pool
            .transport()
            .server_streaming(&channel, path, request)
            .await
    }

    /// Remove the node at `address` and close its channels.
    ///
    /// Returns whether a node was removed.
    pub fn remove_node_by_address(&self, address: &NodeAddress) -> bool {
        let removed = {
            let mut state = self.state.write();
            if state.by_address.remove(address).is_none() {
                false
            } else {
                let remaining: Vec<_> = state
                    .nodes
                    .iter()
                    .filter(|node| node.address() != address)
                    .cloned()
                    .collect();
                *state = NetworkState::build(remaining);
                true
            }
        };
        if removed {
            self.pool.close_address(address);
            debug!(%address, "Removed node");
        }
        removed
    }

    /// Close every node's channels. Idempotent; concurrent callers close once.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.pool.close_all();
        *self.state.write() = NetworkState::default();
        info!(kind = ?self.kind, "Network closed");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

//! Managed nodes and their health/backoff state.
//!
//! A node that fails an attempt is put into backoff: it is not preferred for
//! selection until its readmission time passes. Each consecutive failure
//! doubles the backoff up to a ceiling; any success resets it. Nodes are never
//! evicted by health alone; only reconfiguring the network removes them.

use ledgerlink_types::{AccountId, NodeAddress};
use parking_lot::Mutex;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// What kind of calls a node serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Consensus node: identified by account id, serves unary calls.
    Unary,
    /// Mirror node: identified by address only, serves server-streaming calls.
    Streaming,
}

/// Why an attempt against a node failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The call failed at the transport level (unreachable, timed out, bad gRPC status).
    Transport,
    /// The node answered but reported a transient condition such as being busy.
    Transient,
}

/// Backoff bounds and penalty threshold for node health.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Backoff applied after the first failure is twice this; reset value after success.
    pub min_backoff: Duration,

    /// Ceiling for the backoff.
    pub max_backoff: Duration,

    /// Number of transport failures after which a node additionally sits out
    /// `max_backoff` on every further failure, until it next succeeds.
    pub bad_status_threshold: u32,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            min_backoff: Duration::from_millis(250),
            max_backoff: Duration::from_secs(8),
            bad_status_threshold: 10,
        }
    }
}

#[derive(Debug)]
struct HealthState {
    current_backoff: Duration,
    readmit_at: Option<Instant>,
    last_used: Option<Instant>,
    bad_status_count: u32,
    total_successes: u64,
    total_failures: u64,
}

/// Point-in-time view of a node's health.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeHealth {
    /// Whether the node is currently eligible as a healthy candidate.
    pub healthy: bool,
    /// Backoff that was applied by the last failure (or the minimum).
    pub current_backoff: Duration,
    /// Time left until the node is readmitted.
    pub remaining_backoff: Duration,
    /// Transport failures since the last success.
    pub bad_status_count: u32,
    /// Successful attempts over the node's lifetime.
    pub total_successes: u64,
    /// Failed attempts over the node's lifetime.
    pub total_failures: u64,
}

/// One addressable endpoint plus its health state.
///
/// Health updates take a per-node lock, so concurrent attempts against the same
/// node serialize their backoff changes.
pub struct ManagedNode {
    address: NodeAddress,
    account_id: Option<AccountId>,
    kind: NodeKind,
    config: HealthConfig,
    state: Mutex<HealthState>,
}

impl ManagedNode {
    fn new(
        address: NodeAddress,
        account_id: Option<AccountId>,
        kind: NodeKind,
        config: HealthConfig,
    ) -> Self {
        let state = HealthState {
            current_backoff: config.min_backoff,
            readmit_at: None,
            last_used: None,
            bad_status_count: 0,
            total_successes: 0,
            total_failures: 0,
        };
        Self {
            address,
            account_id,
            kind,
            config,
            state: Mutex::new(state),
        }
    }

    /// A consensus node.
    pub fn consensus(account_id: AccountId, address: NodeAddress, config: HealthConfig) -> Self {
        Self::new(address, Some(account_id), NodeKind::Unary, config)
    }

    /// A mirror node.
    pub fn mirror(address: NodeAddress, config: HealthConfig) -> Self {
        Self::new(address, None, NodeKind::Streaming, config)
    }

    pub fn address(&self) -> &NodeAddress {
        &self.address
    }

    /// Account id of a consensus node; `None` for mirror nodes.
    pub fn account_id(&self) -> Option<AccountId> {
        self.account_id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Whether the node's backoff window has passed.
    pub fn is_healthy(&self) -> bool {
        let state = self.state.lock();
        match state.readmit_at {
            Some(at) => Instant::now() >= at,
            None => true,
        }
    }

    /// Time until the node is readmitted, zero if healthy.
    pub fn remaining_backoff(&self) -> Duration {
        let state = self.state.lock();
        state
            .readmit_at
            .map(|at| at.saturating_duration_since(Instant::now()))
            .unwrap_or(Duration::ZERO)
    }

    /// The backoff applied by the most recent failure, or the minimum.
    pub fn current_backoff(&self) -> Duration {
        self.state.lock().current_backoff
    }

    /// When the node was last handed a request.
    pub fn last_used(&self) -> Option<Instant> {
        self.state.lock().last_used
    }

    /// Record that a request is being sent to this node.
    pub fn mark_used(&self) {
        self.state.lock().last_used = Some(Instant::now());
    }

    /// Record a failed attempt: double the backoff (capped) and start the window.
    ///
    /// Returns the backoff now in effect.
    pub fn mark_failure(&self, kind: FailureKind) -> Duration {
        let mut state = self.state.lock();
        let now = Instant::now();

        state.current_backoff = state
            .current_backoff
            .saturating_mul(2)
            .min(self.config.max_backoff);
        state.total_failures += 1;
        if kind == FailureKind::Transport {
            state.bad_status_count = state.bad_status_count.saturating_add(1);
        }

        let mut window = state.current_backoff;
        if state.bad_status_count > self.config.bad_status_threshold {
            window += self.config.max_backoff;
        }
        state.readmit_at = Some(now + window);

        debug!(
            address = %self.address,
            account = ?self.account_id,
            ?kind,
            backoff_ms = state.current_backoff.as_millis() as u64,
            bad_status_count = state.bad_status_count,
            "Node entered backoff"
        );
        state.current_backoff
    }

    /// Record a successful attempt: reset backoff and the bad-status count.
    pub fn mark_success(&self) {
        let mut state = self.state.lock();
        state.current_backoff = self.config.min_backoff;
        state.readmit_at = None;
        state.bad_status_count = 0;
        state.total_successes += 1;
    }

    /// Snapshot of the health state.
    pub fn health(&self) -> NodeHealth {
        let state = self.state.lock();
        let now = Instant::now();
        let remaining = state
            .readmit_at
            .map(|at| at.saturating_duration_since(now))
            .unwrap_or(Duration::ZERO);
        NodeHealth {
            healthy: remaining.is_zero(),
            current_backoff: state.current_backoff,
            remaining_backoff: remaining,
            bad_status_count: state.bad_status_count,
            total_successes: state.total_successes,
            total_failures: state.total_failures,
        }
    }
}

impl fmt::Debug for ManagedNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedNode")
            .field("address", &self.address)
            .field("account_id", &self.account_id)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_node() -> ManagedNode {
        ManagedNode::consensus(
            AccountId::from_num(3),
            "127.0.0.1:50211".parse().unwrap(),
            HealthConfig {
                min_backoff: Duration::from_millis(100),
                max_backoff: Duration::from_millis(1000),
                bad_status_threshold: 3,
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_new_node_is_healthy() {
        let node = test_node();
        assert!(node.is_healthy());
        assert_eq!(node.current_backoff(), Duration::from_millis(100));
        assert_eq!(node.remaining_backoff(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_doubles_and_caps() {
        let node = test_node();
        for k in 1..=6u32 {
            node.mark_failure(FailureKind::Transient);
            let expected = (100u64 * 2u64.pow(k)).min(1000);
            assert_eq!(node.current_backoff(), Duration::from_millis(expected));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_backoff() {
        let node = test_node();
        node.mark_failure(FailureKind::Transport);
        node.mark_failure(FailureKind::Transport);
        assert!(!node.is_healthy());
        assert_eq!(node.health().bad_status_count, 2);

        node.mark_success();
        assert!(node.is_healthy());
        assert_eq!(node.current_backoff(), Duration::from_millis(100));
        assert_eq!(node.health().bad_status_count, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_readmitted_after_backoff_elapses() {
        let node = test_node();
        node.mark_failure(FailureKind::Transient);
        assert!(!node.is_healthy());

        tokio::time::advance(Duration::from_millis(199)).await;
        assert!(!node.is_healthy());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(node.is_healthy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_status_threshold_adds_penalty() {
        let node = test_node();
        for _ in 0..3 {
            node.mark_failure(FailureKind::Transport);
        }
        // Count == threshold: plain backoff window.
        assert_eq!(node.remaining_backoff(), Duration::from_millis(800));

        node.mark_failure(FailureKind::Transport);
        // Count > threshold: backoff (capped at 1000) plus max_backoff.
        assert_eq!(node.remaining_backoff(), Duration::from_millis(2000));

        // Still readmitted eventually.
        tokio::time::advance(Duration::from_millis(2000)).await;
        assert!(node.is_healthy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_do_not_count_as_bad_status() {
        let node = test_node();
        node.mark_failure(FailureKind::Transient);
        assert_eq!(node.health().bad_status_count, 0);
        assert_eq!(node.health().total_failures, 1);
    }
}

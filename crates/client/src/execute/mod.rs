//! Generic request execution with node selection, retry and backoff.
//!
//! Every unary call (transaction submission, receipt and record queries) goes
//! through [`execute`]. A request describes itself through [`Execute`]:
//! which nodes it may go to, how to build the payload for one node and how to
//! classify that node's answer. The loop owns everything else:
//!
//! - picking the next candidate, healthy nodes first, never repeating a node
//!   within a round
//! - a per-attempt deadline bounded by the overall call deadline
//! - penalizing nodes on transport failures and transient precheck statuses
//! - sleeping the node's backoff between attempts
//! - stopping immediately on terminal statuses

mod backoff;
mod retry;
mod select;

pub(crate) use retry::execute;

use crate::Error;
use bytes::Bytes;
use ledgerlink_types::{AccountId, TransactionId};
use std::sync::atomic::{AtomicU64, Ordering};

/// How a node's answer to one attempt should be handled.
#[derive(Debug)]
pub enum Outcome<R> {
    /// The request is complete.
    Done(R),

    /// The node could not serve the request right now (busy, not active).
    /// The node is penalized and another attempt is made.
    Transient(Error),

    /// The node answered but the result is not available yet (e.g. a receipt
    /// that has not reached consensus). Retried without penalizing the node.
    Pending(Error),

    /// The request failed for a reason retrying cannot fix.
    Fail(Error),
}

/// A request the executor can run against consensus nodes.
pub trait Execute: Send + Sync {
    /// Value produced on success.
    type Response: Send;

    /// Short description for log fields.
    fn describe(&self) -> String;

    /// Nodes the request is restricted to, in preference order.
    ///
    /// `None` lets the executor choose from the whole network.
    fn node_account_ids(&self) -> Option<&[AccountId]>;

    /// Transaction the request concerns, if any.
    fn transaction_id(&self) -> Option<TransactionId> {
        None
    }

    /// gRPC method path.
    fn path(&self) -> &'static str;

    /// Encoded request for `node`.
    fn make_request(&self, node: AccountId) -> Result<Bytes, Error>;

    /// Classify the response `node` returned.
    fn handle_response(&self, node: AccountId, response: Bytes) -> Outcome<Self::Response>;
}

/// Executor counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutorStats {
    /// Attempts sent to a node.
    pub attempts: u64,
    /// Attempts after the first one of a call.
    pub retries: u64,
    /// Sleeps between attempts.
    pub backoff_sleeps: u64,
}

#[derive(Debug, Default)]
pub(crate) struct StatsCounters {
    attempts: AtomicU64,
    retries: AtomicU64,
    backoff_sleeps: AtomicU64,
}

impl StatsCounters {
    pub(crate) fn record_attempt(&self, retry: bool) {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        if retry {
            self.retries.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_sleep(&self) {
        self.backoff_sleeps.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> ExecutorStats {
        ExecutorStats {
            attempts: self.attempts.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            backoff_sleeps: self.backoff_sleeps.load(Ordering::Relaxed),
        }
    }
}

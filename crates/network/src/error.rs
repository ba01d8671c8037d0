//! Network error types.

use ledgerlink_types::{AccountId, NodeAddress};

/// Failure of a single call or connection attempt against one node.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The node could not be reached or dropped the connection.
    #[error("node unavailable: {0}")]
    Unavailable(String),

    /// The call did not complete within its per-attempt deadline.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The node asked us to slow down.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Establishing the channel failed.
    #[error("connection to {address} failed: {reason}")]
    Connect {
        /// Address we tried to connect to.
        address: NodeAddress,
        /// Underlying error.
        reason: String,
    },

    /// The TLS certificate of a secure endpoint could not be fetched.
    ///
    /// Reported separately from [`TransportError::Connect`] so callers can tell
    /// an unreachable node from one whose identity could not be established.
    #[error("certificate retrieval from {address} failed: {reason}")]
    CertificateRetrieval {
        /// Address that was probed.
        address: NodeAddress,
        /// Underlying error.
        reason: String,
    },

    /// Any other gRPC status.
    #[error("grpc status {code:?}: {message}")]
    Status {
        /// gRPC status code.
        code: tonic::Code,
        /// Status message sent by the node.
        message: String,
    },

    /// The node was dropped from the network by a reconfiguration.
    #[error("node {0} is no longer part of the network")]
    NodeRemoved(NodeAddress),

    /// The network or pool has been closed.
    #[error("network closed")]
    Closed,
}

impl TransportError {
    /// Whether the failure is a property of the node or the path to it, so the
    /// call may succeed elsewhere or later. Retryable failures penalise node health.
    pub fn is_retryable(&self) -> bool {
        match self {
            TransportError::Unavailable(_)
            | TransportError::DeadlineExceeded
            | TransportError::ResourceExhausted(_)
            | TransportError::Connect { .. }
            | TransportError::CertificateRetrieval { .. }
            | TransportError::NodeRemoved(_) => true,
            TransportError::Status { .. } | TransportError::Closed => false,
        }
    }

    /// Map a gRPC status to a transport error.
    pub fn from_status(status: tonic::Status) -> Self {
        match status.code() {
            tonic::Code::Unavailable => TransportError::Unavailable(status.message().to_string()),
            tonic::Code::DeadlineExceeded => TransportError::DeadlineExceeded,
            tonic::Code::ResourceExhausted => {
                TransportError::ResourceExhausted(status.message().to_string())
            }
            code => TransportError::Status {
                code,
                message: status.message().to_string(),
            },
        }
    }
}

impl From<tonic::Status> for TransportError {
    fn from(status: tonic::Status) -> Self {
        TransportError::from_status(status)
    }
}

/// Errors from network configuration operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetworkError {
    /// Node account ids span more than one shard/realm.
    #[error("node {found} is outside partition {}.{}", expected.0, expected.1)]
    MixedPartitions {
        /// Partition of the first node seen.
        expected: (u64, u64),
        /// First node found in a different partition.
        found: AccountId,
    },

    /// A node was listed without any address.
    #[error("node {0} has no addresses")]
    NoAddresses(AccountId),

    /// The same address was listed under two different nodes.
    #[error("address {address} listed for both {first} and {second}")]
    DuplicateAddress {
        /// The shared address.
        address: NodeAddress,
        /// First node claiming it.
        first: AccountId,
        /// Second node claiming it.
        second: AccountId,
    },

    /// The network has been closed.
    #[error("network closed")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(
            TransportError::from(tonic::Status::unavailable("down")),
            TransportError::Unavailable(_)
        ));
        assert!(matches!(
            TransportError::from(tonic::Status::deadline_exceeded("slow")),
            TransportError::DeadlineExceeded
        ));
        assert!(matches!(
            TransportError::from(tonic::Status::invalid_argument("bad")),
            TransportError::Status {
                code: tonic::Code::InvalidArgument,
                ..
            }
        ));
    }

    #[test]
    fn test_retryable_classification() {
        let address: NodeAddress = "127.0.0.1:50212".parse().unwrap();
        assert!(TransportError::DeadlineExceeded.is_retryable());
        assert!(TransportError::CertificateRetrieval {
            address,
            reason: "timeout".into()
        }
        .is_retryable());
        assert!(!TransportError::Closed.is_retryable());
        assert!(!TransportError::Status {
            code: tonic::Code::PermissionDenied,
            message: String::new()
        }
        .is_retryable());
    }
}

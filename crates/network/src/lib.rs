//! Node management and transport for ledgerlink.
//!
//! This crate owns everything between "send these bytes to some node" and the
//! socket:
//!
//! - [`Transport`]: the seam for opening channels and issuing calls
//! - [`GrpcTransport`]: tonic implementation with certificate pinning on TLS ports
//! - [`ChannelPool`]: bounded, round-robin channel reuse per address
//! - [`ManagedNode`]: per-node health and exponential backoff
//! - [`ManagedNetwork`]: node indexing, reconfiguration and selection
//!
//! Retry policy lives one layer up, in the client's executor.

mod error;
mod grpc;
mod network;
mod node;
mod pool;
mod traits;

pub use error::{NetworkError, TransportError};
pub use grpc::{probe_certificate, CertificateCache, GrpcConfig, GrpcTransport, RawCodec};
pub use network::{ManagedNetwork, NetworkChange, NetworkConfig};
pub use node::{FailureKind, HealthConfig, ManagedNode, NodeHealth, NodeKind};
pub use pool::ChannelPool;
pub use traits::{ResponseStream, Transport};

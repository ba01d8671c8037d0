//! Transport trait for issuing calls to ledger nodes.
//!
//! Defines the seam between node management (pooling, health, selection) and
//! the wire. Production uses [`GrpcTransport`](crate::GrpcTransport); tests plug
//! in a scripted transport.

use crate::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use ledgerlink_types::NodeAddress;

/// Stream of server-streamed response messages.
pub type ResponseStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// A way of opening channels to node addresses and issuing calls over them.
///
/// Payloads are opaque encoded messages; paths have the form
/// `/<package>.<Service>/<method>`.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// A live connection. Cloning must be cheap and yield a handle to the same
    /// underlying connection.
    type Channel: Clone + Send + Sync + 'static;

    /// Open a channel to `address`.
    async fn connect(&self, address: &NodeAddress) -> Result<Self::Channel, TransportError>;

    /// Issue a unary call.
    async fn unary(
        &self,
        channel: &Self::Channel,
        path: &str,
        request: Bytes,
    ) -> Result<Bytes, TransportError>;

    /// Issue a server-streaming call.
    async fn server_streaming(
        &self,
        channel: &Self::Channel,
        path: &str,
        request: Bytes,
    ) -> Result<ResponseStream, TransportError>;

    /// Release a channel that the pool is forgetting.
    ///
    /// The default drops it, which closes a tonic channel once every clone is gone.
    fn close(&self, channel: Self::Channel) {
        drop(channel);
    }
}

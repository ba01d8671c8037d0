//! gRPC transport backed by tonic.

mod codec;
mod tls;

pub use codec::RawCodec;
pub use tls::{probe_certificate, CertificateCache};

use crate::traits::{ResponseStream, Transport};
use crate::TransportError;
use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use ledgerlink_types::NodeAddress;
use std::time::Duration;
use tonic::codegen::http::uri::PathAndQuery;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

/// Configuration for [`GrpcTransport`].
#[derive(Debug, Clone)]
pub struct GrpcConfig {
    /// Timeout for establishing a TCP (and TLS) connection.
    pub connect_timeout: Duration,

    /// Timeout for the one-off certificate probe against secure ports.
    /// Independent of any request deadline.
    pub cert_probe_timeout: Duration,

    /// HTTP/2 keepalive ping interval.
    pub keepalive_interval: Duration,
}

impl Default for GrpcConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            cert_probe_timeout: Duration::from_secs(10),
            keepalive_interval: Duration::from_secs(30),
        }
    }
}

/// Transport issuing raw-bytes gRPC calls over tonic channels.
///
/// Addresses on the reserved TLS ports are connected with certificate pinning
/// (see [`CertificateCache`]); all others use plaintext HTTP/2.
pub struct GrpcTransport {
    config: GrpcConfig,
    certs: CertificateCache,
}

impl GrpcTransport {
    /// Create a transport with the given configuration.
    pub fn new(config: GrpcConfig) -> Self {
        Self {
            config,
            certs: CertificateCache::new(),
        }
    }

    /// Certificates pinned so far.
    pub fn certificates(&self) -> &CertificateCache {
        &self.certs
    }

    fn endpoint(&self, address: &NodeAddress) -> Result<Endpoint, TransportError> {
        // The scheme is always http: TLS for pinned addresses happens inside the connector.
        let endpoint = Endpoint::from_shared(format!("http://{address}")).map_err(|e| {
            TransportError::Connect {
                address: address.clone(),
                reason: e.to_string(),
            }
        })?;
        Ok(endpoint
            .connect_timeout(self.config.connect_timeout)
            .http2_keep_alive_interval(self.config.keepalive_interval)
            .keep_alive_while_idle(true))
    }

    fn path(path: &str) -> Result<PathAndQuery, TransportError> {
        PathAndQuery::try_from(path).map_err(|e| TransportError::Status {
            code: tonic::Code::InvalidArgument,
            message: format!("invalid method path `{path}`: {e}"),
        })
    }
}

impl Default for GrpcTransport {
    fn default() -> Self {
        Self::new(GrpcConfig::default())
    }
}

#[async_trait]
impl Transport for GrpcTransport {
    type Channel = Channel;

    async fn connect(&self, address: &NodeAddress) -> Result<Channel, TransportError> {
        let endpoint = self.endpoint(address)?;
        let connect_failed = |e: tonic::transport::Error| TransportError::Connect {
            address: address.clone(),
            reason: e.to_string(),
        };

        if address.is_tls() {
            let cert = self
                .certs
                .get_or_probe(address, self.config.cert_probe_timeout)
                .await?;
            let connector = tls::pinned_connector(address, cert)?;
            debug!(%address, "Connecting with pinned certificate");
            let channel = endpoint.connect_with_connector(connector).await.map_err(|e| {
                // The node may have rotated its certificate; probe again next time.
                self.certs.invalidate(address);
                connect_failed(e)
            })?;
            Ok(channel)
        } else {
            debug!(%address, "Connecting");
            endpoint.connect().await.map_err(connect_failed)
        }
    }

    async fn unary(
        &self,
        channel: &Channel,
        path: &str,
        request: Bytes,
    ) -> Result<Bytes, TransportError> {
        let path = Self::path(path)?;
        let mut grpc = tonic::client::Grpc::new(channel.clone());
        grpc.ready()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;
        let response = grpc
            .unary(tonic::Request::new(request), path, RawCodec)
            .await?;
        Ok(response.into_inner())
    }

    async fn server_streaming(
        &self,
        channel: &Channel,
        path: &str,
        request: Bytes,
    ) -> Result<ResponseStream, TransportError> {
        let path = Self::path(path)?;
        let mut grpc = tonic::client::Grpc::new(channel.clone());
        grpc.ready()
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;
        let response = grpc
            .server_streaming(tonic::Request::new(request), path, RawCodec)
            .await?;
        Ok(response
            .into_inner()
            .map(|item| item.map_err(TransportError::from_status))
            .boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_paths() {
        assert!(GrpcTransport::path("/proto.CryptoService/cryptoTransfer").is_ok());
        assert!(GrpcTransport::path("no spaces allowed here").is_err());
    }

    #[tokio::test]
    async fn test_probe_unreachable_reports_certificate_error() {
        // Port 9 (discard) on localhost is closed in test environments.
        let address: NodeAddress = "127.0.0.1:9".parse().unwrap();
        let err = probe_certificate(&address, Duration::from_millis(500))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::CertificateRetrieval { .. }));
    }
}

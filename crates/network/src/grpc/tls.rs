//! Certificate pinning for secure node ports.
//!
//! Nodes on the reserved TLS ports present self-signed certificates. The first
//! connection to such an address runs a short probe handshake that accepts any
//! certificate and records the one presented; later channels only complete a
//! handshake if the node presents exactly that certificate.

use crate::TransportError;
use dashmap::DashMap;
use hyper_util::rt::TokioIo;
use ledgerlink_types::NodeAddress;
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::crypto::{verify_tls12_signature, verify_tls13_signature, CryptoProvider};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{CertificateError, DigitallySignedStruct, SignatureScheme};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;
use tonic::codegen::http::Uri;
use tracing::{debug, warn};

fn provider() -> Arc<CryptoProvider> {
    Arc::new(rustls::crypto::ring::default_provider())
}

/// Verifier that accepts either any certificate (probe) or one pinned certificate.
#[derive(Debug)]
struct PinnedVerifier {
    pinned: Option<CertificateDer<'static>>,
    provider: Arc<CryptoProvider>,
}

impl ServerCertVerifier for PinnedVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        _intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        match &self.pinned {
            None => Ok(ServerCertVerified::assertion()),
            Some(pinned) if pinned.as_ref() == end_entity.as_ref() => {
                Ok(ServerCertVerified::assertion())
            }
            Some(_) => Err(rustls::Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            )),
        }
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls12_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        verify_tls13_signature(
            message,
            cert,
            dss,
            &self.provider.signature_verification_algorithms,
        )
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.provider
            .signature_verification_algorithms
            .supported_schemes()
    }
}

fn client_config(
    pinned: Option<CertificateDer<'static>>,
) -> Result<Arc<rustls::ClientConfig>, rustls::Error> {
    let provider = provider();
    let verifier = PinnedVerifier {
        pinned,
        provider: provider.clone(),
    };
    let mut config = rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()?
        .dangerous()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();
    config.alpn_protocols = vec![b"h2".to_vec()];
    Ok(Arc::new(config))
}

fn server_name(address: &NodeAddress) -> Result<ServerName<'static>, String> {
    ServerName::try_from(address.host().to_string()).map_err(|e| e.to_string())
}

async fn handshake(
    address: &NodeAddress,
    config: Arc<rustls::ClientConfig>,
) -> std::io::Result<TlsStream<TcpStream>> {
    let name = server_name(address)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
    let tcp = TcpStream::connect((address.host(), address.port())).await?;
    TlsConnector::from(config).connect(name, tcp).await
}

/// Fetch the certificate presented by `address`, bounded by `timeout`.
pub async fn probe_certificate(
    address: &NodeAddress,
    timeout: Duration,
) -> Result<CertificateDer<'static>, TransportError> {
    let retrieval_failed = |reason: String| TransportError::CertificateRetrieval {
        address: address.clone(),
        reason,
    };

    let config = client_config(None).map_err(|e| retrieval_failed(e.to_string()))?;
    let stream = tokio::time::timeout(timeout, handshake(address, config))
        .await
        .map_err(|_| retrieval_failed(format!("probe timed out after {timeout:?}")))?
        .map_err(|e| retrieval_failed(e.to_string()))?;

    let (_, connection) = stream.get_ref();
    connection
        .peer_certificates()
        .and_then(|chain| chain.first())
        .map(|cert| cert.clone().into_owned())
        .ok_or_else(|| retrieval_failed("node presented no certificate".to_string()))
}

/// Certificates fetched from secure nodes, keyed by address.
#[derive(Default)]
pub struct CertificateCache {
    certs: DashMap<NodeAddress, CertificateDer<'static>>,
}

impl CertificateCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached certificate for `address`, probing the node if there is none.
    pub async fn get_or_probe(
        &self,
        address: &NodeAddress,
        timeout: Duration,
    ) -> Result<CertificateDer<'static>, TransportError> {
        if let Some(cert) = self.certs.get(address) {
            return Ok(cert.clone());
        }

        match probe_certificate(address, timeout).await {
            Ok(cert) => {
                debug!(%address, len = cert.len(), "Fetched node certificate");
                self.certs.insert(address.clone(), cert.clone());
                Ok(cert)
            }
            Err(e) => {
                warn!(%address, error = %e, "Certificate probe failed");
                Err(e)
            }
        }
    }

    /// Forget the certificate for `address`, e.g. after the node rotated it.
    pub fn invalidate(&self, address: &NodeAddress) {
        self.certs.remove(address);
    }

    /// Whether a certificate is cached for `address`.
    pub fn contains(&self, address: &NodeAddress) -> bool {
        self.certs.contains_key(address)
    }
}

/// Build a connector for tonic that only completes handshakes presenting `pinned`.
pub fn pinned_connector(
    address: &NodeAddress,
    pinned: CertificateDer<'static>,
) -> Result<
    impl tower::Service<
            Uri,
            Response = TokioIo<TlsStream<TcpStream>>,
            Error = std::io::Error,
            Future = impl std::future::Future<Output = std::io::Result<TokioIo<TlsStream<TcpStream>>>>
                         + Send
                         + 'static,
        > + Send
        + Clone
        + 'static,
    TransportError,
> {
    let config = client_config(Some(pinned)).map_err(|e| TransportError::Connect {
        address: address.clone(),
        reason: e.to_string(),
    })?;
    let address = address.clone();

    Ok(tower::service_fn(move |_uri: Uri| {
        let config = config.clone();
        let address = address.clone();
        async move { handshake(&address, config).await.map(TokioIo::new) }
    }))
}

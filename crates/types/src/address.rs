//! Node network addresses.

use crate::ParseError;
use std::fmt;
use std::str::FromStr;

/// Plaintext gRPC port of consensus nodes.
pub const CONSENSUS_PLAINTEXT_PORT: u16 = 50211;

/// TLS gRPC port of consensus nodes. Channels to this port pin the node certificate.
pub const CONSENSUS_TLS_PORT: u16 = 50212;

/// Plaintext port of mirror nodes.
pub const MIRROR_PLAINTEXT_PORT: u16 = 5600;

/// TLS port of mirror nodes.
pub const MIRROR_TLS_PORT: u16 = 443;

/// A `host:port` endpoint of a network node.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeAddress {
    host: String,
    port: u16,
}

impl NodeAddress {
    /// Create an address from its parts.
    ///
    /// Returns an error if `host` is empty.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self, ParseError> {
        let host = host.into();
        if host.is_empty() {
            return Err(ParseError::InvalidAddress(format!(":{port}")));
        }
        Ok(Self { host, port })
    }

    /// Host name or IP literal.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// TCP port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether this address uses one of the reserved TLS ports.
    pub fn is_tls(&self) -> bool {
        matches!(self.port, CONSENSUS_TLS_PORT | MIRROR_TLS_PORT)
    }

    /// The same host on the TLS port matching this address's plaintext port.
    pub fn to_tls(&self) -> Self {
        let port = match self.port {
            CONSENSUS_PLAINTEXT_PORT => CONSENSUS_TLS_PORT,
            MIRROR_PLAINTEXT_PORT => MIRROR_TLS_PORT,
            other => other,
        };
        Self {
            host: self.host.clone(),
            port,
        }
    }

    /// The same host on the plaintext port matching this address's TLS port.
    pub fn to_plaintext(&self) -> Self {
        let port = match self.port {
            CONSENSUS_TLS_PORT => CONSENSUS_PLAINTEXT_PORT,
            MIRROR_TLS_PORT => MIRROR_PLAINTEXT_PORT,
            other => other,
        };
        Self {
            host: self.host.clone(),
            port,
        }
    }

    /// URI suitable for building a gRPC endpoint.
    pub fn to_uri(&self) -> String {
        let scheme = if self.is_tls() { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

impl fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for NodeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeAddress({self})")
    }
}

impl FromStr for NodeAddress {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseError::InvalidAddress(s.to_string());
        let (host, port) = s.rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() || port.is_empty() {
            return Err(invalid());
        }
        let port = port.parse().map_err(|_| invalid())?;
        Ok(Self {
            host: host.to_string(),
            port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_requires_host_and_port() {
        let addr: NodeAddress = "0.testnet.example.com:50211".parse().unwrap();
        assert_eq!(addr.host(), "0.testnet.example.com");
        assert_eq!(addr.port(), 50211);

        assert!("localhost".parse::<NodeAddress>().is_err());
        assert!(":50211".parse::<NodeAddress>().is_err());
        assert!("localhost:".parse::<NodeAddress>().is_err());
        assert!("localhost:notaport".parse::<NodeAddress>().is_err());
    }

    #[test]
    fn test_tls_ports() {
        let plain: NodeAddress = "127.0.0.1:50211".parse().unwrap();
        assert!(!plain.is_tls());
        assert!(plain.to_tls().is_tls());
        assert_eq!(plain.to_tls().port(), CONSENSUS_TLS_PORT);
        assert_eq!(plain.to_tls().to_plaintext(), plain);
        assert_eq!(plain.to_uri(), "http://127.0.0.1:50211");
        assert_eq!(plain.to_tls().to_uri(), "https://127.0.0.1:50212");

        let mirror: NodeAddress = "mirror.example.com:443".parse().unwrap();
        assert!(mirror.is_tls());
        assert_eq!(mirror.to_plaintext().port(), MIRROR_PLAINTEXT_PORT);
    }
}

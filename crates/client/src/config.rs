//! Client configuration.
//!
//! Loaded from TOML; every field has a default so an empty file is valid.
//!
//! ```toml
//! [network]
//! preset = "testnet"           # or an explicit node map:
//! # nodes = { "0.0.3" = ["127.0.0.1:50211"] }
//! mirror = ["127.0.0.1:5600"]
//! min_backoff_ms = 250
//!
//! [execution]
//! max_attempts = 10
//! allow_receipt_node_failover = true
//!
//! [chunking]
//! chunk_size = 1024
//! max_chunks = 20
//! ```

use crate::error::ConfigError;
use ledgerlink_network::{GrpcConfig, HealthConfig, NetworkConfig as ManagedNetworkConfig};
use ledgerlink_types::{AccountId, NodeAddress};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Well-known networks with built-in address books.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkPreset {
    Testnet,
    Previewnet,
    #[serde(rename = "local")]
    LocalNode,
}

impl NetworkPreset {
    /// Consensus nodes of the preset.
    pub fn nodes(&self) -> HashMap<AccountId, Vec<NodeAddress>> {
        let entries: &[(u64, &str)] = match self {
            NetworkPreset::Testnet => &[
                (3, "0.testnet.hedera.com:50211"),
                (4, "1.testnet.hedera.com:50211"),
                (5, "2.testnet.hedera.com:50211"),
                (6, "3.testnet.hedera.com:50211"),
            ],
            NetworkPreset::Previewnet => &[
                (3, "0.previewnet.hedera.com:50211"),
                (4, "1.previewnet.hedera.com:50211"),
                (5, "2.previewnet.hedera.com:50211"),
                (6, "3.previewnet.hedera.com:50211"),
            ],
            NetworkPreset::LocalNode => &[(3, "127.0.0.1:50211")],
        };
        entries
            .iter()
            .filter_map(|(num, address)| {
                let address = address.parse().ok()?;
                Some((AccountId::from_num(*num), vec![address]))
            })
            .collect()
    }

    /// Mirror nodes of the preset.
    pub fn mirror_nodes(&self) -> Vec<NodeAddress> {
        let address = match self {
            NetworkPreset::Testnet => "testnet.mirrornode.hedera.com:443",
            NetworkPreset::Previewnet => "previewnet.mirrornode.hedera.com:443",
            NetworkPreset::LocalNode => "127.0.0.1:5600",
        };
        address.parse().into_iter().collect()
    }
}

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Node addresses and per-node transport settings.
    #[serde(default)]
    pub network: NetworkSection,

    /// Retry and submission behaviour.
    #[serde(default)]
    pub execution: ExecutionSection,

    /// Limits for chunked submissions.
    #[serde(default)]
    pub chunking: ChunkingSection,

    /// Operator account paying for transactions, if any.
    #[serde(default)]
    pub operator: Option<OperatorSection>,
}

/// `[network]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NetworkSection {
    /// Built-in address book; ignored for any part given explicitly.
    #[serde(default)]
    pub preset: Option<NetworkPreset>,

    /// Consensus nodes: account id to `host:port` list.
    #[serde(default)]
    pub nodes: HashMap<String, Vec<String>>,

    /// Mirror node addresses.
    #[serde(default)]
    pub mirror: Vec<String>,

    /// Live channels per node address.
    #[serde(default = "default_channels_per_node")]
    pub channels_per_node: usize,

    /// Backoff after a node's first failure is twice this.
    #[serde(default = "default_min_backoff_ms")]
    pub min_backoff_ms: u64,

    /// Ceiling for node backoff.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Transport failures before a node takes an extra penalty.
    #[serde(default = "default_bad_status_threshold")]
    pub bad_status_threshold: u32,

    /// Deadline for a single attempt against one node.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Connect timeout for new channels.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Timeout for the TLS certificate probe.
    #[serde(default = "default_cert_probe_timeout_ms")]
    pub cert_probe_timeout_ms: u64,

    /// Nodes a transaction is frozen for when the caller does not choose.
    #[serde(default = "default_max_nodes_per_transaction")]
    pub max_nodes_per_transaction: usize,
}

fn default_channels_per_node() -> usize {
    1
}

fn default_min_backoff_ms() -> u64 {
    250
}

fn default_max_backoff_ms() -> u64 {
    8_000
}

fn default_bad_status_threshold() -> u32 {
    10
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn default_cert_probe_timeout_ms() -> u64 {
    10_000
}

fn default_max_nodes_per_transaction() -> usize {
    3
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            preset: None,
            nodes: HashMap::new(),
            mirror: Vec::new(),
            channels_per_node: default_channels_per_node(),
            min_backoff_ms: default_min_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            bad_status_threshold: default_bad_status_threshold(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            cert_probe_timeout_ms: default_cert_probe_timeout_ms(),
            max_nodes_per_transaction: default_max_nodes_per_transaction(),
        }
    }
}

/// `[execution]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExecutionSection {
    /// Attempts per call across all nodes.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Deadline for a whole call, including backoff sleeps.
    #[serde(default = "default_overall_timeout_ms")]
    pub overall_timeout_ms: u64,

    /// Let receipt and record queries fall back to other nodes.
    #[serde(default)]
    pub allow_receipt_node_failover: bool,

    /// Generate transaction ids from the operator when freezing.
    #[serde(default = "default_auto_generate_transaction_id")]
    pub auto_generate_transaction_id: bool,

    /// Fee ceiling for transactions that do not set one.
    #[serde(default = "default_max_transaction_fee")]
    pub default_max_transaction_fee: u64,

    /// Payment attached to paid queries.
    #[serde(default = "default_query_payment")]
    pub default_query_payment: u64,
}

fn default_max_attempts() -> u32 {
    10
}

fn default_overall_timeout_ms() -> u64 {
    120_000
}

fn default_auto_generate_transaction_id() -> bool {
    true
}

fn default_max_transaction_fee() -> u64 {
    200_000_000
}

fn default_query_payment() -> u64 {
    100_000_000
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            overall_timeout_ms: default_overall_timeout_ms(),
            allow_receipt_node_failover: false,
            auto_generate_transaction_id: default_auto_generate_transaction_id(),
            default_max_transaction_fee: default_max_transaction_fee(),
            default_query_payment: default_query_payment(),
        }
    }
}

/// `[chunking]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChunkingSection {
    /// Bytes of content per chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Most chunks a single submission may be split into.
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,
}

fn default_chunk_size() -> usize {
    1024
}

fn default_max_chunks() -> usize {
    20
}

impl Default for ChunkingSection {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_chunks: default_max_chunks(),
        }
    }
}

/// `[operator]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperatorSection {
    /// Paying account, `shard.realm.num`.
    pub account_id: String,

    /// Hex encoded Ed25519 private key.
    pub private_key: String,
}

/// Execution settings resolved from [`ExecutionSection`] and the network timeouts.
#[derive(Debug, Clone)]
pub struct ExecutionSettings {
    pub max_attempts: u32,
    pub overall_timeout: Duration,
    pub request_timeout: Duration,
    pub min_backoff: Duration,
    pub max_backoff: Duration,
    pub allow_receipt_node_failover: bool,
    pub auto_generate_transaction_id: bool,
    pub default_max_transaction_fee: u64,
    pub default_query_payment: u64,
    pub max_nodes_per_transaction: usize,
    pub chunk_size: usize,
    pub max_chunks: usize,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        ClientConfig::default().execution_settings()
    }
}

impl ClientConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration for a preset network with default settings.
    pub fn for_preset(preset: NetworkPreset) -> Self {
        let mut config = Self::default();
        config.network.preset = Some(preset);
        config
    }

    /// Reject settings no client can run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &str, reason: &str| ConfigError::Invalid {
            field: field.to_string(),
            reason: reason.to_string(),
        };
        if self.network.min_backoff_ms == 0 {
            return Err(invalid("network.min_backoff_ms", "must be positive"));
        }
        if self.network.min_backoff_ms > self.network.max_backoff_ms {
            return Err(invalid(
                "network.max_backoff_ms",
                "must not be below min_backoff_ms",
            ));
        }
        if self.execution.max_attempts == 0 {
            return Err(invalid("execution.max_attempts", "must be positive"));
        }
        if self.chunking.chunk_size == 0 {
            return Err(invalid("chunking.chunk_size", "must be positive"));
        }
        if self.chunking.max_chunks == 0 {
            return Err(invalid("chunking.max_chunks", "must be positive"));
        }
        Ok(())
    }

    /// Consensus node map: explicit `nodes` if given, else the preset's.
    pub fn node_map(&self) -> Result<HashMap<AccountId, Vec<NodeAddress>>, ConfigError> {
        if self.network.nodes.is_empty() {
            return Ok(self.network.preset.map(|p| p.nodes()).unwrap_or_default());
        }
        self.network
            .nodes
            .iter()
            .map(|(account, addresses)| {
                let field = format!("network.nodes.{account}");
                let account: AccountId = account.parse().map_err(|e| ConfigError::Invalid {
                    field: field.clone(),
                    reason: format!("{e}"),
                })?;
                let addresses = addresses
                    .iter()
                    .map(|a| {
                        a.parse().map_err(|e| ConfigError::Invalid {
                            field: field.clone(),
                            reason: format!("{e}"),
                        })
                    })
                    .collect::<Result<Vec<NodeAddress>, _>>()?;
                Ok((account, addresses))
            })
            .collect()
    }

    /// Mirror node list: explicit `mirror` if given, else the preset's.
    pub fn mirror_addresses(&self) -> Result<Vec<NodeAddress>, ConfigError> {
        if self.network.mirror.is_empty() {
            return Ok(self
                .network
                .preset
                .map(|p| p.mirror_nodes())
                .unwrap_or_default());
        }
        self.network
            .mirror
            .iter()
            .map(|a| {
                a.parse().map_err(|e| ConfigError::Invalid {
                    field: "network.mirror".to_string(),
                    reason: format!("{e}"),
                })
            })
            .collect()
    }

    /// Settings for the managed networks.
    pub fn managed_network_config(&self) -> ManagedNetworkConfig {
        ManagedNetworkConfig {
            channels_per_node: self.network.channels_per_node,
            health: HealthConfig {
                min_backoff: Duration::from_millis(self.network.min_backoff_ms),
                max_backoff: Duration::from_millis(self.network.max_backoff_ms),
                bad_status_threshold: self.network.bad_status_threshold,
            },
        }
    }

    /// Settings for the gRPC transport.
    pub fn grpc_config(&self) -> GrpcConfig {
        GrpcConfig {
            connect_timeout: Duration::from_millis(self.network.connect_timeout_ms),
            cert_probe_timeout: Duration::from_millis(self.network.cert_probe_timeout_ms),
            ..GrpcConfig::default()
        }
    }

    /// Settings for the executor and transaction defaults.
    pub fn execution_settings(&self) -> ExecutionSettings {
        ExecutionSettings {
            max_attempts: self.execution.max_attempts,
            overall_timeout: Duration::from_millis(self.execution.overall_timeout_ms),
            request_timeout: Duration::from_millis(self.network.request_timeout_ms),
            min_backoff: Duration::from_millis(self.network.min_backoff_ms),
            max_backoff: Duration::from_millis(self.network.max_backoff_ms),
            allow_receipt_node_failover: self.execution.allow_receipt_node_failover,
            auto_generate_transaction_id: self.execution.auto_generate_transaction_id,
            default_max_transaction_fee: self.execution.default_max_transaction_fee,
            default_query_payment: self.execution.default_query_payment,
            max_nodes_per_transaction: self.network.max_nodes_per_transaction,
            chunk_size: self.chunking.chunk_size,
            max_chunks: self.chunking.max_chunks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ClientConfig::from_toml_str("").unwrap();
        assert_eq!(config.network.channels_per_node, 1);
        assert_eq!(config.execution.max_attempts, 10);
        assert_eq!(config.chunking.chunk_size, 1024);
        assert_eq!(config.chunking.max_chunks, 20);
        assert!(!config.execution.allow_receipt_node_failover);
        assert!(config.node_map().unwrap().is_empty());
    }

    #[test]
    fn test_explicit_nodes_override_preset() {
        let config = ClientConfig::from_toml_str(
            r#"
            [network]
            preset = "testnet"
            nodes = { "0.0.3" = ["127.0.0.1:50211", "127.0.0.2:50211"] }
            min_backoff_ms = 100
            max_backoff_ms = 1000

            [execution]
            allow_receipt_node_failover = true
            "#,
        )
        .unwrap();

        let nodes = config.node_map().unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[&AccountId::from_num(3)].len(), 2);
        // Mirror list still comes from the preset.
        assert_eq!(
            config.mirror_addresses().unwrap(),
            vec!["testnet.mirrornode.hedera.com:443".parse().unwrap()]
        );

        let settings = config.execution_settings();
        assert!(settings.allow_receipt_node_failover);
        assert_eq!(settings.min_backoff, Duration::from_millis(100));
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = ClientConfig::from_toml_str(
            r#"
            [network]
            min_backoff_ms = 500
            max_backoff_ms = 100
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref field, .. } if field == "network.max_backoff_ms"));

        assert!(matches!(
            ClientConfig::from_toml_str("[network]\nbogus = 1"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_bad_node_entries_reported() {
        let config = ClientConfig::from_toml_str(
            r#"
            [network]
            nodes = { "not-an-id" = ["127.0.0.1:50211"] }
            "#,
        )
        .unwrap();
        assert!(matches!(
            config.node_map(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn test_presets() {
        assert_eq!(NetworkPreset::Testnet.nodes().len(), 4);
        let local = NetworkPreset::LocalNode.nodes();
        assert_eq!(
            local[&AccountId::from_num(3)],
            vec!["127.0.0.1:50211".parse().unwrap()]
        );
        assert_eq!(
            NetworkPreset::LocalNode.mirror_nodes(),
            vec!["127.0.0.1:5600".parse().unwrap()]
        );
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("client.toml");
        std::fs::write(
            &path,
            "[network]\npreset = \"local\"\n\n[chunking]\nmax_chunks = 5\n",
        )
        .unwrap();

        let config = ClientConfig::from_file(&path).unwrap();
        assert_eq!(config.network.preset, Some(NetworkPreset::LocalNode));
        assert_eq!(config.chunking.max_chunks, 5);

        assert!(matches!(
            ClientConfig::from_file(dir.path().join("missing.toml")),
            Err(ConfigError::Io { .. })
        ));
    }
}

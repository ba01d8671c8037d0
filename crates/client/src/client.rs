//! The client: networks, operator and execution settings.

use crate::config::{ClientConfig, ExecutionSettings, NetworkPreset};
use crate::execute::{ExecutorStats, StatsCounters};
use crate::{ConfigError, Error};
use ledgerlink_network::{
    GrpcTransport, ManagedNetwork, NetworkChange, NetworkConfig, Transport,
};
use ledgerlink_types::{AccountId, Ed25519Signer, NodeAddress, PublicKey, Signer};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Account paying for transactions and queries, with its signing key.
#[derive(Clone)]
pub(crate) struct Operator {
    pub(crate) account_id: AccountId,
    pub(crate) signer: Arc<dyn Signer>,
}

impl fmt::Debug for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Operator")
            .field("account_id", &self.account_id)
            .field("public_key", &self.signer.public_key())
            .finish()
    }
}

struct ClientInner<T: Transport> {
    network: ManagedNetwork<T>,
    mirror: ManagedNetwork<T>,
    operator: RwLock<Option<Operator>>,
    settings: RwLock<ExecutionSettings>,
    stats: StatsCounters,
}

/// Entry point for talking to a ledger network.
///
/// Cheap to clone; clones share networks, channels and node health.
pub struct Client<T: Transport = GrpcTransport> {
    inner: Arc<ClientInner<T>>,
}

impl<T: Transport> Clone for Client<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("nodes", &self.inner.network.len())
            .field("mirror_nodes", &self.inner.mirror.len())
            .field("operator", &*self.inner.operator.read())
            .finish()
    }
}

impl Client<GrpcTransport> {
    /// Client over gRPC configured from `config`.
    pub fn from_config(config: &ClientConfig) -> Result<Self, Error> {
        let transport = Arc::new(GrpcTransport::new(config.grpc_config()));
        Self::with_transport(transport, config)
    }

    /// Client for a well-known network with default settings.
    pub fn for_preset(preset: NetworkPreset) -> Result<Self, Error> {
        Self::from_config(&ClientConfig::for_preset(preset))
    }

    pub fn for_testnet() -> Result<Self, Error> {
        Self::for_preset(NetworkPreset::Testnet)
    }

    pub fn for_previewnet() -> Result<Self, Error> {
        Self::for_preset(NetworkPreset::Previewnet)
    }

    pub fn for_local_node() -> Result<Self, Error> {
        Self::for_preset(NetworkPreset::LocalNode)
    }
}

impl<T: Transport> Client<T> {
    /// Client over `transport` configured from `config`.
    pub fn with_transport(transport: Arc<T>, config: &ClientConfig) -> Result<Self, Error> {
        config.validate()?;
        let network_config: NetworkConfig = config.managed_network_config();
        let network = ManagedNetwork::consensus(Arc::clone(&transport), network_config.clone());
        let mirror = ManagedNetwork::mirror(transport, network_config);

        network.set_network(&config.node_map()?)?;
        mirror.set_mirror_network(&config.mirror_addresses()?)?;

        let operator = match &config.operator {
            Some(section) => Some(Operator {
                account_id: section.account_id.parse().map_err(|e| ConfigError::Invalid {
                    field: "operator.account_id".to_string(),
                    reason: format!("{e}"),
                })?,
                signer: Arc::new(section.private_key.parse::<Ed25519Signer>().map_err(|e| {
                    ConfigError::Invalid {
                        field: "operator.private_key".to_string(),
                        reason: format!("{e}"),
                    }
                })?),
            }),
            None => None,
        };

        info!(
            nodes = network.len(),
            mirror_nodes = mirror.len(),
            operator = ?operator.as_ref().map(|o| o.account_id),
            "Client created"
        );

        Ok(Self {
            inner: Arc::new(ClientInner {
                network,
                mirror,
                operator: RwLock::new(operator),
                settings: RwLock::new(config.execution_settings()),
                stats: StatsCounters::default(),
            }),
        })
    }

    /// Consensus nodes.
    pub fn network(&self) -> &ManagedNetwork<T> {
        &self.inner.network
    }

    /// Mirror nodes.
    pub fn mirror_network(&self) -> &ManagedNetwork<T> {
        &self.inner.mirror
    }

    /// Replace the consensus node set, keeping nodes that did not change.
    pub fn set_network(
        &self,
        network: &HashMap<AccountId, Vec<NodeAddress>>,
    ) -> Result<NetworkChange, Error> {
        Ok(self.inner.network.set_network(network)?)
    }

    /// Replace the mirror node set.
    pub fn set_mirror_network(&self, addresses: &[NodeAddress]) -> Result<NetworkChange, Error> {
        Ok(self.inner.mirror.set_mirror_network(addresses)?)
    }

    /// Set the account that pays for transactions and signs them by default.
    pub fn set_operator(&self, account_id: AccountId, signer: impl Signer + 'static) {
        *self.inner.operator.write() = Some(Operator {
            account_id,
            signer: Arc::new(signer),
        });
    }

    pub fn operator_account_id(&self) -> Option<AccountId> {
        self.inner.operator.read().as_ref().map(|o| o.account_id)
    }

    pub fn operator_public_key(&self) -> Option<PublicKey> {
        self.inner
            .operator
            .read()
            .as_ref()
            .map(|o| o.signer.public_key())
    }

    pub(crate) fn operator(&self) -> Option<Operator> {
        self.inner.operator.read().clone()
    }

    /// Snapshot of the execution settings.
    pub fn execution_settings(&self) -> ExecutionSettings {
        self.inner.settings.read().clone()
    }

    /// Change execution settings in place.
    pub fn update_settings(&self, update: impl FnOnce(&mut ExecutionSettings)) {
        update(&mut self.inner.settings.write());
    }

    pub fn set_max_attempts(&self, max_attempts: u32) {
        self.update_settings(|s| s.max_attempts = max_attempts.max(1));
    }

    pub fn set_request_timeout(&self, timeout: Duration) {
        self.update_settings(|s| s.request_timeout = timeout);
    }

    pub fn set_overall_timeout(&self, timeout: Duration) {
        self.update_settings(|s| s.overall_timeout = timeout);
    }

    pub fn set_allow_receipt_node_failover(&self, allow: bool) {
        self.update_settings(|s| s.allow_receipt_node_failover = allow);
    }

    /// Executor counters since the client was created.
    pub fn stats(&self) -> ExecutorStats {
        self.inner.stats.snapshot()
    }

    pub(crate) fn counters(&self) -> &StatsCounters {
        &self.inner.stats
    }

    /// Close every channel of both networks. Idempotent.
    pub fn close(&self) {
        self.inner.network.close();
        self.inner.mirror.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.network.is_closed()
    }
}

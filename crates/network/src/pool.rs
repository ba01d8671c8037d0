//! Per-address channel pooling.
//!
//! Each address gets at most `max_per_address` live channels. Channels are
//! created lazily on demand until the bound is reached; after that callers are
//! handed existing channels round-robin so concurrent calls spread over a fixed
//! number of connections.

use crate::{Transport, TransportError};
use dashmap::DashMap;
use ledgerlink_types::NodeAddress;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

struct AddressPool<C> {
    channels: Mutex<Vec<C>>,
    next: AtomicUsize,
    /// Set under the `channels` lock once the pool is removed from the map.
    retired: AtomicBool,
}

impl<C: Clone> AddressPool<C> {
    fn new() -> Self {
        Self {
            channels: Mutex::new(Vec::new()),
            next: AtomicUsize::new(0),
            retired: AtomicBool::new(false),
        }
    }

    /// Next channel in round-robin order, if the pool is full.
    fn next_if_full(&self, max: usize) -> Option<C> {
        let channels = self.channels.lock();
        if channels.is_empty() || channels.len() < max {
            return None;
        }
        let index = self.next.fetch_add(1, Ordering::Relaxed) % channels.len();
        Some(channels[index].clone())
    }
}

/// Bounded set of live channels per node address.
///
/// Owned by one network instance; pools are never shared between clients.
pub struct ChannelPool<T: Transport> {
    transport: Arc<T>,
    max_per_address: usize,
    pools: DashMap<NodeAddress, Arc<AddressPool<T::Channel>>>,
    closed: AtomicBool,
}

impl<T: Transport> ChannelPool<T> {
    /// Create a pool that opens channels through `transport`.
    ///
    /// `max_per_address` is clamped to at least one.
    pub fn new(transport: Arc<T>, max_per_address: usize) -> Self {
        Self {
            transport,
            max_per_address: max_per_address.max(1),
            pools: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// The transport channels are opened through.
    pub fn transport(&self) -> &Arc<T> {
        &self.transport
    }

    /// Get a channel for `address`, creating one if fewer than the bound exist.
    pub async fn get_connection(&self, address: &NodeAddress) -> Result<T::Channel, TransportError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }

        let pool = self
            .pools
            .entry(address.clone())
            .or_insert_with(|| Arc::new(AddressPool::new()))
            .clone();

        if let Some(channel) = pool.next_if_full(self.max_per_address) {
            trace!(%address, "Reusing pooled channel");
            return Ok(channel);
        }

        // Connect without holding the lock; another caller may fill the pool meanwhile.
        let channel = self.transport.connect(address).await?;

        let pooled = {
            let mut channels = pool.channels.lock();
            if pool.retired.load(Ordering::Acquire) {
                drop(channels);
                debug!(%address, "Pool closed while connecting");
                self.transport.close(channel);
                return Err(if self.closed.load(Ordering::Acquire) {
                    TransportError::Closed
                } else {
                    TransportError::NodeRemoved(address.clone())
                });
            }
            if channels.len() < self.max_per_address {
                channels.push(channel.clone());
                debug!(%address, pooled = channels.len(), "Opened channel");
                None
            } else {
                let index = pool.next.fetch_add(1, Ordering::Relaxed) % channels.len();
                Some(channels[index].clone())
            }
        };

        match pooled {
            Some(pooled) => {
                self.transport.close(channel);
                Ok(pooled)
            }
            None => Ok(channel),
        }
    }

    /// Number of live channels for `address`.
    pub fn connection_count(&self, address: &NodeAddress) -> usize {
        self.pools
            .get(address)
            .map(|pool| pool.channels.lock().len())
            .unwrap_or(0)
    }

    /// Close and forget every channel for `address`.
    pub fn close_address(&self, address: &NodeAddress) {
        if let Some((_, pool)) = self.pools.remove(address) {
            let channels = {
                let mut channels = pool.channels.lock();
                pool.retired.store(true, Ordering::Release);
                std::mem::take(&mut *channels)
            };
            debug!(%address, closed = channels.len(), "Closing channels");
            for channel in channels {
                self.transport.close(channel);
            }
        }
    }

    /// Close every pool. Later calls to [`get_connection`](Self::get_connection)
    /// fail with [`TransportError::Closed`].
    pub fn close_all(&self) {
        self.closed.store(true, Ordering::Release);
        let addresses: Vec<NodeAddress> = self.pools.iter().map(|e| e.key().clone()).collect();
        for address in addresses {
            self.close_address(&address);
        }
    }
}

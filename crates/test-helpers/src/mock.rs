//! Scripted in-memory transport.

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use ledgerlink_network::{ResponseStream, Transport, TransportError};
use ledgerlink_types::NodeAddress;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

type Handler = Box<dyn Fn(&NodeAddress, &str, &Bytes) -> Result<Bytes, TransportError> + Send + Sync>;

/// Channel handed out by [`MockTransport`]. Ids are unique per transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MockChannel {
    pub id: u64,
    pub address: NodeAddress,
}

/// A unary or streaming call observed by [`MockTransport`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub address: NodeAddress,
    pub channel_id: u64,
    pub path: String,
    pub request: Bytes,
}

/// Transport answering calls from per-address scripts.
///
/// Unary calls pop the next scripted result for the channel's address; when the
/// script is empty the fallback handler answers, and without one the call fails
/// as unavailable.
#[derive(Default)]
pub struct MockTransport {
    next_channel: AtomicU64,
    yield_on_connect: AtomicBool,
    scripts: Mutex<HashMap<NodeAddress, VecDeque<Result<Bytes, TransportError>>>>,
    streams: Mutex<HashMap<NodeAddress, VecDeque<Vec<Result<Bytes, TransportError>>>>>,
    handler: Mutex<Option<Handler>>,
    unreachable: Mutex<HashSet<NodeAddress>>,
    connects: Mutex<Vec<MockChannel>>,
    closed: Mutex<Vec<MockChannel>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next unary call to `address`.
    pub fn push_response(&self, address: &NodeAddress, result: Result<Bytes, TransportError>) {
        self.scripts
            .lock()
            .entry(address.clone())
            .or_default()
            .push_back(result);
    }

    /// Queue the items of the next server stream opened on `address`.
    pub fn push_stream(&self, address: &NodeAddress, items: Vec<Result<Bytes, TransportError>>) {
        self.streams
            .lock()
            .entry(address.clone())
            .or_default()
            .push_back(items);
    }

    /// Answer unscripted unary calls with `handler`.
    pub fn set_handler<F>(&self, handler: F)
    where
        F: Fn(&NodeAddress, &str, &Bytes) -> Result<Bytes, TransportError> + Send + Sync + 'static,
    {
        *self.handler.lock() = Some(Box::new(handler));
    }

    /// Make connections to `address` fail.
    pub fn set_unreachable(&self, address: &NodeAddress) {
        self.unreachable.lock().insert(address.clone());
    }

    /// Suspend once inside every connect, so concurrent callers interleave.
    pub fn set_yield_on_connect(&self, enabled: bool) {
        self.yield_on_connect.store(enabled, Ordering::Relaxed);
    }

    /// Scripted results not yet consumed for `address`.
    pub fn pending_responses(&self, address: &NodeAddress) -> usize {
        self.scripts.lock().get(address).map_or(0, VecDeque::len)
    }

    /// Every channel opened so far.
    pub fn connects(&self) -> Vec<MockChannel> {
        self.connects.lock().clone()
    }

    /// Number of channels opened so far.
    pub fn connect_count(&self) -> usize {
        self.connects.lock().len()
    }

    /// Every channel closed so far.
    pub fn closed(&self) -> Vec<MockChannel> {
        self.closed.lock().clone()
    }

    /// Every call issued so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Addresses of issued calls, in order.
    pub fn call_addresses(&self) -> Vec<NodeAddress> {
        self.calls.lock().iter().map(|c| c.address.clone()).collect()
    }

    fn record(&self, channel: &MockChannel, path: &str, request: &Bytes) {
        self.calls.lock().push(RecordedCall {
            address: channel.address.clone(),
            channel_id: channel.id,
            path: path.to_string(),
            request: request.clone(),
        });
    }
}

#[async_trait]
impl Transport for MockTransport {
    type Channel = MockChannel;

    async fn connect(&self, address: &NodeAddress) -> Result<MockChannel, TransportError> {
        if self.unreachable.lock().contains(address) {
            return Err(TransportError::Connect {
                address: address.clone(),
                reason: "unreachable".to_string(),
            });
        }
        if self.yield_on_connect.load(Ordering::Relaxed) {
            tokio::task::yield_now().await;
        }
        let channel = MockChannel {
            id: self.next_channel.fetch_add(1, Ordering::Relaxed),
            address: address.clone(),
        };
        self.connects.lock().push(channel.clone());
        Ok(channel)
    }

    async fn unary(
        &self,
        channel: &MockChannel,
        path: &str,
        request: Bytes,
    ) -> Result<Bytes, TransportError> {
        self.record(channel, path, &request);

        let scripted = self
            .scripts
            .lock()
            .get_mut(&channel.address)
            .and_then(VecDeque::pop_front);
        if let Some(result) = scripted {
            return result;
        }

        match self.handler.lock().as_ref() {
            Some(handler) => handler(&channel.address, path, &request),
            None => Err(TransportError::Unavailable(format!(
                "no scripted response for {}",
                channel.address
            ))),
        }
    }

    async fn server_streaming(
        &self,
        channel: &MockChannel,
        path: &str,
        request: Bytes,
    ) -> Result<ResponseStream, TransportError> {
        self.record(channel, path, &request);

        let items = self
            .streams
            .lock()
            .get_mut(&channel.address)
            .and_then(VecDeque::pop_front)
            .ok_or_else(|| {
                TransportError::Unavailable(format!("no scripted stream for {}", channel.address))
            })?;
        Ok(futures::stream::iter(items).boxed())
    }

    fn close(&self, channel: MockChannel) {
        self.closed.lock().push(channel);
    }
}

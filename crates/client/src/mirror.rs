//! Server streams from mirror nodes.

use crate::{Client, Error};
use bytes::Bytes;
use ledgerlink_network::{FailureKind, ResponseStream, Transport, TransportError};
use tokio::time::Instant;
use tracing::{debug, warn};

impl<T: Transport> Client<T> {
    /// Open a server stream on a mirror node.
    ///
    /// Mirror nodes are tried healthy first; a node that fails to open the
    /// stream is penalized like a consensus node. Only stream establishment is
    /// retried. Errors on an open stream are the caller's to handle.
    pub async fn mirror_stream(&self, path: &str, request: Bytes) -> Result<ResponseStream, Error> {
        let mirror = self.mirror_network();
        if mirror.is_closed() {
            return Err(Error::Closed);
        }
        let settings = self.execution_settings();
        let deadline = Instant::now() + settings.overall_timeout;

        let nodes = mirror.nodes_for_attempt(mirror.len());
        if nodes.is_empty() {
            return Err(Error::NoNodes);
        }

        let mut attempts = 0;
        let mut last_error = None;
        for node in nodes.iter().cycle() {
            if attempts >= settings.max_attempts {
                break;
            }
            let now = Instant::now();
            if now >= deadline {
                return Err(Error::TimedOut {
                    last_error: last_error.map(Box::new),
                });
            }

            let wait = node.remaining_backoff();
            if !wait.is_zero() {
                if now + wait >= deadline {
                    return Err(Error::TimedOut {
                        last_error: last_error.map(Box::new),
                    });
                }
                self.counters().record_sleep();
                tokio::time::sleep(wait).await;
            }

            attempts += 1;
            self.counters().record_attempt(attempts > 1);
            let timeout = settings
                .request_timeout
                .min(deadline.saturating_duration_since(Instant::now()));
            let result = tokio::time::timeout(timeout, mirror.server_streaming(node, path, request.clone()))
                .await
                .unwrap_or(Err(TransportError::DeadlineExceeded));

            match result {
                Ok(stream) => {
                    node.mark_success();
                    debug!(address = %node.address(), attempts, "Mirror stream opened");
                    return Ok(stream);
                }
                Err(source) if source.is_retryable() => {
                    node.mark_failure(FailureKind::Transport);
                    debug!(address = %node.address(), error = %source, "Mirror stream failed, rotating");
                    last_error = Some(Error::Transport {
                        address: node.address().clone(),
                        source,
                    });
                }
                Err(source) => {
                    return Err(Error::Transport {
                        address: node.address().clone(),
                        source,
                    })
                }
            }
        }

        warn!(path, attempts, "Giving up opening mirror stream");
        Err(Error::Exhausted {
            attempts,
            last_node: None,
            source: Box::new(last_error.unwrap_or(Error::NoNodes)),
        })
    }
}

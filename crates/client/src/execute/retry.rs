//! The retry loop.

use super::backoff::{capped, jittered, pending_delay};
use super::select::NodeSelector;
use super::{Execute, Outcome};
use crate::{Client, Error};
use ledgerlink_network::{FailureKind, ManagedNetwork, ManagedNode, Transport, TransportError};
use ledgerlink_types::AccountId;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Run `request` against the client's consensus network until it succeeds,
/// fails terminally, runs out of attempts or passes the overall deadline.
pub(crate) async fn execute<T, E>(client: &Client<T>, request: &E) -> Result<E::Response, Error>
where
    T: Transport,
    E: Execute + ?Sized,
{
    let settings = client.execution_settings();
    let network = client.network();
    let stats = client.counters();
    let deadline = Instant::now() + settings.overall_timeout;
    let request_desc = request.describe();

    if network.is_closed() {
        return Err(Error::Closed);
    }
    let mut selector = NodeSelector::new(candidates(network, request));
    if selector.is_empty() {
        return Err(Error::NoNodes);
    }

    let mut attempts: u32 = 0;
    let mut pending_polls: u32 = 0;
    let mut last_node: Option<AccountId> = None;
    let mut last_error: Option<Error> = None;

    loop {
        if attempts >= settings.max_attempts {
            warn!(
                request = %request_desc,
                attempts,
                last_node = ?last_node,
                "Giving up after max attempts"
            );
            return Err(Error::Exhausted {
                attempts,
                last_node,
                source: Box::new(last_error.unwrap_or(Error::NoNodes)),
            });
        }
        if Instant::now() >= deadline {
            return Err(timed_out(&request_desc, attempts, last_error));
        }

        let Some((account, node)) = selector.next() else {
            return Err(Error::NoNodes);
        };

        // Every candidate is in backoff; wait for the least penalized one.
        let wait = node.remaining_backoff();
        if !wait.is_zero() {
            if Instant::now() + wait >= deadline {
                return Err(timed_out(&request_desc, attempts, last_error));
            }
            trace!(
                request = %request_desc,
                node = %account,
                wait_ms = wait.as_millis() as u64,
                "Waiting for node backoff"
            );
            stats.record_sleep();
            tokio::time::sleep(wait).await;
        }

        let payload = request.make_request(account)?;
        attempts += 1;
        stats.record_attempt(attempts > 1);
        last_node = Some(account);

        debug!(
            request = %request_desc,
            node = %account,
            address = %node.address(),
            attempt = attempts,
            round = selector.round(),
            "Sending request"
        );

        let attempt_timeout = settings
            .request_timeout
            .min(deadline.saturating_duration_since(Instant::now()));
        let result = match tokio::time::timeout(
            attempt_timeout,
            network.unary(&node, request.path(), payload),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(TransportError::DeadlineExceeded),
        };

        let response = match result {
            Ok(response) => response,
            Err(source) if source.is_retryable() => {
                debug!(
                    request = %request_desc,
                    node = %account,
                    error = %source,
                    "Transport failure, retrying"
                );
                last_error = Some(Error::Transport {
                    address: node.address().clone(),
                    source,
                });
                let backoff = node.mark_failure(FailureKind::Transport);
                if attempts < settings.max_attempts {
                    sleep_backoff(client, backoff, deadline).await;
                }
                continue;
            }
            Err(source) => {
                return Err(Error::Transport {
                    address: node.address().clone(),
                    source,
                })
            }
        };

        match request.handle_response(account, response) {
            Outcome::Done(value) => {
                node.mark_success();
                trace!(
                    request = %request_desc,
                    node = %account,
                    attempts,
                    "Request succeeded"
                );
                return Ok(value);
            }
            Outcome::Transient(error) => {
                debug!(
                    request = %request_desc,
                    node = %account,
                    error = %error,
                    "Transient status, retrying"
                );
                last_error = Some(error);
                let backoff = node.mark_failure(FailureKind::Transient);
                if attempts < settings.max_attempts {
                    sleep_backoff(client, backoff, deadline).await;
                }
            }
            Outcome::Pending(error) => {
                let delay = pending_delay(settings.min_backoff, settings.max_backoff, pending_polls);
                pending_polls += 1;
                debug!(
                    request = %request_desc,
                    node = %account,
                    error = %error,
                    delay_ms = delay.as_millis() as u64,
                    "Result not available yet"
                );
                last_error = Some(error);
                if attempts < settings.max_attempts {
                    stats.record_sleep();
                    tokio::time::sleep(capped(delay, deadline)).await;
                }
            }
            Outcome::Fail(error) => {
                debug!(
                    request = %request_desc,
                    node = %account,
                    error = %error,
                    "Request failed"
                );
                return Err(error);
            }
        }
    }
}

/// Resolve the request's candidate nodes against the network.
///
/// Explicit node ids keep their order; ids the network does not know are
/// skipped. Without explicit ids the network picks a load-spread selection.
fn candidates<T, E>(network: &ManagedNetwork<T>, request: &E) -> Vec<(AccountId, Arc<ManagedNode>)>
where
    T: Transport,
    E: Execute + ?Sized,
{
    match request.node_account_ids() {
        Some(ids) => ids
            .iter()
            .filter_map(|id| network.node_for_account(id).map(|node| (*id, node)))
            .collect(),
        None => network
            .nodes_for_attempt(network.len())
            .into_iter()
            .filter_map(|node| node.account_id().map(|id| (id, node)))
            .collect(),
    }
}

/// Sleep a node's `backoff` plus jitter, bounded by `deadline`.
async fn sleep_backoff<T: Transport>(client: &Client<T>, backoff: Duration, deadline: Instant) {
    let delay = capped(jittered(backoff), deadline);
    if delay.is_zero() {
        return;
    }
    client.counters().record_sleep();
    tokio::time::sleep(delay).await;
}

fn timed_out(request_desc: &str, attempts: u32, last_error: Option<Error>) -> Error {
    warn!(
        request = %request_desc,
        attempts,
        "Request deadline passed"
    );
    Error::TimedOut {
        last_error: last_error.map(Box::new),
    }
}

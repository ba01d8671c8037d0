//! Delays between attempts.

use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

/// Upper bound of the random jitter added to a node backoff, as a fraction of it.
const JITTER_FRACTION: f64 = 0.1;

/// `backoff` plus up to 10% random jitter.
pub(super) fn jittered(backoff: Duration) -> Duration {
    let max_jitter = backoff.mul_f64(JITTER_FRACTION);
    if max_jitter.is_zero() {
        return backoff;
    }
    let jitter = rand::thread_rng().gen_range(Duration::ZERO..=max_jitter);
    backoff + jitter
}

/// Delay before polling a pending result again: `min * 2^polls`, capped at `max`.
pub(super) fn pending_delay(min: Duration, max: Duration, polls: u32) -> Duration {
    let factor = 1u32.checked_shl(polls).unwrap_or(u32::MAX);
    min.saturating_mul(factor).min(max)
}

/// `delay`, shortened so it ends no later than `deadline`.
pub(super) fn capped(delay: Duration, deadline: Instant) -> Duration {
    delay.min(deadline.saturating_duration_since(Instant::now()))
}

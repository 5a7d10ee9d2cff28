//! Exponential backoff with optional jitter.

use std::time::Duration;
use rand::Rng;

/// Calculate the delay before retry number `retry` (1-based).
///
/// `base * multiplier^(retry - 1)`, capped at `max`, plus up to
/// `jitter_ratio` of the capped delay. Retry 0 means "no wait".
pub fn calculate_backoff(
    retry: u32,
    base: Duration,
    multiplier: u32,
    max: Duration,
    jitter_ratio: f64,
) -> Duration {
    if retry == 0 {
        return Duration::ZERO;
    }

    let factor = multiplier.max(1).saturating_pow(retry - 1);
    let capped = base.saturating_mul(factor).min(max);

    if jitter_ratio <= 0.0 {
        return capped;
    }

    let jitter_range = capped.mul_f64(jitter_ratio.min(1.0));
    let jitter = if jitter_range > Duration::ZERO {
        rand::thread_rng().gen_range(Duration::ZERO..jitter_range)
    } else {
        Duration::ZERO
    };

    capped + jitter
}

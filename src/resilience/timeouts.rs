//! Timeout enforcement.
//!
//! Every outbound call carries its own deadline; an elapsed deadline is a
//! distinct, typed error so callers can classify it.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// The operation did not finish before its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("deadline of {0:?} exceeded")]
pub struct DeadlineExceeded(pub Duration);

/// Await `fut`, giving up after `deadline`.
pub async fn with_deadline<F>(deadline: Duration, fut: F) -> Result<F::Output, DeadlineExceeded>
where
    F: Future,
{
    tokio::time::timeout(deadline, fut)
        .await
        .map_err(|_| DeadlineExceeded(deadline))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapses() {
        let result = with_deadline(Duration::from_secs(2), tokio::time::sleep(Duration::from_secs(5))).await;
        assert_eq!(result, Err(DeadlineExceeded(Duration::from_secs(2))));
    }

    #[tokio::test]
    async fn test_completes_in_time() {
        let result = with_deadline(Duration::from_secs(2), async { 7 }).await;
        assert_eq!(result, Ok(7));
    }
}

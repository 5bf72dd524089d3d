use std::future::Future;
use std::time::Duration;

use super::gateway::GatewayError;

/// Bounded exponential backoff around single gateway attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Runs `operation` until it succeeds or `max_attempts` are used up.
    ///
    /// Every failed attempt except the last waits for the current delay, which
    /// doubles after each wait. The error of the last attempt is returned.
    pub async fn execute<T, F, Fut>(&self, mut operation: F) -> Result<T, GatewayError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let mut delay = self.initial_delay;
        let mut attempt = 1;
        loop {
            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if attempt >= self.max_attempts {
                log::warn!(
                    "Model request failed after {} attempts: {}",
                    attempt,
                    error
                );
                return Err(error);
            }

            if error.is_rate_limited() {
                log::warn!("Rate limit exceeded, retrying in {}ms...", delay.as_millis());
            } else {
                log::warn!(
                    "Model request failed ({}), retrying in {}ms...",
                    error,
                    delay.as_millis()
                );
            }
            tokio::time::sleep(delay).await;
            delay *= 2;
            attempt += 1;
        }
    }
}

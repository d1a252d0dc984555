use crate::RemoteError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Bounded retry with linearly increasing backoff.
///
/// Attempt `n` (0-based) that fails is followed by a sleep of
/// `base_delay_ms + n * step_ms`; no sleep follows the last attempt.
/// The defaults give 5 attempts separated by 1s, 3s, 5s and 7s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay_ms: u64,
    pub step_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            base_delay_ms: 1000,
            step_ms: 2000,
        }
    }
}

/// All attempts failed; carries the error of the last one.
#[derive(Debug)]
pub struct RetryExhausted<E> {
    pub attempts: u32,
    pub last: E,
}

impl<E: fmt::Display> fmt::Display for RetryExhausted<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gave up after {} attempts: {}", self.attempts, self.last)
    }
}

impl RetryExhausted<RemoteError> {
    /// Wrap into a [`RemoteError`] naming the operation.
    pub fn into_remote(self, what: &str) -> RemoteError {
        RemoteError::RetriesExhausted {
            what: what.to_owned(),
            attempts: self.attempts,
            last: Box::new(self.last),
        }
    }
}

impl RetryPolicy {
    /// A policy with no sleeping between attempts.
    pub fn immediate(attempts: u32) -> Self {
        Self {
            attempts,
            base_delay_ms: 0,
            step_ms: 0,
        }
    }

    /// Effective attempt count; a configured zero still runs once.
    pub fn max_attempts(&self) -> u32 {
        self.attempts.max(1)
    }

    /// Delay after the failed attempt with 0-based index `attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        Duration::from_millis(
            self.base_delay_ms
                .saturating_add(self.step_ms.saturating_mul(u64::from(attempt))),
        )
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// `op` receives the 0-based attempt index. Each failure is logged with
    /// `what` as context.
    pub fn run<T, E, F>(&self, what: &str, mut op: F) -> Result<T, RetryExhausted<E>>
    where
        E: fmt::Display,
        F: FnMut(u32) -> Result<T, E>,
    {
        let max = self.max_attempts();
        let mut attempt = 0;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!("{what}: attempt {} failed: {e}", attempt + 1);
                    if attempt + 1 >= max {
                        return Err(RetryExhausted {
                            attempts: max,
                            last: e,
                        });
                    }
                    let delay = self.delay_after(attempt);
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

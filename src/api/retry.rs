//! Retry with exponential backoff.
//!
//! Each attempt calls the supplied factory again, so request bodies are
//! rebuilt instead of reused. Attempts are strictly sequential.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{RetryConfig, MAX_RETRY_DELAY_MS};
use crate::error::ApiError;

/// Failure classification the retry loop needs from an error type.
pub trait Retryable: Sized {
  fn is_cancelled(&self) -> bool;

  fn is_retryable(&self) -> bool;

  /// The value returned when cancellation interrupts a backoff wait.
  fn cancelled() -> Self;

  /// Minimum wait the server asked for before the next attempt.
  fn retry_after(&self) -> Option<Duration> {
    None
  }
}

impl Retryable for ApiError {
  fn is_cancelled(&self) -> bool {
    ApiError::is_cancelled(self)
  }

  fn is_retryable(&self) -> bool {
    ApiError::is_retryable(self)
  }

  fn cancelled() -> Self {
    ApiError::Cancelled
  }

  fn retry_after(&self) -> Option<Duration> {
    ApiError::retry_after(self)
  }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
  /// Attempts allowed after the first one
  pub retries: u32,
  pub initial_delay: Duration,
  pub backoff_factor: f64,
  /// Never exceeds 30 seconds, whatever the configuration says
  pub max_delay: Duration,
}

impl Default for RetryPolicy {
  fn default() -> Self {
    Self::from_config(&RetryConfig::default())
  }
}

impl RetryPolicy {
  pub fn from_config(config: &RetryConfig) -> Self {
    Self {
      retries: config.attempts,
      initial_delay: Duration::from_millis(config.delay_ms),
      backoff_factor: config.backoff_factor,
      max_delay: Duration::from_millis(config.max_delay_ms.min(MAX_RETRY_DELAY_MS)),
    }
  }

  pub fn with_retries(mut self, retries: u32) -> Self {
    self.retries = retries;
    self
  }

  pub fn with_initial_delay(mut self, delay: Duration) -> Self {
    self.initial_delay = delay;
    self
  }

  /// Delay before retry number `retry_index` (0 = after the first failure):
  /// `initial_delay * backoff_factor^retry_index`, capped.
  pub fn delay_for(&self, retry_index: u32) -> Duration {
    let cap = self.cap();
    let exponent = i32::try_from(retry_index).unwrap_or(i32::MAX);
    let secs = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);

    if !secs.is_finite() || secs >= cap.as_secs_f64() {
      cap
    } else {
      Duration::from_secs_f64(secs.max(0.0))
    }
  }

  /// Backoff before retry `retry_index`, stretched to a server-requested
  /// `Retry-After` but never past the cap.
  pub fn backoff(&self, retry_index: u32, retry_after: Option<Duration>) -> Duration {
    let delay = self.delay_for(retry_index);
    match retry_after {
      Some(wait) => delay.max(wait).min(self.cap()),
      None => delay,
    }
  }

  fn cap(&self) -> Duration {
    self.max_delay.min(Duration::from_millis(MAX_RETRY_DELAY_MS))
  }

  /// Run `make_call` until it succeeds, fails for good, or retries run out.
  ///
  /// Cancellation (either reported by the call or signalled on `cancel`
  /// while waiting) ends the loop at once. The last error is returned
  /// unchanged when giving up.
  pub async fn run<T, E, F, Fut>(&self, cancel: &CancellationToken, mut make_call: F) -> Result<T, E>
  where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
  {
    let mut retry_index = 0u32;

    loop {
      if cancel.is_cancelled() {
        return Err(E::cancelled());
      }

      let err = match make_call().await {
        Ok(value) => return Ok(value),
        Err(err) => err,
      };

      if err.is_cancelled() {
        debug!("request cancelled, not retrying");
        return Err(err);
      }

      if !err.is_retryable() || retry_index >= self.retries {
        return Err(err);
      }

      let backoff = self.backoff(retry_index, err.retry_after());
      retry_index += 1;

      warn!(
        error = %err,
        retry = retry_index,
        max_retries = self.retries,
        backoff_ms = backoff.as_millis() as u64,
        "retrying request"
      );

      tokio::select! {
        _ = cancel.cancelled() => return Err(E::cancelled()),
        _ = tokio::time::sleep(backoff) => {}
      }
    }
  }
}

/// Retry `make_call` with the default backoff factor and no external
/// cancellation. `retries` counts attempts beyond the first.
pub async fn with_retry<T, E, F, Fut>(make_call: F, retries: u32, initial_delay: Duration) -> Result<T, E>
where
  E: Retryable + std::fmt::Display,
  F: FnMut() -> Fut,
  Fut: Future<Output = Result<T, E>>,
{
  RetryPolicy::default()
    .with_retries(retries)
    .with_initial_delay(initial_delay)
    .run(&CancellationToken::new(), make_call)
    .await
}

//! Error taxonomy for calls to the dashboard backend.

use std::time::Duration;

use reqwest::StatusCode;

/// Errors produced by the HTTP layer and the domain modules built on it.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  /// The caller cancelled the request. Never retried, never shown to users.
  #[error("request cancelled")]
  Cancelled,

  /// No response before the configured timeout.
  #[error("request timed out")]
  Timeout,

  /// Transport failure: DNS, refused connection, reset, ...
  #[error("network error: {message}")]
  Network { message: String },

  /// The backend answered with a non-success status.
  #[error("HTTP {status}: {message}")]
  Status {
    status: StatusCode,
    message: String,
    retry_after: Option<Duration>,
  },

  /// A protected endpoint was about to be called without a token.
  #[error("no access token available for {path}")]
  MissingToken { path: String },

  /// Refresh failed or was impossible; credentials have been cleared.
  #[error("authentication failed: {message}")]
  AuthFailed { message: String },

  /// The body could not be decoded.
  #[error("invalid response: {message}")]
  InvalidResponse { message: String },

  /// Token or cache storage failure.
  #[error("storage error: {message}")]
  Storage { message: String },

  #[error("configuration error: {message}")]
  Config { message: String },
}

impl ApiError {
  pub fn status(&self) -> Option<StatusCode> {
    match self {
      Self::Status { status, .. } => Some(*status),
      _ => None,
    }
  }

  /// Wait requested by a `Retry-After` header, in seconds form.
  pub fn retry_after(&self) -> Option<Duration> {
    match self {
      Self::Status { retry_after, .. } => *retry_after,
      _ => None,
    }
  }

  pub fn is_cancelled(&self) -> bool {
    matches!(self, Self::Cancelled)
  }

  pub fn is_unauthorized(&self) -> bool {
    self.status() == Some(StatusCode::UNAUTHORIZED)
  }

  /// No usable session: a missing token, a 401, or a failed refresh.
  /// Never masked by cached data.
  pub fn is_auth_failure(&self) -> bool {
    self.is_unauthorized() || matches!(self, Self::MissingToken { .. } | Self::AuthFailed { .. })
  }

  /// Network failures, timeouts, 5xx and 429 are worth another attempt.
  /// Cancellation and every other 4xx are final.
  pub fn is_retryable(&self) -> bool {
    match self {
      Self::Network { .. } | Self::Timeout => true,
      Self::Status { status, .. } => {
        status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
      }
      _ => false,
    }
  }

  /// Wrap a storage-layer report.
  pub fn storage(err: impl std::fmt::Display) -> Self {
    Self::Storage {
      message: format!("{:#}", err),
    }
  }

  /// Message suitable for a transient user notification.
  pub fn user_message(&self) -> String {
    match self {
      Self::Status { status, message, .. } if status.is_server_error() => {
        format!("Server error ({}): {}", status.as_u16(), message)
      }
      Self::Timeout => "The server took too long to respond".to_string(),
      Self::Network { .. } => "Could not reach the server".to_string(),
      other => other.to_string(),
    }
  }
}

impl From<reqwest::Error> for ApiError {
  fn from(err: reqwest::Error) -> Self {
    if err.is_timeout() {
      Self::Timeout
    } else if err.is_decode() {
      Self::InvalidResponse {
        message: err.to_string(),
      }
    } else if let Some(status) = err.status() {
      Self::Status {
        status,
        message: err.to_string(),
        retry_after: None,
      }
    } else {
      Self::Network {
        message: err.to_string(),
      }
    }
  }
}

impl From<serde_json::Error> for ApiError {
  fn from(err: serde_json::Error) -> Self {
    Self::InvalidResponse {
      message: err.to_string(),
    }
  }
}

pub type ApiResult<T> = Result<T, ApiError>;

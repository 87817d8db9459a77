//! Shared HTTP client for the dashboard backend.
//!
//! Per request:
//! - the bearer token is attached from the token store (auth endpoints
//!   excepted); without a token a protected request is rejected unsent
//! - a 401 triggers one refresh and one replay; a second 401 on the same
//!   request, a failed refresh, or a missing refresh token clears the
//!   credentials and asks the front end to go to the login screen
//! - 5xx responses raise a notification and are still returned as errors
//!
//! Concurrent requests that all hit a 401 each run their own refresh.
//! Only the per-request replay flag bounds the work; there is no global
//! refresh lock.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, RETRY_AFTER, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::auth::TokenStore;
use crate::config::Config;
use crate::error::{ApiError, ApiResult};

use super::notify::{Notification, Notifier, LOGIN_ROUTE};
use super::request::{ApiRequest, RequestBody, REFRESH_PATH};
use super::retry::RetryPolicy;
use super::session::TokenGrant;

const USER_AGENT_VALUE: &str = concat!("orgdash/", env!("CARGO_PKG_VERSION"));

/// Runs after credentials are cleared by an auth failure.
pub type AuthFailureHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Clone)]
pub struct ApiClient {
  http: reqwest::Client,
  root: String,
  tokens: TokenStore,
  notifier: Arc<dyn Notifier>,
  retry: RetryPolicy,
  finance_timeout: Duration,
  on_auth_failure: Option<AuthFailureHook>,
}

impl std::fmt::Debug for ApiClient {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ApiClient")
      .field("root", &self.root)
      .field("retry", &self.retry)
      .finish_non_exhaustive()
  }
}

impl ApiClient {
  pub fn new(config: &Config, tokens: TokenStore, notifier: Arc<dyn Notifier>) -> ApiResult<Self> {
    let mut default_headers = HeaderMap::new();
    default_headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
    default_headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    let http = reqwest::Client::builder()
      .timeout(config.api.timeout())
      .default_headers(default_headers)
      .build()
      .map_err(|e| ApiError::Config {
        message: format!("failed to create HTTP client: {}", e),
      })?;

    let root = config.api_root();
    url::Url::parse(&root).map_err(|e| ApiError::Config {
      message: format!("invalid API base URL {}: {}", root, e),
    })?;

    Ok(Self {
      http,
      root,
      tokens,
      notifier,
      retry: RetryPolicy::from_config(&config.retry),
      finance_timeout: config.api.finance_timeout(),
      on_auth_failure: None,
    })
  }

  /// Call `hook` whenever an auth failure clears the credentials, e.g. to
  /// drop data cached under the old session. Replaces any earlier hook.
  pub fn on_auth_failure(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
    self.on_auth_failure = Some(Arc::new(hook));
    self
  }

  pub fn tokens(&self) -> &TokenStore {
    &self.tokens
  }

  /// Resolved API root, e.g. `http://localhost:8080/api/v1`.
  pub fn root(&self) -> &str {
    &self.root
  }

  pub fn finance_timeout(&self) -> Duration {
    self.finance_timeout
  }

  pub fn retry_policy(&self) -> RetryPolicy {
    self.retry
  }

  /// Send with retries and auth handling; the body is parsed as JSON.
  /// An empty body comes back as `Value::Null`.
  pub async fn send(&self, request: ApiRequest, cancel: &CancellationToken) -> ApiResult<Value> {
    let client = self;
    self
      .retry
      .run(cancel, move || client.execute(request.clone(), cancel))
      .await
  }

  pub async fn send_json<T: DeserializeOwned>(
    &self,
    request: ApiRequest,
    cancel: &CancellationToken,
  ) -> ApiResult<T> {
    let body = self.send(request, cancel).await?;
    Ok(serde_json::from_value(body)?)
  }

  /// Send exactly once: no retry, no refresh on 401, no notifications.
  pub async fn send_once(&self, request: &ApiRequest, cancel: &CancellationToken) -> ApiResult<Value> {
    self.dispatch(request, cancel).await
  }

  /// One logical attempt: dispatch, and on 401 refresh once and replay.
  pub async fn execute(&self, mut request: ApiRequest, cancel: &CancellationToken) -> ApiResult<Value> {
    loop {
      let err = match self.dispatch(&request, cancel).await {
        Ok(body) => return Ok(body),
        Err(err) => err,
      };

      if err.is_unauthorized() && !request.is_auth_endpoint() {
        if request.retried {
          warn!(path = %request.path, "unauthorized after token refresh");
          return Err(self.fail_auth(&request, err));
        }
        request.retried = true;

        match self.refresh_access_token(cancel).await {
          Ok(()) => {
            debug!(path = %request.path, "replaying request with refreshed token");
            continue;
          }
          Err(refresh_err) if refresh_err.is_cancelled() => return Err(refresh_err),
          Err(refresh_err) => {
            warn!(error = %refresh_err, "token refresh failed");
            return Err(self.fail_auth(&request, err));
          }
        }
      }

      if let Some(status) = err.status().filter(|s| s.is_server_error()) {
        self.notifier.notify(Notification::ServerError {
          status: status.as_u16(),
          message: err.user_message(),
        });
      }

      return Err(err);
    }
  }

  /// Exchange the stored refresh token for a new credential.
  pub async fn refresh_access_token(&self, cancel: &CancellationToken) -> ApiResult<()> {
    let refresh_token = self
      .tokens
      .get_refresh_token()
      .ok_or_else(|| ApiError::AuthFailed {
        message: "no refresh token available".to_string(),
      })?;

    info!("refreshing access token");
    let request = ApiRequest::post(REFRESH_PATH).json(&json!({ "refreshToken": refresh_token }))?;
    let body = self.dispatch(&request, cancel).await?;
    let grant = TokenGrant::from_response(&body)?;

    let refresh = grant.refresh_token.as_deref().unwrap_or(&refresh_token);
    self.tokens.set_tokens(&grant.access_token, refresh)
  }

  /// Clear credentials, remember where the user was, ask for a login.
  /// Returns the error that caused it so the caller still sees the failure.
  fn fail_auth(&self, request: &ApiRequest, cause: ApiError) -> ApiError {
    error!(path = %request.path, "authentication failed, clearing credentials");

    if let Err(e) = self.tokens.clear_tokens() {
      warn!(error = %e, "failed to clear tokens");
    }
    if let Err(e) = self.tokens.set_logged_in(false) {
      warn!(error = %e, "failed to clear login flag");
    }
    if let Err(e) = self.tokens.remember_redirect(&request.path) {
      warn!(error = %e, "failed to remember redirect path");
    }
    if let Some(hook) = &self.on_auth_failure {
      hook();
    }

    self.notifier.notify(Notification::AuthFailed {
      redirect_to: LOGIN_ROUTE.to_string(),
    });

    cause
  }

  /// Send exactly once. No retry, no refresh.
  async fn dispatch(&self, request: &ApiRequest, cancel: &CancellationToken) -> ApiResult<Value> {
    let url = self.url_for(&request.path);
    let mut builder = self
      .http
      .request(request.method.clone(), &url)
      .query(&request.query);

    if let Some(timeout) = request.timeout {
      builder = builder.timeout(timeout);
    }

    if !request.is_auth_endpoint() {
      match self.tokens.get_token() {
        Some(token) => builder = builder.bearer_auth(token),
        None => {
          return Err(ApiError::MissingToken {
            path: request.path.clone(),
          })
        }
      }
    }

    builder = match &request.body {
      RequestBody::Empty => builder,
      RequestBody::Json(body) => builder.json(body),
      RequestBody::Multipart(fields) => builder.multipart(RequestBody::to_form(fields)?),
    };

    debug!(method = %request.method, url = %url, "sending request");

    let response = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(ApiError::Cancelled),
      response = builder.send() => response?,
    };

    let status = response.status();
    let retry_after = response
      .headers()
      .get(RETRY_AFTER)
      .and_then(|v| v.to_str().ok())
      .and_then(|v| v.trim().parse::<u64>().ok())
      .map(Duration::from_secs);

    let bytes = tokio::select! {
      biased;
      _ = cancel.cancelled() => return Err(ApiError::Cancelled),
      bytes = response.bytes() => bytes?,
    };

    debug!(status = status.as_u16(), len = bytes.len(), "response received");

    if !status.is_success() {
      return Err(ApiError::Status {
        status,
        message: error_message(&bytes, status),
        retry_after,
      });
    }

    if bytes.iter().all(u8::is_ascii_whitespace) {
      return Ok(Value::Null);
    }

    serde_json::from_slice(&bytes).map_err(|e| ApiError::InvalidResponse {
      message: format!("{} {}: {}", request.method, request.path, e),
    })
  }

  fn url_for(&self, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") {
      path.to_string()
    } else {
      format!("{}{}", self.root, path)
    }
  }
}

/// Best human-readable message from an error body.
fn error_message(body: &[u8], status: reqwest::StatusCode) -> String {
  if let Ok(json) = serde_json::from_slice::<Value>(body) {
    let message = ["message", "error", "detail"]
      .iter()
      .find_map(|key| json.get(*key).and_then(Value::as_str));
    if let Some(message) = message {
      return message.to_string();
    }
  }

  let text = String::from_utf8_lossy(body);
  let text = text.trim();
  if text.is_empty() {
    status
      .canonical_reason()
      .unwrap_or("unknown error")
      .to_string()
  } else {
    text.chars().take(200).collect()
  }
}

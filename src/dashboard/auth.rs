//! Login, logout and session inspection.

use serde::Serialize;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::{ApiRequest, TokenGrant, LOGIN_PATH, LOGOUT_PATH};
use crate::error::ApiResult;

use super::Dashboard;

/// What the front end needs after a successful login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginOutcome {
  /// Page the user was on when the previous session expired
  pub redirect_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
  pub logged_in: bool,
  pub has_access_token: bool,
  pub has_refresh_token: bool,
}

pub struct AuthApi<'a> {
  dashboard: &'a Dashboard,
}

impl<'a> AuthApi<'a> {
  pub(crate) fn new(dashboard: &'a Dashboard) -> Self {
    Self { dashboard }
  }

  pub async fn login(
    &self,
    email: &str,
    password: &str,
    cancel: &CancellationToken,
  ) -> ApiResult<LoginOutcome> {
    let request = ApiRequest::post(LOGIN_PATH).json(&json!({
      "email": email,
      "password": password,
    }))?;
    let body = self.dashboard.api.send(request, cancel).await?;
    let grant = TokenGrant::from_response(&body)?;

    let tokens = self.dashboard.api.tokens();
    tokens.set_tokens(
      &grant.access_token,
      grant.refresh_token.as_deref().unwrap_or_default(),
    )?;
    tokens.set_logged_in(true)?;

    // Cached pages may belong to another account
    self.dashboard.cache.clear();

    info!(email, "logged in");
    Ok(LoginOutcome {
      redirect_to: tokens.take_redirect(),
    })
  }

  /// Tell the backend, then forget the session locally. The local part
  /// happens even when the backend cannot be reached.
  pub async fn logout(&self, cancel: &CancellationToken) -> ApiResult<()> {
    let tokens = self.dashboard.api.tokens();

    if tokens.get_token().is_some() {
      let request = ApiRequest::post(LOGOUT_PATH);
      match self.dashboard.api.send_once(&request, cancel).await {
        Ok(_) => {}
        Err(e) if e.is_cancelled() => return Err(e),
        Err(e) => warn!(error = %e, "backend logout failed, clearing local session anyway"),
      }
    }

    tokens.clear_tokens()?;
    tokens.set_logged_in(false)?;
    self.dashboard.cache.clear();
    info!("logged out");
    Ok(())
  }

  pub async fn refresh(&self, cancel: &CancellationToken) -> ApiResult<()> {
    self.dashboard.api.refresh_access_token(cancel).await
  }

  pub fn status(&self) -> SessionStatus {
    let tokens = self.dashboard.api.tokens();
    SessionStatus {
      logged_in: tokens.is_logged_in(),
      has_access_token: tokens.get_token().is_some(),
      has_refresh_token: tokens.get_refresh_token().is_some(),
    }
  }
}

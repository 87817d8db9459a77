//! Token store with a fallback chain across storage locations.
//!
//! Lookup order for the access token:
//! 1. persistent storage, primary key
//! 2. persistent storage, admin key
//! 3. session storage (promoted into persistent storage when found)
//! 4. cookies (promoted into persistent storage when found)
//!
//! Reads are best effort: a failing backend is logged and skipped.
//! `clear_tokens` only touches persistent storage; since it is consulted
//! first, a fresh login always wins over leftovers in the fallbacks.

use color_eyre::Result;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{ApiError, ApiResult};
use crate::storage::{CookieJar, KeyValueStore, MemoryStore, SqliteStore};

pub const ACCESS_TOKEN_KEY: &str = "token";
pub const ADMIN_TOKEN_KEY: &str = "adminToken";
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";
pub const REDIRECT_AFTER_LOGIN_KEY: &str = "redirectAfterLogin";
pub const LOGGED_IN_KEY: &str = "isLoggedIn";

#[derive(Clone)]
pub struct TokenStore {
  persistent: Arc<dyn KeyValueStore>,
  session: Arc<dyn KeyValueStore>,
  cookies: Arc<dyn KeyValueStore>,
}

impl std::fmt::Debug for TokenStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TokenStore").finish_non_exhaustive()
  }
}

impl TokenStore {
  pub fn new(
    persistent: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
    cookies: Arc<dyn KeyValueStore>,
  ) -> Self {
    Self {
      persistent,
      session,
      cookies,
    }
  }

  /// Store at the default data location, cookies seeded from the environment.
  pub fn open_default() -> Result<Self> {
    Ok(Self::new(
      Arc::new(SqliteStore::open()?),
      Arc::new(MemoryStore::new()),
      Arc::new(CookieJar::from_env()),
    ))
  }

  /// Everything in memory. Used by tests and one-off tooling.
  pub fn in_memory() -> Self {
    Self::new(
      Arc::new(MemoryStore::new()),
      Arc::new(MemoryStore::new()),
      Arc::new(CookieJar::empty()),
    )
  }

  /// Current access token, walking the fallback chain.
  pub fn get_token(&self) -> Option<String> {
    if let Some(token) = read(self.persistent.as_ref(), ACCESS_TOKEN_KEY, "persistent") {
      return Some(token);
    }

    if let Some(token) = read(self.persistent.as_ref(), ADMIN_TOKEN_KEY, "persistent") {
      return Some(token);
    }

    if let Some(token) = read(self.session.as_ref(), ACCESS_TOKEN_KEY, "session") {
      debug!("access token found in session storage, promoting");
      self.promote(&token);
      return Some(token);
    }

    if let Some(token) = read(self.cookies.as_ref(), ACCESS_TOKEN_KEY, "cookie") {
      debug!("access token found in cookies, promoting");
      self.promote(&token);
      return Some(token);
    }

    None
  }

  pub fn get_refresh_token(&self) -> Option<String> {
    read(self.persistent.as_ref(), REFRESH_TOKEN_KEY, "persistent")
  }

  /// Write both tokens to persistent storage. No shape validation.
  pub fn set_tokens(&self, access: &str, refresh: &str) -> ApiResult<()> {
    self
      .persistent
      .set(ACCESS_TOKEN_KEY, access)
      .map_err(ApiError::storage)?;
    self
      .persistent
      .set(REFRESH_TOKEN_KEY, refresh)
      .map_err(ApiError::storage)
  }

  /// Remove both tokens from persistent storage only.
  pub fn clear_tokens(&self) -> ApiResult<()> {
    self
      .persistent
      .remove(ACCESS_TOKEN_KEY)
      .map_err(ApiError::storage)?;
    self
      .persistent
      .remove(REFRESH_TOKEN_KEY)
      .map_err(ApiError::storage)
  }

  pub fn is_logged_in(&self) -> bool {
    read(self.persistent.as_ref(), LOGGED_IN_KEY, "persistent").as_deref() == Some("true")
  }

  pub fn set_logged_in(&self, logged_in: bool) -> ApiResult<()> {
    let result = if logged_in {
      self.persistent.set(LOGGED_IN_KEY, "true")
    } else {
      self.persistent.remove(LOGGED_IN_KEY)
    };
    result.map_err(ApiError::storage)
  }

  /// Remember where to go once the user has logged in again.
  pub fn remember_redirect(&self, path: &str) -> ApiResult<()> {
    self
      .persistent
      .set(REDIRECT_AFTER_LOGIN_KEY, path)
      .map_err(ApiError::storage)
  }

  /// Read and forget the remembered redirect path.
  pub fn take_redirect(&self) -> Option<String> {
    let path = read(self.persistent.as_ref(), REDIRECT_AFTER_LOGIN_KEY, "persistent")?;
    if let Err(e) = self.persistent.remove(REDIRECT_AFTER_LOGIN_KEY) {
      warn!(error = %e, "failed to forget redirect path");
    }
    Some(path)
  }

  fn promote(&self, token: &str) {
    if let Err(e) = self.persistent.set(ACCESS_TOKEN_KEY, token) {
      warn!(error = %e, "failed to promote access token into persistent storage");
    }
  }
}

fn read(store: &dyn KeyValueStore, key: &str, location: &str) -> Option<String> {
  match store.get(key) {
    Ok(value) => value.filter(|v| !v.is_empty()),
    Err(e) => {
      warn!(error = %e, key, location, "token storage read failed");
      None
    }
  }
}

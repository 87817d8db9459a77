//! Typed access to the dashboard's collections.
//!
//! ```ignore
//! let dashboard = Dashboard::from_config(&config, notifier)?;
//! let page = dashboard.events().list(&ListParams::default(), &cancel).await?;
//! ```

mod auth;
mod cache;
mod events;
mod finance;
mod members;
mod minutes;
mod news;
mod resource;
mod types;
mod uploads;

use color_eyre::Result;
use std::sync::Arc;

use crate::api::{ApiClient, Notifier};
use crate::auth::TokenStore;
use crate::cache::{CacheLayer, CacheStorage, NoopStorage, SqliteStorage};
use crate::config::Config;

pub use auth::{AuthApi, LoginOutcome, SessionStatus};
pub use cache::ListQueryKey;
pub use events::EVENTS_PATH;
pub use finance::{FinanceApi, SummaryPeriod, SUMMARY_PATH, TRANSACTIONS_PATH};
pub use members::MEMBERS_PATH;
pub use minutes::MINUTES_PATH;
pub use news::NEWS_PATH;
pub use resource::{ListParams, Resource, DEFAULT_PAGE_SIZE};
pub use types::{
  Event, FinanceSummary, Id, MeetingMinutes, Member, NewsArticle, Transaction, UploadedFile,
};
pub use uploads::{UploadFile, UploadsApi, UPLOADS_PATH};

/// One year; longer stale times are clamped.
const MAX_STALE_SECS: i64 = 365 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct Dashboard {
  api: ApiClient,
  cache: CacheLayer,
}

impl Dashboard {
  /// Wires `cache` to be cleared whenever `api` gives up on the session.
  pub fn new(api: ApiClient, cache: CacheLayer) -> Self {
    let session_cache = cache.clone();
    let api = api.on_auth_failure(move || session_cache.clear());
    Self { api, cache }
  }

  /// Client with tokens and cache at their default locations.
  pub fn from_config(config: &Config, notifier: Arc<dyn Notifier>) -> Result<Self> {
    let tokens = TokenStore::open_default()?;
    let api = ApiClient::new(config, tokens, notifier)?;

    let storage: Arc<dyn CacheStorage> = if config.cache.enabled {
      match &config.cache.path {
        Some(path) => Arc::new(SqliteStorage::open_at(path)?),
        None => Arc::new(SqliteStorage::open()?),
      }
    } else {
      Arc::new(NoopStorage)
    };
    let stale_secs = i64::try_from(config.cache.stale_secs)
      .unwrap_or(MAX_STALE_SECS)
      .min(MAX_STALE_SECS);
    let cache = CacheLayer::new(storage).with_stale_time(chrono::Duration::seconds(stale_secs));

    Ok(Self::new(api, cache))
  }

  pub fn api(&self) -> &ApiClient {
    &self.api
  }

  pub fn cache(&self) -> &CacheLayer {
    &self.cache
  }

  pub fn auth(&self) -> AuthApi<'_> {
    AuthApi::new(self)
  }

  pub fn events(&self) -> Resource<'_, Event> {
    Resource::new(self, EVENTS_PATH)
  }

  pub fn members(&self) -> Resource<'_, Member> {
    Resource::new(self, MEMBERS_PATH)
  }

  pub fn finance(&self) -> FinanceApi<'_> {
    FinanceApi::new(self)
  }

  pub fn news(&self) -> Resource<'_, NewsArticle> {
    Resource::new(self, NEWS_PATH)
  }

  pub fn meeting_minutes(&self) -> Resource<'_, MeetingMinutes> {
    Resource::new(self, MINUTES_PATH)
  }

  pub fn uploads(&self) -> UploadsApi<'_> {
    UploadsApi::new(self)
  }
}

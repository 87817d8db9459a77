#![allow(dead_code)]

use std::sync::Arc;

use orgdash::api::{ApiClient, CollectingNotifier};
use orgdash::auth::TokenStore;
use orgdash::cache::{CacheLayer, NoopStorage, SqliteStorage};
use orgdash::config::Config;
use orgdash::dashboard::Dashboard;
use wiremock::MockServer;

pub const API: &str = "/api/v1";

/// Client wired to a mock backend, with short retry delays.
pub struct Harness {
  pub server: MockServer,
  pub tokens: TokenStore,
  pub notifier: Arc<CollectingNotifier>,
  pub client: ApiClient,
}

pub fn test_config(uri: &str) -> Config {
  let mut config = Config::default();
  config.api.base_url = uri.to_string();
  config.api.timeout_ms = 5_000;
  config.retry.attempts = 2;
  config.retry.delay_ms = 10;
  config
}

pub async fn harness() -> Harness {
  let server = MockServer::start().await;
  let tokens = TokenStore::in_memory();
  let notifier = Arc::new(CollectingNotifier::new());
  let client = ApiClient::new(&test_config(&server.uri()), tokens.clone(), notifier.clone())
    .expect("failed to create client");

  Harness {
    server,
    tokens,
    notifier,
    client,
  }
}

/// Harness with a stored session.
pub async fn logged_in() -> Harness {
  let h = harness().await;
  h.tokens.set_tokens("access-1", "refresh-1").unwrap();
  h.tokens.set_logged_in(true).unwrap();
  h
}

pub fn uncached(h: &Harness) -> Dashboard {
  Dashboard::new(h.client.clone(), CacheLayer::new(Arc::new(NoopStorage)))
}

pub fn cached(h: &Harness, stale_time: chrono::Duration) -> Dashboard {
  let storage = SqliteStorage::open_in_memory().expect("failed to open cache");
  Dashboard::new(
    h.client.clone(),
    CacheLayer::new(Arc::new(storage)).with_stale_time(stale_time),
  )
}

pub fn api(path: &str) -> String {
  format!("{}{}", API, path)
}

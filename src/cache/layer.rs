//! Cache layer that orchestrates caching logic with network fetching.

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::ApiResult;

use super::storage::CacheStorage;
use super::traits::{CacheResult, QueryKey};

/// Cache layer that manages caching logic and network fetching.
///
/// Storage failures never fail a read: a broken cache behaves like an
/// empty one.
#[derive(Clone)]
pub struct CacheLayer {
  storage: Arc<dyn CacheStorage>,
  /// How long before cached data is considered stale
  stale_time: Duration,
}

impl std::fmt::Debug for CacheLayer {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CacheLayer")
      .field("stale_time", &self.stale_time)
      .finish_non_exhaustive()
  }
}

impl CacheLayer {
  pub fn new(storage: Arc<dyn CacheStorage>) -> Self {
    Self {
      storage,
      stale_time: Duration::minutes(5),
    }
  }

  pub fn with_stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = stale_time;
    self
  }

  fn is_stale(&self, cached_at: DateTime<Utc>) -> bool {
    Utc::now() - cached_at > self.stale_time
  }

  /// Fetch with a cache-first strategy.
  ///
  /// 1. Fresh cache is returned without touching the network
  /// 2. Stale or missing cache triggers the fetcher
  /// 3. If the fetch fails and stale data exists, the stale data is served
  ///    (offline mode); cancellation and auth failures always propagate
  /// 4. Successful fetches replace the cached entry
  pub async fn fetch<T, K, F, Fut>(&self, key: &K, fetcher: F) -> ApiResult<CacheResult<T>>
  where
    T: Serialize + DeserializeOwned,
    K: QueryKey,
    F: FnOnce() -> Fut,
    Fut: Future<Output = ApiResult<T>>,
  {
    let hash = key.cache_hash();

    let Some((cached, cached_at)) = self.lookup::<T>(&hash) else {
      let data = fetcher().await?;
      self.store(key, &hash, &data);
      return Ok(CacheResult::from_network(data));
    };

    if !self.is_stale(cached_at) {
      debug!(query = %key.description(), "serving fresh cache");
      return Ok(CacheResult::from_cache(cached, cached_at));
    }

    match fetcher().await {
      Ok(data) => {
        self.store(key, &hash, &data);
        Ok(CacheResult::from_network(data))
      }
      Err(e) if e.is_cancelled() || e.is_auth_failure() => Err(e),
      Err(e) => {
        warn!(error = %e, query = %key.description(), "fetch failed, serving stale cache");
        Ok(CacheResult::offline(cached, cached_at))
      }
    }
  }

  /// Forget every cached query on `resource`.
  pub fn invalidate(&self, resource: &str) {
    match self.storage.invalidate_resource(resource) {
      Ok(removed) => debug!(resource, removed, "cache invalidated"),
      Err(e) => warn!(error = %e, resource, "cache invalidation failed"),
    }
  }

  pub fn clear(&self) {
    if let Err(e) = self.storage.clear() {
      warn!(error = %e, "failed to clear cache");
    }
  }

  fn lookup<T: DeserializeOwned>(&self, hash: &str) -> Option<(T, DateTime<Utc>)> {
    let entry = match self.storage.get(hash) {
      Ok(entry) => entry?,
      Err(e) => {
        warn!(error = %e, "cache read failed");
        return None;
      }
    };

    match serde_json::from_slice(&entry.data) {
      Ok(data) => Some((data, entry.cached_at)),
      Err(e) => {
        warn!(error = %e, "discarding undecodable cache entry");
        None
      }
    }
  }

  fn store<T: Serialize, K: QueryKey>(&self, key: &K, hash: &str, data: &T) {
    let bytes = match serde_json::to_vec(data) {
      Ok(bytes) => bytes,
      Err(e) => {
        warn!(error = %e, "failed to serialize cache entry");
        return;
      }
    };

    if let Err(e) = self
      .storage
      .put(hash, key.resource(), &key.description(), &bytes)
    {
      warn!(error = %e, "cache write failed");
    }
  }
}

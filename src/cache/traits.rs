//! Core traits and types for the caching system.

use chrono::{DateTime, Utc};

/// Identifies one cacheable query.
pub trait QueryKey {
  /// Stable, fixed-length key for storage lookups
  fn cache_hash(&self) -> String;

  /// Human-readable description, stored alongside for debugging
  fn description(&self) -> String;

  /// Resource the query reads from; writes to it invalidate the entry
  fn resource(&self) -> &str;
}

/// Result from a cache operation, including data and metadata about the source.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  pub data: T,
  pub source: CacheSource,
  /// When the data was cached (if from cache)
  pub cached_at: Option<DateTime<Utc>>,
}

impl<T> CacheResult<T> {
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
      cached_at: None,
    }
  }

  pub fn from_cache(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::CacheFresh,
      cached_at: Some(cached_at),
    }
  }

  /// Stale data served because the network fetch failed.
  pub fn offline(data: T, cached_at: DateTime<Utc>) -> Self {
    Self {
      data,
      source: CacheSource::Offline,
      cached_at: Some(cached_at),
    }
  }

  /// Placeholder answer: the fetch failed and nothing was cached.
  pub fn unavailable(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Unavailable,
      cached_at: None,
    }
  }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CacheResult<U> {
    CacheResult {
      data: f(self.data),
      source: self.source,
      cached_at: self.cached_at,
    }
  }
}

/// Indicates where cached data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fresh data from network
  Network,
  /// Data from cache, still considered fresh
  CacheFresh,
  /// Offline mode - network unavailable, serving stale cached data
  Offline,
  /// Network unavailable and nothing cached; data is an empty placeholder
  Unavailable,
}

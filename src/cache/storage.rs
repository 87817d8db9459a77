//! Cache storage trait and SQLite implementation.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A cached query answer.
#[derive(Debug, Clone)]
pub struct CachedEntry {
  /// Serialized JSON payload
  pub data: Vec<u8>,
  pub cached_at: DateTime<Utc>,
}

/// Trait for cache storage backends.
pub trait CacheStorage: Send + Sync {
  fn get(&self, query_hash: &str) -> Result<Option<CachedEntry>>;

  fn put(&self, query_hash: &str, resource: &str, description: &str, data: &[u8]) -> Result<()>;

  /// Drop every entry read from `resource`. Returns how many were removed.
  fn invalidate_resource(&self, resource: &str) -> Result<usize>;

  fn clear(&self) -> Result<()>;
}

/// Storage implementation that doesn't cache anything.
/// Used when caching is disabled - all operations are no-ops.
pub struct NoopStorage;

impl CacheStorage for NoopStorage {
  fn get(&self, _query_hash: &str) -> Result<Option<CachedEntry>> {
    Ok(None) // Always miss
  }

  fn put(&self, _query_hash: &str, _resource: &str, _description: &str, _data: &[u8]) -> Result<()> {
    Ok(()) // Discard
  }

  fn invalidate_resource(&self, _resource: &str) -> Result<usize> {
    Ok(0)
  }

  fn clear(&self) -> Result<()> {
    Ok(())
  }
}

/// SQLite-based cache storage implementation.
pub struct SqliteStorage {
  conn: Mutex<Connection>,
}

/// Schema for cache tables.
const CACHE_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS query_cache (
    query_hash TEXT PRIMARY KEY,
    resource TEXT NOT NULL,
    query_description TEXT NOT NULL,
    data BLOB NOT NULL,
    cached_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_query_cache_resource ON query_cache(resource);
"#;

impl SqliteStorage {
  /// Create a new SQLite storage at the default location.
  pub fn open() -> Result<Self> {
    Self::open_at(&Self::default_path()?)
  }

  pub fn open_at(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent)
        .map_err(|e| eyre!("Failed to create cache directory: {}", e))?;
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open cache database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory cache database: {}", e))?;
    Self::with_connection(conn)
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(CACHE_SCHEMA)
      .map_err(|e| eyre!("Failed to run cache migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// Get the default database path.
  fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("orgdash").join("cache.db"))
  }

  /// Backdate an entry. Lets tests exercise staleness without sleeping.
  #[cfg(test)]
  pub(crate) fn age_entry(&self, query_hash: &str, seconds: i64) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    conn.execute(
      "UPDATE query_cache SET cached_at = datetime('now', ?) WHERE query_hash = ?",
      params![format!("-{} seconds", seconds), query_hash],
    )?;
    Ok(())
  }
}

impl CacheStorage for SqliteStorage {
  fn get(&self, query_hash: &str) -> Result<Option<CachedEntry>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let row: Option<(Vec<u8>, String)> = conn
      .query_row(
        "SELECT data, cached_at FROM query_cache WHERE query_hash = ?",
        params![query_hash],
        |row| Ok((row.get(0)?, row.get(1)?)),
      )
      .optional()
      .map_err(|e| eyre!("Failed to read cache entry: {}", e))?;

    match row {
      Some((data, cached_at_str)) => Ok(Some(CachedEntry {
        data,
        cached_at: parse_datetime(&cached_at_str)?,
      })),
      None => Ok(None),
    }
  }

  fn put(&self, query_hash: &str, resource: &str, description: &str, data: &[u8]) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute(
        "INSERT OR REPLACE INTO query_cache (query_hash, resource, query_description, data, cached_at)
         VALUES (?, ?, ?, ?, datetime('now'))",
        params![query_hash, resource, description, data],
      )
      .map_err(|e| eyre!("Failed to store cache entry: {}", e))?;

    Ok(())
  }

  fn invalidate_resource(&self, resource: &str) -> Result<usize> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM query_cache WHERE resource = ?", params![resource])
      .map_err(|e| eyre!("Failed to invalidate {}: {}", resource, e))
  }

  fn clear(&self) -> Result<()> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    conn
      .execute("DELETE FROM query_cache", [])
      .map_err(|e| eyre!("Failed to clear cache: {}", e))?;

    Ok(())
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}

use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing::warn;

use super::memory::MemoryStore;
use super::traits::KeyValueStore;

/// Cookies parsed from a `Cookie` header value (`name=value; other=value`).
///
/// Typically seeded from `ORGDASH_COOKIE`, or from the file named by
/// `ORGDASH_COOKIE_FILE` (a header exported from a browser session). Writes stay in memory and are never sent anywhere.
#[derive(Debug, Default)]
pub struct CookieJar {
  cookies: MemoryStore,
}

impl CookieJar {
  pub fn empty() -> Self {
    Self::default()
  }

  /// Parse a header value. Malformed pairs are skipped.
  pub fn parse(header: &str) -> Self {
    let jar = Self::empty();
    let header = header
      .trim()
      .strip_prefix("Cookie:")
      .unwrap_or(header)
      .trim();

    for pair in header.split(';') {
      let Some((name, value)) = pair.split_once('=') else {
        continue;
      };
      let name = name.trim();
      if name.is_empty() {
        continue;
      }
      let value = value.trim().trim_matches('"');
      // MemoryStore only fails on a poisoned lock, which cannot happen here
      let _ = jar.cookies.set(name, value);
    }

    jar
  }

  pub fn from_file(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read cookie file {}: {}", path.display(), e))?;
    Ok(Self::parse(contents.lines().next().unwrap_or_default()))
  }

  /// Jar from the process environment; see `from_lookup`.
  pub fn from_env() -> Self {
    Self::from_lookup(|name| std::env::var(name).ok())
  }

  /// `ORGDASH_COOKIE` wins over `ORGDASH_COOKIE_FILE`. An unreadable file
  /// is logged and yields an empty jar.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    if let Some(header) = lookup("ORGDASH_COOKIE") {
      return Self::parse(&header);
    }

    match lookup("ORGDASH_COOKIE_FILE") {
      Some(path) => Self::from_file(Path::new(&path)).unwrap_or_else(|e| {
        warn!(error = %e, "ignoring cookie file");
        Self::empty()
      }),
      None => Self::empty(),
    }
  }
}

impl KeyValueStore for CookieJar {
  fn get(&self, key: &str) -> Result<Option<String>> {
    Ok(self.cookies.get(key)?.filter(|v| !v.is_empty()))
  }

  fn set(&self, key: &str, value: &str) -> Result<()> {
    self.cookies.set(key, value)
  }

  fn remove(&self, key: &str) -> Result<()> {
    self.cookies.remove(key)
  }
}

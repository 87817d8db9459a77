use color_eyre::Result;

/// A string-to-string store, the shape shared by every session backend.
pub trait KeyValueStore: Send + Sync {
  fn get(&self, key: &str) -> Result<Option<String>>;

  fn set(&self, key: &str, value: &str) -> Result<()>;

  /// Removing a missing key is not an error.
  fn remove(&self, key: &str) -> Result<()>;
}

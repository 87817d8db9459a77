//! Read-path cache for list queries.
//!
//! Keeps the last good answer of every list query so reads can:
//! - skip the network while the answer is fresh
//! - refetch once it goes stale
//! - fall back to the stale answer when the backend is unreachable

mod layer;
mod storage;
mod traits;

pub use layer::CacheLayer;
pub use storage::{CacheStorage, CachedEntry, NoopStorage, SqliteStorage};
pub use traits::{CacheResult, CacheSource, QueryKey};

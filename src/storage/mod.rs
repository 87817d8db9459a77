//! Key/value stores that hold client-side session state.
//!
//! Three kinds mirror where a browser keeps credentials:
//! - persistent storage that survives restarts (SQLite)
//! - session-scoped storage that lives as long as the process (memory)
//! - cookies handed over from elsewhere (parsed `Cookie` header)

mod cookie;
mod memory;
mod sqlite;
mod traits;

pub use cookie::CookieJar;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::KeyValueStore;

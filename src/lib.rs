//! Resilient client for the organization dashboard backend.
//!
//! - `api`: HTTP client core with auth injection, refresh-and-replay,
//!   retry with exponential backoff and list normalization
//! - `auth`: token storage with its fallback chain
//! - `dashboard`: typed access to events, members, finance, news,
//!   meeting minutes and uploads
//! - `cache`: read-path cache that keeps lists available offline
//! - `query`: polling fetch state for interactive front ends

pub mod api;
pub mod auth;
pub mod cache;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod logging;
pub mod query;
pub mod storage;

pub use api::ApiClient;
pub use config::Config;
pub use dashboard::Dashboard;
pub use error::{ApiError, ApiResult};

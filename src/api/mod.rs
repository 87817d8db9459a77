//! HTTP access to the dashboard backend: client core, retry policy,
//! response normalization and the notification seam.

mod client;
mod notify;
mod request;
mod retry;
mod session;

pub mod normalize;

pub use client::{ApiClient, AuthFailureHook};
pub use normalize::{normalize, normalize_as, NormalizedListResponse, PaginationMeta, RawListPayload};
pub use notify::{CollectingNotifier, Notification, Notifier, TracingNotifier, LOGIN_ROUTE};
pub use request::{
  ApiRequest, AuthMode, MultipartField, PartData, RequestBody, LOGIN_PATH, LOGOUT_PATH,
  REFRESH_PATH, REGISTER_PATH,
};
pub use retry::{with_retry, RetryPolicy, Retryable};
pub use session::TokenGrant;

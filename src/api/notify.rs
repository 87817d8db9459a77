//! User-facing notifications raised by the HTTP layer.
//!
//! The HTTP layer decides *that* something must be shown (a server error
//! toast, a redirect to the login screen); the front end decides *how*.

use std::sync::Mutex;
use tracing::{error, warn};

/// Where the front end sends the user once credentials are gone.
pub const LOGIN_ROUTE: &str = "/login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
  /// The backend failed with a 5xx. The error is still propagated.
  ServerError { status: u16, message: String },
  /// Credentials were cleared; navigate to `redirect_to`.
  AuthFailed { redirect_to: String },
}

pub trait Notifier: Send + Sync {
  fn notify(&self, notification: Notification);
}

/// Logs notifications and nothing else.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
  fn notify(&self, notification: Notification) {
    match notification {
      Notification::ServerError { status, message } => {
        warn!(status, message = %message, "server error");
      }
      Notification::AuthFailed { redirect_to } => {
        error!(redirect_to = %redirect_to, "authentication failed, login required");
      }
    }
  }
}

/// Keeps notifications until the front end drains them.
#[derive(Debug, Default)]
pub struct CollectingNotifier {
  pending: Mutex<Vec<Notification>>,
}

impl CollectingNotifier {
  pub fn new() -> Self {
    Self::default()
  }

  /// Take everything collected so far, oldest first.
  pub fn drain(&self) -> Vec<Notification> {
    match self.pending.lock() {
      Ok(mut pending) => std::mem::take(&mut *pending),
      Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
    }
  }
}

impl Notifier for CollectingNotifier {
  fn notify(&self, notification: Notification) {
    match self.pending.lock() {
      Ok(mut pending) => pending.push(notification),
      Err(poisoned) => poisoned.into_inner().push(notification),
    }
  }
}

//! Async query abstraction for data fetching.
//!
//! Inspired by TanStack Query, `Query<T>` owns one fetch at a time and
//! exposes its loading, success and error states to a polling consumer.
//! Every fetch gets its own cancellation token: a refetch supersedes and
//! cancels the fetch before it, and a cancelled fetch never surfaces as an
//! error.
//!
//! # Example
//!
//! ```ignore
//! let dashboard = dashboard.clone();
//! let mut query = Query::new(move |cancel| {
//!     let dashboard = dashboard.clone();
//!     async move { dashboard.events().list(&ListParams::default(), &cancel).await }
//! });
//!
//! query.fetch();
//!
//! // In the event loop tick
//! if query.poll() {
//!     // State changed, re-render
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::ApiResult;

#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Not started, or cancelled before completing
  Idle,
  Loading,
  Success(T),
  /// User-facing message of the failure
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn is_success(&self) -> bool {
    matches!(self, QueryState::Success(_))
  }

  pub fn is_error(&self) -> bool {
    matches!(self, QueryState::Error(_))
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = ApiResult<T>> + Send>>;

type FetcherFn<T> = Box<dyn Fn(CancellationToken) -> BoxFuture<T> + Send + Sync>;

struct InFlight<T> {
  receiver: mpsc::UnboundedReceiver<ApiResult<T>>,
  cancel: CancellationToken,
}

pub struct Query<T> {
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  in_flight: Option<InFlight<T>>,
  fetched_at: Option<Instant>,
  stale_time: Duration,
}

impl<T: Send + 'static> Query<T> {
  /// The fetcher is called with a fresh cancellation token on every
  /// `fetch()` or `refetch()` and should hand it to the API call.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ApiResult<T>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move |cancel| Box::pin(fetcher(cancel))),
      in_flight: None,
      fetched_at: None,
      stale_time: Duration::from_secs(60),
    }
  }

  pub fn with_stale_time(mut self, duration: Duration) -> Self {
    self.stale_time = duration;
    self
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn is_success(&self) -> bool {
    self.state.is_success()
  }

  pub fn is_error(&self) -> bool {
    self.state.is_error()
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Successful data older than the stale time.
  pub fn is_stale(&self) -> bool {
    match &self.state {
      QueryState::Success(_) => self
        .fetched_at
        .map(|t| t.elapsed() > self.stale_time)
        .unwrap_or(true),
      _ => false,
    }
  }

  /// Start fetching unless a fetch is already running.
  pub fn fetch(&mut self) {
    if self.in_flight.is_some() {
      return;
    }
    self.start_fetch();
  }

  /// Cancel whatever is running and fetch again.
  pub fn refetch(&mut self) {
    self.abort_in_flight();
    self.start_fetch();
  }

  /// Abandon the running fetch and go back to idle.
  pub fn cancel(&mut self) {
    if self.abort_in_flight() {
      self.state = QueryState::Idle;
    }
  }

  /// Collect the result of a pending fetch.
  ///
  /// Returns `true` if the state changed.
  pub fn poll(&mut self) -> bool {
    let Some(in_flight) = &mut self.in_flight else {
      return false;
    };

    let result = match in_flight.receiver.try_recv() {
      Ok(result) => result,
      Err(mpsc::error::TryRecvError::Empty) => return false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Fetch task ended without an answer (panicked or was aborted)
        self.in_flight = None;
        self.state = QueryState::Idle;
        return true;
      }
    };
    self.in_flight = None;

    match result {
      Ok(data) => {
        self.state = QueryState::Success(data);
        self.fetched_at = Some(Instant::now());
      }
      Err(e) if e.is_cancelled() => {
        debug!("query cancelled");
        self.state = QueryState::Idle;
      }
      Err(e) => self.state = QueryState::Error(e.user_message()),
    }
    true
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();
    self.in_flight = Some(InFlight {
      receiver: rx,
      cancel: cancel.clone(),
    });
    self.state = QueryState::Loading;

    let future = (self.fetcher)(cancel);
    tokio::spawn(async move {
      let result = future.await;
      // Receiver is gone when the fetch was superseded
      let _ = tx.send(result);
    });
  }

  fn abort_in_flight(&mut self) -> bool {
    match self.in_flight.take() {
      Some(in_flight) => {
        in_flight.cancel.cancel();
        true
      }
      None => false,
    }
  }
}

impl<T> Drop for Query<T> {
  fn drop(&mut self) {
    if let Some(in_flight) = &self.in_flight {
      in_flight.cancel.cancel();
    }
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .field("fetched_at", &self.fetched_at)
      .field("stale_time", &self.stale_time)
      .finish_non_exhaustive()
  }
}

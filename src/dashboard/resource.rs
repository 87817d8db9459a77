//! Generic CRUD access to one backend collection.
//!
//! Reads go through the list cache and degrade instead of failing: when the
//! backend is unreachable or misbehaves, a list read yields the last cached
//! page or an empty one. Cancellation and authentication problems are never
//! masked, and no cached page is served without an access token.
//! Single-entity reads and all writes propagate every error, and
//! writes drop the collection's cached pages.

use futures::stream::{self, LocalBoxStream, StreamExt, TryStreamExt};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::marker::PhantomData;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::{normalize, ApiRequest, NormalizedListResponse};
use crate::cache::CacheResult;
use crate::error::{ApiError, ApiResult};

use super::cache::ListQueryKey;
use super::types::Id;
use super::Dashboard;

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Page, search and filters for a list read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
  pub page: u32,
  pub limit: u32,
  pub search: Option<String>,
  /// Extra query parameters, e.g. `("status", "upcoming")`
  pub filters: Vec<(String, String)>,
}

impl Default for ListParams {
  fn default() -> Self {
    Self {
      page: 1,
      limit: DEFAULT_PAGE_SIZE,
      search: None,
      filters: Vec::new(),
    }
  }
}

impl ListParams {
  pub fn page(mut self, page: u32) -> Self {
    self.page = page.max(1);
    self
  }

  pub fn limit(mut self, limit: u32) -> Self {
    self.limit = limit.max(1);
    self
  }

  pub fn search(mut self, search: impl Into<String>) -> Self {
    let search = search.into();
    self.search = if search.trim().is_empty() {
      None
    } else {
      Some(search)
    };
    self
  }

  pub fn filter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.filters.push((key.into(), value.into()));
    self
  }

  fn apply(&self, mut request: ApiRequest) -> ApiRequest {
    request = request
      .query("page", self.page)
      .query("limit", self.limit);
    if let Some(search) = &self.search {
      request = request.query("search", search.trim());
    }
    for (key, value) in &self.filters {
      request = request.query(key.clone(), value);
    }
    request
  }
}

/// Typed handle on one collection, e.g. `/events`.
pub struct Resource<'a, T> {
  dashboard: &'a Dashboard,
  path: &'static str,
  timeout: Option<Duration>,
  _marker: PhantomData<fn() -> T>,
}

impl<'a, T: DeserializeOwned> Resource<'a, T> {
  pub(crate) fn new(dashboard: &'a Dashboard, path: &'static str) -> Self {
    Self {
      dashboard,
      path,
      timeout: None,
      _marker: PhantomData,
    }
  }

  pub(crate) fn with_timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  pub fn path(&self) -> &'static str {
    self.path
  }

  /// One page of the collection.
  pub async fn list(
    &self,
    params: &ListParams,
    cancel: &CancellationToken,
  ) -> ApiResult<NormalizedListResponse<T>> {
    Ok(self.list_cached(params, cancel).await?.data)
  }

  /// Like `list`, also reporting whether the page came from the network,
  /// the cache, or is a placeholder.
  pub async fn list_cached(
    &self,
    params: &ListParams,
    cancel: &CancellationToken,
  ) -> ApiResult<CacheResult<NormalizedListResponse<T>>> {
    match self.fetch_page(params, cancel).await {
      Ok(result) => Ok(result.map(|page| page.into_typed())),
      Err(e) if must_propagate(&e) => Err(e),
      Err(e) => {
        warn!(error = %e, resource = self.path, "list unavailable, returning an empty page");
        Ok(CacheResult::unavailable(NormalizedListResponse::empty(
          params.page,
          params.limit,
        )))
      }
    }
  }

  /// Pages of the collection in order, starting at page 1.
  ///
  /// Ends after the last reported page, on an empty page, or when the
  /// backend ignores pagination and returns more than a page's worth.
  /// Failures are yielded rather than degraded so a partial walk is never
  /// mistaken for the whole collection.
  pub fn pages<'s>(
    &'s self,
    params: &ListParams,
    cancel: &'s CancellationToken,
  ) -> LocalBoxStream<'s, ApiResult<NormalizedListResponse<T>>> {
    let first = params.clone().page(1);
    stream::try_unfold(Some(first), move |next| self.next_page(next, cancel)).boxed_local()
  }

  /// Every item of the collection.
  pub async fn list_all(&self, params: &ListParams, cancel: &CancellationToken) -> ApiResult<Vec<T>> {
    let pages: Vec<NormalizedListResponse<T>> = self.pages(params, cancel).try_collect().await?;
    Ok(pages.into_iter().flat_map(|page| page.data).collect())
  }

  pub async fn get(&self, id: &Id, cancel: &CancellationToken) -> ApiResult<T> {
    let request = self.request(ApiRequest::get(self.item_path(id)));
    let body = self.dashboard.api.send(request, cancel).await?;
    decode_entity(body)
  }

  pub async fn create<B: Serialize + ?Sized>(
    &self,
    body: &B,
    cancel: &CancellationToken,
  ) -> ApiResult<T> {
    let request = self.request(ApiRequest::post(self.path).json(body)?);
    let body = self.dashboard.api.send(request, cancel).await?;
    self.dashboard.cache.invalidate(self.path);
    decode_entity(body)
  }

  pub async fn update<B: Serialize + ?Sized>(
    &self,
    id: &Id,
    body: &B,
    cancel: &CancellationToken,
  ) -> ApiResult<T> {
    let request = self.request(ApiRequest::put(self.item_path(id)).json(body)?);
    let body = self.dashboard.api.send(request, cancel).await?;
    self.dashboard.cache.invalidate(self.path);
    decode_entity(body)
  }

  pub async fn delete(&self, id: &Id, cancel: &CancellationToken) -> ApiResult<()> {
    let request = self.request(ApiRequest::delete(self.item_path(id)));
    self.dashboard.api.send(request, cancel).await?;
    self.dashboard.cache.invalidate(self.path);
    Ok(())
  }

  async fn fetch_page(
    &self,
    params: &ListParams,
    cancel: &CancellationToken,
  ) -> ApiResult<CacheResult<NormalizedListResponse<Value>>> {
    let api = &self.dashboard.api;
    // Cached pages belong to a session; without one nothing is served
    if api.tokens().get_token().is_none() {
      return Err(ApiError::MissingToken {
        path: self.path.to_string(),
      });
    }

    let key = ListQueryKey::new(api.root(), self.path, params);
    let request = self.request(params.apply(ApiRequest::get(self.path)));
    let (page, limit) = (params.page, params.limit);

    self
      .dashboard
      .cache
      .fetch(&key, || async move {
        let raw = api.send(request, cancel).await?;
        Ok(normalize(raw, page, limit))
      })
      .await
  }

  async fn next_page(
    &self,
    params: Option<ListParams>,
    cancel: &CancellationToken,
  ) -> ApiResult<Option<(NormalizedListResponse<T>, Option<ListParams>)>> {
    let Some(params) = params else {
      return Ok(None);
    };

    let page = self.fetch_page(&params, cancel).await?.data;
    let count = page.data.len();
    let total_pages = page.meta.total_pages;
    debug!(resource = self.path, page = params.page, total_pages, count, "fetched page");

    let last = count == 0 || count > params.limit as usize || params.page >= total_pages;
    let next = if last {
      None
    } else {
      let following = params.page + 1;
      Some(params.page(following))
    };

    Ok(Some((page.into_typed(), next)))
  }

  fn request(&self, request: ApiRequest) -> ApiRequest {
    match self.timeout {
      Some(timeout) => request.timeout(timeout),
      None => request,
    }
  }

  fn item_path(&self, id: &Id) -> String {
    format!("{}/{}", self.path, id)
  }
}

/// Errors a list read must surface instead of degrading.
fn must_propagate(err: &ApiError) -> bool {
  err.is_cancelled() || err.is_auth_failure()
}

/// Single entities come back bare or wrapped as `{"data": {...}}`.
pub(crate) fn decode_entity<T: DeserializeOwned>(body: Value) -> ApiResult<T> {
  let entity = match body {
    Value::Object(mut obj) if matches!(obj.get("data"), Some(Value::Object(_))) => {
      obj.remove("data").unwrap_or(Value::Null)
    }
    other => other,
  };
  Ok(serde_json::from_value(entity)?)
}

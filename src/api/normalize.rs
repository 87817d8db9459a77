//! List payload normalization.
//!
//! The backend answers list endpoints in one of several shapes. Everything
//! is funnelled into `NormalizedListResponse` so callers never probe shapes
//! themselves. Normalization is pure and total: malformed payloads degrade
//! to an empty list, they never fail.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationMeta {
  pub page: u32,
  pub limit: u32,
  /// Always at least 1, even for an empty list
  pub total_pages: u32,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub total_count: Option<u64>,
}

impl PaginationMeta {
  /// Meta for a list that was not paginated by the backend.
  pub fn synthesize(page: u32, limit: u32, len: usize) -> Self {
    let len = len as u64;
    Self {
      page,
      limit,
      total_pages: total_pages(len, limit),
      total_count: Some(len),
    }
  }

  pub fn empty(page: u32, limit: u32) -> Self {
    Self::synthesize(page, limit, 0)
  }

  /// Clamp a requested page into `[1, total_pages]`.
  pub fn clamp_page(&self, page: u32) -> u32 {
    page.clamp(1, self.total_pages.max(1))
  }

  pub fn has_next(&self) -> bool {
    self.page < self.total_pages
  }

  pub fn has_previous(&self) -> bool {
    self.page > 1
  }
}

fn total_pages(count: u64, limit: u32) -> u32 {
  let limit = u64::from(limit.max(1));
  let pages = count.div_ceil(limit).max(1);
  u32::try_from(pages).unwrap_or(u32::MAX)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedListResponse<T> {
  pub data: Vec<T>,
  pub meta: PaginationMeta,
}

impl<T> NormalizedListResponse<T> {
  pub fn empty(page: u32, limit: u32) -> Self {
    Self {
      data: Vec::new(),
      meta: PaginationMeta::empty(page, limit),
    }
  }
}

impl NormalizedListResponse<Value> {
  /// Deserialize every item into `T`. Items that do not fit are dropped
  /// with a warning; the meta is left as the backend reported it.
  pub fn into_typed<T: DeserializeOwned>(self) -> NormalizedListResponse<T> {
    let total = self.data.len();
    let data: Vec<T> = self
      .data
      .into_iter()
      .filter_map(|item| match serde_json::from_value(item) {
        Ok(v) => Some(v),
        Err(e) => {
          warn!(error = %e, "dropping list item that does not match the expected shape");
          None
        }
      })
      .collect();

    if data.len() != total {
      warn!(kept = data.len(), total, "some list items were dropped");
    }

    NormalizedListResponse {
      data,
      meta: self.meta,
    }
  }
}

/// The shapes a list payload can take on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum RawListPayload {
  /// `{ "data": [...], "meta": {...} }`
  Canonical { data: Vec<Value>, meta: Map<String, Value> },
  /// `[...]`
  BareArray(Vec<Value>),
  /// Anything else, including `null`
  Unrecognized(Value),
}

impl RawListPayload {
  pub fn classify(raw: Value) -> Self {
    match raw {
      Value::Array(items) => Self::BareArray(items),
      Value::Object(obj) => match (obj.get("data"), obj.get("meta")) {
        (Some(Value::Array(_)), Some(Value::Object(_))) => {
          let mut obj = obj;
          let data = match obj.remove("data") {
            Some(Value::Array(data)) => data,
            _ => Vec::new(),
          };
          let meta = match obj.remove("meta") {
            Some(Value::Object(meta)) => meta,
            _ => Map::new(),
          };
          Self::Canonical { data, meta }
        }
        _ => Self::Unrecognized(Value::Object(obj)),
      },
      other => Self::Unrecognized(other),
    }
  }
}

/// Normalize a raw list payload for the requested page and limit.
pub fn normalize(raw: Value, page: u32, limit: u32) -> NormalizedListResponse<Value> {
  match RawListPayload::classify(raw) {
    RawListPayload::Canonical { data, meta } => {
      let meta = reconcile_meta(&meta, page, limit, data.len());
      NormalizedListResponse { data, meta }
    }
    RawListPayload::BareArray(data) => wrap(data, page, limit),
    RawListPayload::Unrecognized(Value::Object(obj)) => {
      // First array-valued property in document order; first match, not best match
      let first_array = obj.into_iter().find_map(|(_, v)| match v {
        Value::Array(items) => Some(items),
        _ => None,
      });
      match first_array {
        Some(items) => wrap(items, page, limit),
        None => NormalizedListResponse::empty(page, limit),
      }
    }
    RawListPayload::Unrecognized(_) => NormalizedListResponse::empty(page, limit),
  }
}

/// Normalize and deserialize in one step.
pub fn normalize_as<T: DeserializeOwned>(
  raw: Value,
  page: u32,
  limit: u32,
) -> NormalizedListResponse<T> {
  normalize(raw, page, limit).into_typed()
}

fn wrap(data: Vec<Value>, page: u32, limit: u32) -> NormalizedListResponse<Value> {
  let meta = PaginationMeta::synthesize(page, limit, data.len());
  NormalizedListResponse { data, meta }
}

/// Build meta from what the backend sent, filling gaps from the request.
/// A complete meta comes back unchanged.
fn reconcile_meta(meta: &Map<String, Value>, page: u32, limit: u32, len: usize) -> PaginationMeta {
  let page = meta_u32(meta, &["page", "current_page", "currentPage"]).unwrap_or(page);
  let limit = meta_u32(meta, &["limit", "per_page", "perPage"]).unwrap_or(limit);
  let total_count = meta_u64(meta, &["total_count", "totalCount", "total"]);
  let total_pages = meta_u32(meta, &["total_pages", "totalPages"])
    .unwrap_or_else(|| total_pages(total_count.unwrap_or(len as u64), limit))
    .max(1);

  PaginationMeta {
    page,
    limit,
    total_pages,
    total_count,
  }
}

fn meta_u64(meta: &Map<String, Value>, keys: &[&str]) -> Option<u64> {
  keys.iter().find_map(|key| match meta.get(*key)? {
    Value::Number(n) => n.as_u64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  })
}

fn meta_u32(meta: &Map<String, Value>, keys: &[&str]) -> Option<u32> {
  meta_u64(meta, keys).and_then(|v| u32::try_from(v).ok())
}

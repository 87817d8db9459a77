//! Cache keys for dashboard list queries.

use sha2::{Digest, Sha256};

use crate::cache::QueryKey;

use super::resource::ListParams;

/// One page of one resource, as requested from one backend.
#[derive(Clone, Debug)]
pub struct ListQueryKey {
  root: String,
  resource: String,
  params: ListParams,
}

impl ListQueryKey {
  pub fn new(root: &str, resource: &str, params: &ListParams) -> Self {
    Self {
      root: root.to_string(),
      resource: resource.to_string(),
      params: params.clone(),
    }
  }
}

impl QueryKey for ListQueryKey {
  fn cache_hash(&self) -> String {
    let mut filters: Vec<String> = self
      .params
      .filters
      .iter()
      .map(|(k, v)| format!("{}={}", k, v))
      .collect();
    filters.sort();

    let input = format!(
      "list:{}{}:{}:{}:{}:{}",
      self.root,
      self.resource,
      self.params.page,
      self.params.limit,
      self
        .params
        .search
        .as_deref()
        .map(str::trim)
        .unwrap_or_default(),
      filters.join("&")
    );

    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
  }

  fn description(&self) -> String {
    let mut description = format!(
      "{} page {} (limit {})",
      self.resource, self.params.page, self.params.limit
    );
    if let Some(search) = &self.params.search {
      description.push_str(&format!(" search: {}", search));
    }
    description
  }

  fn resource(&self) -> &str {
    &self.resource
  }
}

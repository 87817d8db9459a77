use tokio_util::sync::CancellationToken;

use crate::api::NormalizedListResponse;
use crate::error::ApiResult;

use super::resource::{ListParams, Resource};
use super::types::NewsArticle;

pub const NEWS_PATH: &str = "/news";

impl Resource<'_, NewsArticle> {
  pub async fn published(
    &self,
    params: &ListParams,
    cancel: &CancellationToken,
  ) -> ApiResult<NormalizedListResponse<NewsArticle>> {
    let params = params.clone().filter("published", "true");
    self.list(&params, cancel).await
  }
}

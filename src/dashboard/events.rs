//! Events calendar.

use tokio_util::sync::CancellationToken;

use crate::api::NormalizedListResponse;
use crate::error::ApiResult;

use super::resource::{ListParams, Resource};
use super::types::Event;

pub const EVENTS_PATH: &str = "/events";

impl Resource<'_, Event> {
  /// Events that have not happened yet, soonest first as the backend orders them.
  pub async fn upcoming(
    &self,
    limit: u32,
    cancel: &CancellationToken,
  ) -> ApiResult<NormalizedListResponse<Event>> {
    let params = ListParams::default()
      .limit(limit)
      .filter("status", "upcoming");
    self.list(&params, cancel).await
  }
}

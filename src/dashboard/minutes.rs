//! Meeting minutes archive.

use tokio_util::sync::CancellationToken;

use crate::error::ApiResult;

use super::resource::{ListParams, Resource};
use super::types::MeetingMinutes;

pub const MINUTES_PATH: &str = "/meeting-minutes";

impl Resource<'_, MeetingMinutes> {
  /// Minutes whose meeting fell in `[from, to]` (ISO dates, inclusive).
  pub async fn between(
    &self,
    from: &str,
    to: &str,
    cancel: &CancellationToken,
  ) -> ApiResult<Vec<MeetingMinutes>> {
    let params = ListParams::default()
      .filter("from", from)
      .filter("to", to);
    self.list_all(&params, cancel).await
  }
}

//! Member directory.

use tokio_util::sync::CancellationToken;

use crate::error::ApiResult;

use super::resource::{ListParams, Resource};
use super::types::Member;

pub const MEMBERS_PATH: &str = "/members";

impl Resource<'_, Member> {
  /// Search by email and keep only an exact, case-insensitive match.
  pub async fn find_by_email(
    &self,
    email: &str,
    cancel: &CancellationToken,
  ) -> ApiResult<Option<Member>> {
    let email = email.trim();
    let page = self.list(&ListParams::default().search(email), cancel).await?;

    Ok(page.data.into_iter().find(|member| {
      member
        .email
        .as_deref()
        .is_some_and(|e| e.eq_ignore_ascii_case(email))
    }))
  }
}

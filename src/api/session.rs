//! Token payloads returned by the auth endpoints.

use serde_json::Value;

use crate::error::{ApiError, ApiResult};

/// Tokens extracted from a login or refresh response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenGrant {
  pub access_token: String,
  /// Some backends only rotate the access token on refresh
  pub refresh_token: Option<String>,
}

const ACCESS_FIELDS: &[&str] = &["token", "access_token", "accessToken"];
const REFRESH_FIELDS: &[&str] = &["refreshToken", "refresh_token"];

impl TokenGrant {
  /// Accepts the token fields at the top level or nested under `data`.
  pub fn from_response(body: &Value) -> ApiResult<Self> {
    let scopes = [Some(body), body.get("data")];

    let find = |fields: &[&str]| {
      scopes.iter().flatten().find_map(|scope| {
        fields
          .iter()
          .find_map(|f| scope.get(*f).and_then(Value::as_str))
          .filter(|s| !s.is_empty())
          .map(String::from)
      })
    };

    let access_token = find(ACCESS_FIELDS).ok_or_else(|| ApiError::InvalidResponse {
      message: "token response carries no access token".to_string(),
    })?;

    Ok(Self {
      access_token,
      refresh_token: find(REFRESH_FIELDS),
    })
  }
}

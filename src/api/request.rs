//! Description of one logical backend call.
//!
//! Requests are plain data so they can be replayed: the retry loop and the
//! refresh-and-replay path both rebuild the wire request from this value.

use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::error::{ApiError, ApiResult};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REFRESH_PATH: &str = "/auth/refresh";
pub const REGISTER_PATH: &str = "/auth/register";
pub const LOGOUT_PATH: &str = "/auth/logout";

/// Endpoints that issue credentials. They never carry a bearer token and a
/// 401 from them never triggers a refresh.
const AUTH_ENDPOINTS: &[&str] = &[LOGIN_PATH, REFRESH_PATH, REGISTER_PATH];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
  /// Bearer token required; missing token rejects the request before sending
  Required,
  /// Login/refresh: sent anonymously
  AuthEndpoint,
}

impl AuthMode {
  pub fn for_path(path: &str) -> Self {
    let path = path.split('?').next().unwrap_or(path).trim_end_matches('/');
    if AUTH_ENDPOINTS.contains(&path) {
      Self::AuthEndpoint
    } else {
      Self::Required
    }
  }
}

#[derive(Debug, Clone)]
pub enum PartData {
  Text(String),
  File {
    bytes: Vec<u8>,
    file_name: String,
    mime: String,
  },
}

#[derive(Debug, Clone)]
pub struct MultipartField {
  pub name: String,
  pub data: PartData,
}

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
  #[default]
  Empty,
  Json(Value),
  Multipart(Vec<MultipartField>),
}

impl RequestBody {
  /// Build a fresh multipart form. Forms are single-use, so every attempt
  /// gets its own.
  pub(crate) fn to_form(fields: &[MultipartField]) -> ApiResult<Form> {
    let mut form = Form::new();
    for field in fields {
      form = match &field.data {
        PartData::Text(text) => form.text(field.name.clone(), text.clone()),
        PartData::File {
          bytes,
          file_name,
          mime,
        } => {
          let part = Part::bytes(bytes.clone())
            .file_name(file_name.clone())
            .mime_str(mime)
            .map_err(|e| ApiError::InvalidResponse {
              message: format!("invalid MIME type {}: {}", mime, e),
            })?;
          form.part(field.name.clone(), part)
        }
      };
    }
    Ok(form)
  }
}

#[derive(Debug, Clone)]
pub struct ApiRequest {
  pub method: Method,
  /// Path below the API root, e.g. "/events/12"
  pub path: String,
  pub query: Vec<(String, String)>,
  pub body: RequestBody,
  pub auth: AuthMode,
  /// Overrides the client-wide timeout
  pub timeout: Option<Duration>,
  /// Set once this request went through a refresh-and-replay
  pub(crate) retried: bool,
}

impl ApiRequest {
  pub fn new(method: Method, path: impl Into<String>) -> Self {
    let path = path.into();
    let path = if path.starts_with('/') || path.starts_with("http") {
      path
    } else {
      format!("/{}", path)
    };
    Self {
      auth: AuthMode::for_path(&path),
      method,
      path,
      query: Vec::new(),
      body: RequestBody::Empty,
      timeout: None,
      retried: false,
    }
  }

  pub fn get(path: impl Into<String>) -> Self {
    Self::new(Method::GET, path)
  }

  pub fn post(path: impl Into<String>) -> Self {
    Self::new(Method::POST, path)
  }

  pub fn put(path: impl Into<String>) -> Self {
    Self::new(Method::PUT, path)
  }

  pub fn patch(path: impl Into<String>) -> Self {
    Self::new(Method::PATCH, path)
  }

  pub fn delete(path: impl Into<String>) -> Self {
    Self::new(Method::DELETE, path)
  }

  pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
    self.query.push((key.into(), value.to_string()));
    self
  }

  pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> ApiResult<Self> {
    self.body = RequestBody::Json(serde_json::to_value(body)?);
    Ok(self)
  }

  pub fn multipart(mut self, fields: Vec<MultipartField>) -> Self {
    self.body = RequestBody::Multipart(fields);
    self
  }

  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = Some(timeout);
    self
  }

  pub fn is_auth_endpoint(&self) -> bool {
    self.auth == AuthMode::AuthEndpoint
  }
}

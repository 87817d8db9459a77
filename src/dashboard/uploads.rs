//! File uploads (multipart).

use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::api::{ApiRequest, MultipartField, PartData};
use crate::error::{ApiError, ApiResult};

use super::resource::decode_entity;
use super::types::UploadedFile;
use super::Dashboard;

pub const UPLOADS_PATH: &str = "/uploads";
const FILE_FIELD: &str = "file";
const FOLDER_FIELD: &str = "folder";

/// A file held in memory, ready to be sent.
#[derive(Debug, Clone)]
pub struct UploadFile {
  pub bytes: Vec<u8>,
  pub file_name: String,
  pub mime: String,
}

impl UploadFile {
  pub fn new(bytes: Vec<u8>, file_name: impl Into<String>) -> Self {
    let file_name = file_name.into();
    Self {
      mime: mime_for(&file_name).to_string(),
      bytes,
      file_name,
    }
  }

  pub async fn from_path(path: &Path) -> ApiResult<Self> {
    let bytes = tokio::fs::read(path).await.map_err(|e| ApiError::Storage {
      message: format!("failed to read {}: {}", path.display(), e),
    })?;
    let file_name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| "upload".to_string());
    Ok(Self::new(bytes, file_name))
  }
}

pub struct UploadsApi<'a> {
  dashboard: &'a Dashboard,
}

impl<'a> UploadsApi<'a> {
  pub(crate) fn new(dashboard: &'a Dashboard) -> Self {
    Self { dashboard }
  }

  /// Upload one file, optionally into a named folder.
  pub async fn upload(
    &self,
    file: UploadFile,
    folder: Option<&str>,
    cancel: &CancellationToken,
  ) -> ApiResult<UploadedFile> {
    let size = file.bytes.len();
    let file_name = file.file_name.clone();

    let mut fields = vec![MultipartField {
      name: FILE_FIELD.to_string(),
      data: PartData::File {
        bytes: file.bytes,
        file_name: file.file_name,
        mime: file.mime,
      },
    }];
    if let Some(folder) = folder {
      fields.push(MultipartField {
        name: FOLDER_FIELD.to_string(),
        data: PartData::Text(folder.to_string()),
      });
    }

    let request = ApiRequest::post(UPLOADS_PATH).multipart(fields);
    let body = self.dashboard.api.send(request, cancel).await?;
    info!(file = %file_name, size, "file uploaded");
    decode_entity(body)
  }
}

/// MIME type from the file extension; unknown types are sent as octet-stream.
fn mime_for(file_name: &str) -> &'static str {
  let extension = Path::new(file_name)
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_ascii_lowercase)
    .unwrap_or_default();

  match extension.as_str() {
    "jpg" | "jpeg" => "image/jpeg",
    "png" => "image/png",
    "gif" => "image/gif",
    "webp" => "image/webp",
    "svg" => "image/svg+xml",
    "pdf" => "application/pdf",
    "doc" => "application/msword",
    "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "xls" => "application/vnd.ms-excel",
    "xlsx" => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "csv" => "text/csv",
    "txt" | "md" => "text/plain",
    _ => "application/octet-stream",
  }
}

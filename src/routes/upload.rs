//! Multipart upload handling shared by the image routes

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;

use crate::config::Config;
use crate::error::{AppError, Result};

/// Name of the multipart field carrying the file
pub const FILE_FIELD: &str = "file";

/// Extra room for multipart boundaries and text fields on top of the file limit
pub const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// The uploaded file part
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl UploadedFile {
    /// File name without its last extension
    pub fn stem(&self) -> &str {
        file_stem(&self.file_name)
    }
}

/// All parts of a multipart form: the file plus any text fields
#[derive(Debug, Default)]
pub struct UploadForm {
    pub file: Option<UploadedFile>,
    fields: HashMap<String, String>,
}

impl UploadForm {
    /// Read every part of `multipart`, enforcing the configured file size limit
    pub async fn read(mut multipart: Multipart, config: &Config) -> Result<Self> {
        let max = config.limits.max_upload_bytes;
        let mut form = UploadForm::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error(e, config))?
        {
            let name = field.name().unwrap_or("").to_string();

            if name == FILE_FIELD {
                let file_name = field
                    .file_name()
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| "image".to_string());
                let content_type = field.content_type().map(|s| s.to_string());
                let data = field.bytes().await.map_err(|e| multipart_error(e, config))?;

                tracing::debug!(
                    file_name = %file_name,
                    content_type = ?content_type,
                    size = data.len(),
                    "Received file part"
                );

                if data.len() > max {
                    tracing::warn!(size = data.len(), max, "Upload exceeds size limit");
                    return Err(AppError::FileTooLarge {
                        max: config.max_upload_label(),
                    });
                }

                form.file = Some(UploadedFile {
                    file_name,
                    content_type,
                    data,
                });
            } else if !name.is_empty() {
                let value = field.text().await.map_err(|e| multipart_error(e, config))?;
                form.fields.insert(name, value);
            }
        }

        Ok(form)
    }

    /// Text field value, `None` when missing or blank
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    /// Take the file part or fail with "No file provided"
    pub fn take_file(&mut self) -> Result<UploadedFile> {
        self.file.take().ok_or_else(|| {
            tracing::warn!("No file field found in multipart upload");
            AppError::BadRequest("No file provided".to_string())
        })
    }
}

/// Bodies cut off by the request body limit report the upload size limit
fn multipart_error(err: MultipartError, config: &Config) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!("Upload body exceeds the request limit: {}", err);
        AppError::FileTooLarge {
            max: config.max_upload_label(),
        }
    } else {
        AppError::Multipart(err)
    }
}

/// Strip the final `.ext` from a file name
///
/// Names without an extension are returned unchanged; an extension must not
/// contain a path separator.
pub fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() && !name[idx + 1..].contains('/') => &name[..idx],
        _ => name,
    }
}

/// `Content-Disposition` value for downloading `file_name`
///
/// Characters that cannot appear in a quoted header value are replaced.
pub fn attachment(file_name: &str) -> String {
    let safe: String = file_name
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("attachment; filename=\"{}\"", safe)
}

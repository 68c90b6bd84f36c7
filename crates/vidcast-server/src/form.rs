//! Multipart form collection for the upload routes.

use std::collections::HashMap;

use axum::body::Bytes;
use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;

use crate::error::ServerError;

/// One uploaded file part.
pub struct Upload {
    pub content_type: String,
    pub data: Bytes,
}

/// Text fields and file parts of a `multipart/form-data` body, by name.
/// Later parts with the same name replace earlier ones.
#[derive(Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart, max_size: usize) -> Result<Self, ServerError> {
        let mut form = Self::default();
        let fail = |e: MultipartError| multipart_error(e, max_size);

        while let Some(field) = multipart.next_field().await.map_err(fail)? {
            let name = field.name().unwrap_or("").to_string();
            if name.is_empty() {
                continue;
            }

            if field.file_name().is_some() {
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = field.bytes().await.map_err(fail)?;
                if !data.is_empty() {
                    form.files.insert(name, Upload { content_type, data });
                }
            } else {
                let text = field.text().await.map_err(fail)?;
                form.fields.insert(name, text);
            }
        }

        Ok(form)
    }

    /// Trimmed text field; blank counts as absent.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn file(&self, name: &str) -> Option<&Upload> {
        self.files.get(name)
    }
}

fn multipart_error(e: MultipartError, max: usize) -> ServerError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ServerError::PayloadTooLarge { max }
    } else {
        ServerError::BadRequest(format!("Multipart error: {e}"))
    }
}

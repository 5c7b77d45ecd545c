//! Multipart form collection shared by the KYC and admin product forms.
//!
//! Text fields and files are read fully into memory, then handed to the
//! backend client as [`Upload`]s. Empty file inputs (no file chosen) are
//! skipped.

use std::collections::HashMap;

use axum::extract::{DefaultBodyLimit, Multipart};
use serde::de::DeserializeOwned;

use diag_wheels_core::validation::{MAX_UPLOAD_BYTES, UploadError, validate_upload};

use crate::api::Upload;
use crate::error::AppError;

/// Files per form we allow on one request.
const MAX_FILES_PER_REQUEST: usize = 12;

/// Body limit for multipart routes: a full set of documents plus slack for
/// the text fields.
pub fn body_limit() -> DefaultBodyLimit {
    DefaultBodyLimit::max(MAX_UPLOAD_BYTES * MAX_FILES_PER_REQUEST + 64 * 1024)
}

/// A submitted multipart form.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<Upload>>,
}

impl MultipartForm {
    /// Read every part of the request.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BadRequest`] for malformed bodies.
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Invalid upload: {e}")))?;
                    if file_name.is_empty() && bytes.is_empty() {
                        continue;
                    }
                    form.files.entry(name).or_default().push(Upload {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(format!("Invalid form field: {e}")))?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    /// A text field's value.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Whether a checkbox was ticked.
    pub fn checked(&self, name: &str) -> bool {
        self.text(name).is_some_and(|v| matches!(v, "on" | "true" | "1"))
    }

    /// Deserialize the text fields into a form struct.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::BadRequest`] when a field has the wrong shape.
    pub fn fields<T: DeserializeOwned>(&self) -> Result<T, AppError> {
        let value = serde_json::to_value(&self.fields)
            .map_err(|e| AppError::BadRequest(format!("Invalid form: {e}")))?;
        serde_json::from_value(value).map_err(|e| AppError::BadRequest(format!("Invalid form: {e}")))
    }

    /// Take all files uploaded under `name`.
    pub fn take_files(&mut self, name: &str) -> Vec<Upload> {
        self.files.remove(name).unwrap_or_default()
    }

    /// Take the first file uploaded under `name`.
    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.take_files(name).into_iter().next()
    }

    #[cfg(test)]
    pub(crate) fn with_field(mut self, name: &str, value: &str) -> Self {
        self.fields.insert(name.to_string(), value.to_string());
        self
    }
}

/// Check every proof document's type and size.
///
/// # Errors
///
/// Returns the first failing file's error.
pub fn validate_proofs(uploads: &[Upload]) -> Result<(), UploadError> {
    uploads
        .iter()
        .try_for_each(|upload| validate_upload(&upload.content_type, upload.bytes.len()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn upload(content_type: &str, size: usize) -> Upload {
        Upload {
            file_name: "proof".to_string(),
            content_type: content_type.to_string(),
            bytes: vec![0; size],
        }
    }

    #[test]
    fn test_validate_proofs_reports_bad_file() {
        let ok = [upload("image/png", 10), upload("application/pdf", 10)];
        assert!(validate_proofs(&ok).is_ok());

        let bad = [upload("image/png", 10), upload("text/plain", 10)];
        assert!(matches!(
            validate_proofs(&bad),
            Err(UploadError::UnsupportedType { .. })
        ));
    }

    #[test]
    fn test_checkbox_values() {
        let form = MultipartForm::default()
            .with_field("is_active", "on")
            .with_field("featured", "");
        assert!(form.checked("is_active"));
        assert!(!form.checked("featured"));
        assert!(!form.checked("missing"));
    }

    #[test]
    fn test_fields_deserialize() {
        #[derive(Deserialize)]
        struct Note {
            title: String,
            #[serde(default)]
            body: String,
        }

        let form = MultipartForm::default().with_field("title", "Service bulletin");
        let note: Note = form.fields().unwrap();
        assert_eq!(note.title, "Service bulletin");
        assert!(note.body.is_empty());
    }
}

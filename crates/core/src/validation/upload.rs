//! Checks for uploaded verification documents and product archives.

use crate::types::DigitalFileFormat;

/// Content types accepted for ID, business, and KYC proofs.
pub const ALLOWED_PROOF_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "application/pdf",
];

/// Per-file upload limit (10 MiB).
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UploadError {
    #[error("Invalid file type. Only JPEG, PNG, WebP images and PDF files are allowed.")]
    UnsupportedType { content_type: String },
    #[error("File size must be less than 10MB per file")]
    TooLarge { size: usize },
    #[error("Digital file must be a ZIP or RAR archive")]
    NotAnArchive { file_name: String },
}

/// Validate one proof document by content type and size.
///
/// # Errors
///
/// Returns an error for disallowed content types or files over
/// [`MAX_UPLOAD_BYTES`].
pub fn validate_upload(content_type: &str, size: usize) -> Result<(), UploadError> {
    let normalized = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if !ALLOWED_PROOF_TYPES.contains(&normalized.as_str()) {
        return Err(UploadError::UnsupportedType {
            content_type: content_type.to_owned(),
        });
    }
    if size > MAX_UPLOAD_BYTES {
        return Err(UploadError::TooLarge { size });
    }
    Ok(())
}

/// Validate a digital product archive by file name.
///
/// # Errors
///
/// Returns [`UploadError::NotAnArchive`] unless the name ends in `.zip` or `.rar`.
pub fn validate_digital_file(file_name: &str) -> Result<DigitalFileFormat, UploadError> {
    DigitalFileFormat::from_file_name(file_name).ok_or_else(|| UploadError::NotAnArchive {
        file_name: file_name.to_owned(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_types() {
        for ty in ALLOWED_PROOF_TYPES {
            assert_eq!(validate_upload(ty, 1024), Ok(()));
        }
        assert_eq!(validate_upload("IMAGE/PNG", 10), Ok(()));
        assert_eq!(validate_upload("application/pdf; charset=binary", 10), Ok(()));
    }

    #[test]
    fn test_rejects_other_types() {
        let err = validate_upload("image/gif", 10).unwrap_err();
        assert!(matches!(err, UploadError::UnsupportedType { .. }));
        assert_eq!(
            err.to_string(),
            "Invalid file type. Only JPEG, PNG, WebP images and PDF files are allowed."
        );
    }

    #[test]
    fn test_size_limit_is_inclusive() {
        assert_eq!(validate_upload("image/png", MAX_UPLOAD_BYTES), Ok(()));
        assert_eq!(
            validate_upload("image/png", MAX_UPLOAD_BYTES + 1),
            Err(UploadError::TooLarge {
                size: MAX_UPLOAD_BYTES + 1
            })
        );
    }

    #[test]
    fn test_digital_archive() {
        assert_eq!(validate_digital_file("tool.zip"), Ok(DigitalFileFormat::Zip));
        assert_eq!(validate_digital_file("TOOL.RAR"), Ok(DigitalFileFormat::Rar));
        assert!(validate_digital_file("tool.7z").is_err());
    }
}

use std::path::Path;

use crate::error::AppError;
use crate::models::intake_types::{ImageUpload, SelectedFile};

pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

const ALLOWED_MEDIA_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png"];

const IMAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
];

pub const INVALID_TYPE_MESSAGE: &str = "Please select a valid image file (JPEG or PNG).";
pub const TOO_LARGE_MESSAGE: &str = "File size must be less than 10MB.";

pub fn is_allowed_media_type(media_type: &str) -> bool {
    let normalized = media_type.trim().to_ascii_lowercase();
    ALLOWED_MEDIA_TYPES.contains(&normalized.as_str())
}

/// Check an upload against the type allow-list and the size ceiling.
/// Type is checked first, so an oversized PDF reports `InvalidType`.
pub fn validate(upload: ImageUpload) -> Result<SelectedFile, AppError> {
    if !is_allowed_media_type(&upload.media_type) {
        return Err(AppError::invalid_type(INVALID_TYPE_MESSAGE));
    }

    let size = upload.bytes.len() as u64;
    if size > MAX_FILE_BYTES {
        return Err(AppError::too_large(TOO_LARGE_MESSAGE));
    }

    Ok(SelectedFile {
        name: upload.name,
        media_type: upload.media_type.trim().to_ascii_lowercase(),
        bytes: upload.bytes,
        size,
    })
}

/// Media type implied by the file extension, if it is one we know.
pub fn media_type_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, media_type)| *media_type)
}

impl ImageUpload {
    /// Load a file from disk for headless front ends. Unknown extensions get
    /// `application/octet-stream` and are rejected later by [`validate`].
    pub async fn from_path(path: &Path) -> Result<Self, AppError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| AppError::from(format!("Failed to read {}: {}", path.display(), e)))?;

        let name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        Ok(ImageUpload {
            name,
            media_type: media_type_for_path(path)
                .unwrap_or("application/octet-stream")
                .to_string(),
            bytes,
        })
    }
}

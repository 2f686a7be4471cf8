//! Image upload validation and storage.
//!
//! Uploads are identified by their magic bytes, not by the client-supplied
//! content type. Anything that does not sniff as a supported image format is
//! rejected before anything touches disk.

use std::path::Path;

use scribe_common::id::{prefix, prefixed_ulid};

use crate::error::{ApiError, FieldError};

/// Image formats accepted for post attachments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Webp,
    Bmp,
}

impl ImageFormat {
    /// Identify an image by its magic bytes.
    pub fn sniff(data: &[u8]) -> Option<Self> {
        if data.starts_with(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]) {
            Some(Self::Png)
        } else if data.starts_with(&[0xff, 0xd8, 0xff]) {
            Some(Self::Jpeg)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(Self::Gif)
        } else if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else if data.starts_with(b"BM") {
            Some(Self::Bmp)
        } else {
            None
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
        }
    }
}

/// Validate `data` as an image and write it below `media_root`.
///
/// Returns the stored key (e.g. `posts/att_<ulid>.png`) recorded on the
/// post row. Rejection happens before any filesystem write, so a failed
/// validation leaves no partial state behind.
pub async fn store_post_image(media_root: &str, data: &[u8]) -> Result<String, ApiError> {
    let format = ImageFormat::sniff(data).ok_or_else(|| {
        ApiError::validation(vec![FieldError {
            field: "image".to_string(),
            message: "Upload a valid image".to_string(),
        }])
    })?;

    let key = format!(
        "posts/{}.{}",
        prefixed_ulid(prefix::ATTACHMENT),
        format.extension()
    );
    let path = Path::new(media_root).join(&key);

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(|err| {
            tracing::error!(?err, "failed to create media directory");
            ApiError::internal("Failed to store image")
        })?;
    }
    tokio::fs::write(&path, data).await.map_err(|err| {
        tracing::error!(?err, "failed to write image");
        ApiError::internal("Failed to store image")
    })?;

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a, 0, 0];

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(ImageFormat::sniff(PNG), Some(ImageFormat::Png));
        assert_eq!(
            ImageFormat::sniff(&[0xff, 0xd8, 0xff, 0xe0]),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::sniff(b"GIF89a..."), Some(ImageFormat::Gif));
        assert_eq!(
            ImageFormat::sniff(b"RIFF\x00\x00\x00\x00WEBPVP8 "),
            Some(ImageFormat::Webp)
        );
        assert_eq!(ImageFormat::sniff(b"BM\x00\x00"), Some(ImageFormat::Bmp));
    }

    #[test]
    fn rejects_non_images() {
        assert_eq!(ImageFormat::sniff(b"%PDF-1.7"), None);
        assert_eq!(ImageFormat::sniff(b"just some text"), None);
        assert_eq!(ImageFormat::sniff(b""), None);
        // Truncated RIFF container that is not WEBP.
        assert_eq!(ImageFormat::sniff(b"RIFF\x00\x00\x00\x00WAVE"), None);
    }

    #[tokio::test]
    async fn stores_valid_image_under_media_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();

        let key = store_post_image(root, PNG).await.unwrap();
        assert!(key.starts_with("posts/att_"));
        assert!(key.ends_with(".png"));
        assert!(dir.path().join(&key).exists());
    }

    #[tokio::test]
    async fn invalid_upload_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_str().unwrap();

        let err = store_post_image(root, b"not an image").await.unwrap_err();
        assert_eq!(err.code, "VALIDATION_ERROR");
        assert!(!dir.path().join("posts").exists());
    }
}

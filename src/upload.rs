use crate::error::ApiError;
use actix_web::web;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Same cap the frontend enforces.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

const ALLOWED_EXTENSIONS: [&str; 4] = ["jpeg", "jpg", "png", "gif"];

/// Path prefix images are served under; also what gets stored on the
/// employee row.
pub const URL_PREFIX: &str = "/uploads";

/// A profile picture persisted to disk.
#[derive(Debug, Clone)]
pub struct StoredImage {
    /// What goes on the employee record, e.g. "/uploads/1724919000123.png".
    pub rel_path: String,
}

/// Accepts jpeg/jpg/png/gif only, by extension. Returns the lowercased
/// extension.
pub fn validate_image_name(filename: &str) -> Result<String, ApiError> {
    let ext = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match ext {
        Some(e) if ALLOWED_EXTENSIONS.contains(&e.as_str()) => Ok(e),
        _ => Err(ApiError::Validation(
            "Only images are allowed (jpeg, jpg, png, gif)".into(),
        )),
    }
}

fn disk_path(upload_dir: &str, rel_path: &str) -> PathBuf {
    let name = rel_path
        .strip_prefix(&format!("{}/", URL_PREFIX))
        .unwrap_or(rel_path);
    Path::new(upload_dir).join(name)
}

/// Writes the image under a timestamped name. Runs the blocking write on
/// the blocking pool.
pub async fn store_image(
    upload_dir: &str,
    original_name: &str,
    bytes: Vec<u8>,
) -> Result<StoredImage, ApiError> {
    let ext = validate_image_name(original_name)?;
    let stored_name = format!("{}.{}", chrono::Utc::now().timestamp_millis(), ext);
    let rel_path = format!("{}/{}", URL_PREFIX, stored_name);

    let dir = upload_dir.to_string();
    web::block(move || {
        std::fs::create_dir_all(&dir)?;
        std::fs::write(Path::new(&dir).join(&stored_name), bytes)
    })
    .await
    .map_err(|e| {
        warn!(error = %e, "Blocking pool failure while storing image");
        ApiError::Internal
    })??;

    Ok(StoredImage { rel_path })
}

/// Best-effort removal; used both for cascade delete and as the compensation
/// step when record creation fails after the file was written.
pub fn remove_image(upload_dir: &str, rel_path: &str) {
    let path = disk_path(upload_dir, rel_path);
    if let Err(e) = std::fs::remove_file(&path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(error = %e, path = %path.display(), "Failed to remove stored image");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_image_extensions() {
        for name in ["a.jpg", "b.JPEG", "c.png", "d.Gif"] {
            assert!(validate_image_name(name).is_ok(), "{name}");
        }
    }

    #[test]
    fn rejects_everything_else() {
        for name in ["a.pdf", "b.exe", "noext", "c.png.sh"] {
            assert!(validate_image_name(name).is_err(), "{name}");
        }
    }

    #[test]
    fn disk_path_strips_url_prefix() {
        let p = disk_path("uploads", "/uploads/123.png");
        assert_eq!(p, Path::new("uploads").join("123.png"));
    }

    #[test]
    fn remove_missing_image_is_silent() {
        remove_image("uploads", "/uploads/does-not-exist.png");
    }

    #[actix_web::test]
    async fn store_then_remove() {
        let dir = std::env::temp_dir().join("timeclock-upload-test");
        let dir = dir.to_string_lossy().to_string();

        let stored = store_image(&dir, "avatar.png", b"not-really-a-png".to_vec())
            .await
            .unwrap();
        assert!(stored.rel_path.starts_with("/uploads/"));
        assert!(stored.rel_path.ends_with(".png"));

        let on_disk = disk_path(&dir, &stored.rel_path);
        assert!(on_disk.exists());

        remove_image(&dir, &stored.rel_path);
        assert!(!on_disk.exists());
    }
}

//! Local media storage.
//!
//! Uploaded images and videos are written as `<uuid>.<ext>` under one
//! directory and served back from `/media/<file>`. Records only ever hold
//! the resulting public URL.

use std::path::{Component, Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::ServerError;

/// Accepted upload types and the extension each is stored under.
const ACCEPTED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/avif", "avif"),
    ("video/mp4", "mp4"),
    ("video/webm", "webm"),
];

fn extension_for(content_type: &str) -> Option<&'static str> {
    let essence = content_type.split(';').next().unwrap_or("").trim();
    ACCEPTED_TYPES
        .iter()
        .find(|(mime, _)| mime.eq_ignore_ascii_case(essence))
        .map(|(_, ext)| *ext)
}

pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name.rsplit_once('.').map(|(_, e)| e).unwrap_or("");
    ACCEPTED_TYPES
        .iter()
        .find(|(_, e)| e.eq_ignore_ascii_case(ext))
        .map(|(mime, _)| *mime)
        .unwrap_or("application/octet-stream")
}

/// Verify that a resolved path stays within the expected base directory.
fn ensure_within(base: &Path, name: &str) -> Result<PathBuf, ServerError> {
    let mut components = Path::new(name).components();
    let file = match (components.next(), components.next()) {
        (Some(Component::Normal(file)), None) => file,
        _ => {
            return Err(ServerError::BadRequest(
                "Path traversal detected".to_string(),
            ))
        }
    };
    let resolved = base.join(file);
    if resolved.parent() != Some(base) {
        return Err(ServerError::BadRequest(
            "Path traversal detected".to_string(),
        ));
    }
    Ok(resolved)
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    base_path: PathBuf,
    max_size: usize,
    public_base_url: String,
}

impl MediaStore {
    pub async fn new(
        base_path: PathBuf,
        max_size: usize,
        public_base_url: &str,
    ) -> Result<Self, ServerError> {
        fs::create_dir_all(&base_path).await.map_err(|e| {
            ServerError::MediaStorage(format!(
                "Failed to create media directory '{}': {}",
                base_path.display(),
                e
            ))
        })?;

        info!(path = %base_path.display(), "Media store initialized");

        Ok(Self {
            base_path,
            max_size,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Persist one upload and return its public URL.
    pub async fn ingest(&self, content_type: &str, data: &[u8]) -> Result<String, ServerError> {
        let ext = extension_for(content_type).ok_or_else(|| {
            ServerError::Validation(format!("Unsupported media type '{content_type}'"))
        })?;
        if data.is_empty() {
            return Err(ServerError::Validation("Empty upload".to_string()));
        }
        if data.len() > self.max_size {
            return Err(ServerError::PayloadTooLarge { max: self.max_size });
        }

        let file_name = format!("{}.{ext}", Uuid::new_v4());
        let path = ensure_within(&self.base_path, &file_name)?;
        fs::write(&path, data).await.map_err(|e| {
            ServerError::MediaStorage(format!("Failed to write {file_name}: {e}"))
        })?;

        debug!(file = %file_name, size = data.len(), "Stored media");
        Ok(format!("{}/media/{file_name}", self.public_base_url))
    }

    /// Remove a file handed out by `ingest`. URLs that do not point into
    /// this store are left alone. Returns whether a file was removed.
    pub async fn discard(&self, url: &str) -> bool {
        let prefix = format!("{}/media/", self.public_base_url);
        let Some(file_name) = url.strip_prefix(&prefix) else {
            return false;
        };
        let Ok(path) = ensure_within(&self.base_path, file_name) else {
            return false;
        };
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(file = %file_name, "Removed media");
                true
            }
            Err(e) => {
                warn!(file = %file_name, error = %e, "Failed to remove media");
                false
            }
        }
    }

    pub async fn read(&self, file_name: &str) -> Result<Vec<u8>, ServerError> {
        let path = ensure_within(&self.base_path, file_name)?;
        if !path.is_file() {
            return Err(ServerError::MediaNotFound(file_name.to_string()));
        }
        fs::read(&path)
            .await
            .map_err(|e| ServerError::MediaStorage(format!("Failed to read {file_name}: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_store() -> (MediaStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = MediaStore::new(dir.path().to_path_buf(), 1024, "http://cdn.test/")
            .await
            .unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_ingest_and_read() {
        let (store, _dir) = test_store().await;
        let url = store.ingest("image/png", b"png-bytes").await.unwrap();

        let file = url.strip_prefix("http://cdn.test/media/").unwrap();
        assert!(file.ends_with(".png"));
        assert_eq!(store.read(file).await.unwrap(), b"png-bytes");
        assert_eq!(content_type_for(file), "image/png");
    }

    #[tokio::test]
    async fn test_rejects_unsupported_type() {
        let (store, _dir) = test_store().await;
        let err = store.ingest("text/html", b"<p>").await.unwrap_err();
        assert!(matches!(err, ServerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_rejects_oversized() {
        let (store, _dir) = test_store().await;
        let err = store.ingest("video/mp4", &[0u8; 2048]).await.unwrap_err();
        assert!(matches!(err, ServerError::PayloadTooLarge { max: 1024 }));
    }

    #[tokio::test]
    async fn test_rejects_traversal() {
        let (store, _dir) = test_store().await;
        for name in ["../secret", "a/b.png", "/etc/passwd", ".."] {
            assert!(
                matches!(store.read(name).await, Err(ServerError::BadRequest(_))),
                "{name} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_missing_file() {
        let (store, _dir) = test_store().await;
        let err = store.read("nope.mp4").await.unwrap_err();
        assert!(matches!(err, ServerError::MediaNotFound(_)));
    }

    #[tokio::test]
    async fn test_discard_only_touches_own_files() {
        let (store, dir) = test_store().await;
        let url = store.ingest("image/png", b"png-bytes").await.unwrap();
        std::fs::write(dir.path().join("keep.png"), b"x").unwrap();

        assert!(store.discard(&url).await);
        assert!(!store.discard(&url).await);
        assert!(!store.discard("https://elsewhere.test/media/keep.png").await);
        assert!(!store.discard("http://cdn.test/media/../keep.png").await);

        let file = url.strip_prefix("http://cdn.test/media/").unwrap();
        assert!(matches!(store.read(file).await, Err(ServerError::MediaNotFound(_))));
        assert!(dir.path().join("keep.png").is_file());
    }

    #[test]
    fn test_content_type_parameters_ignored() {
        assert_eq!(extension_for("video/webm; codecs=vp9"), Some("webm"));
        assert_eq!(extension_for("IMAGE/JPEG"), Some("jpg"));
    }
}

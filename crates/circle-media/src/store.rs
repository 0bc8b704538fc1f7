//! Local disk media store.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{MediaError, MediaResult};

/// Longest sanitized original name kept in a stored file name.
const MAX_NAME_LENGTH: usize = 80;

/// Configuration for the media store.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// Directory holding all uploaded files
    pub root: PathBuf,
    /// Public URL prefix the root is served under
    pub url_prefix: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("media"),
            url_prefix: "/media/".to_string(),
        }
    }
}

impl MediaConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            root: std::env::var("MEDIA_ROOT")
                .map(PathBuf::from)
                .unwrap_or(defaults.root),
            url_prefix: std::env::var("MEDIA_URL").unwrap_or(defaults.url_prefix),
        }
    }
}

/// Subdirectory an upload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaDir {
    PostMedia,
    ProfilePictures,
}

impl MediaDir {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaDir::PostMedia => "post_media",
            MediaDir::ProfilePictures => "profile_pictures",
        }
    }
}

/// Stores uploads below a root directory and hands out relative paths.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
    url_prefix: String,
}

impl MediaStore {
    /// Create a store, creating the root directory if needed.
    pub fn new(config: MediaConfig) -> MediaResult<Self> {
        std::fs::create_dir_all(&config.root).map_err(|e| {
            MediaError::config_error(format!(
                "cannot create media root {}: {}",
                config.root.display(),
                e
            ))
        })?;

        let mut url_prefix = config.url_prefix;
        if !url_prefix.ends_with('/') {
            url_prefix.push('/');
        }

        Ok(Self {
            root: config.root,
            url_prefix,
        })
    }

    /// Create from environment variables.
    pub fn from_env() -> MediaResult<Self> {
        Self::new(MediaConfig::from_env())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    /// Write `bytes` and return the stored path relative to the root.
    pub async fn save(&self, dir: MediaDir, original_name: &str, bytes: &[u8]) -> MediaResult<String> {
        let relative = format!(
            "{}/{}-{}",
            dir.as_str(),
            Uuid::new_v4().simple(),
            sanitize_file_name(original_name)
        );
        let path = self.root.join(&relative);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| MediaError::write_failed(format!("failed to create directory: {}", e)))?;
        }

        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| MediaError::write_failed(format!("failed to write {}: {}", relative, e)))?;

        info!(path = %relative, size = bytes.len(), "Stored media file");
        Ok(relative)
    }

    /// Delete a stored file. A file that is already gone is not an error.
    pub async fn delete(&self, relative: &str) -> MediaResult<()> {
        let path = self.resolve(relative)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %relative, "Deleted media file");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(MediaError::DeleteFailed(format!("{}: {}", relative, e))),
        }
    }

    /// Delete several files, logging failures instead of returning them.
    pub async fn delete_all(&self, paths: &[String]) {
        for path in paths {
            if let Err(e) = self.delete(path).await {
                warn!(path = %path, error = %e, "Failed to delete media file");
            }
        }
    }

    /// Read a stored file.
    pub async fn read(&self, relative: &str) -> MediaResult<Vec<u8>> {
        let path = self.resolve(relative)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(MediaError::NotFound(relative.to_string()))
            }
            Err(e) => Err(MediaError::Io(e)),
        }
    }

    /// Public URL of a stored path.
    pub fn url(&self, relative: &str) -> String {
        format!("{}{}", self.url_prefix, relative.trim_start_matches('/'))
    }

    /// Absolute path of a stored file. Rejects anything escaping the root.
    pub fn resolve(&self, relative: &str) -> MediaResult<PathBuf> {
        let candidate = Path::new(relative);
        let safe = !relative.is_empty()
            && candidate
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(MediaError::invalid_path(relative));
        }
        Ok(self.root.join(candidate))
    }

    /// Verify the root accepts writes (used by the readiness probe).
    pub async fn check_writable(&self) -> MediaResult<()> {
        let probe = self.root.join(format!(".ready-{}", Uuid::new_v4().simple()));
        tokio::fs::write(&probe, b"ok").await?;
        tokio::fs::remove_file(&probe).await?;
        Ok(())
    }
}

/// Reduce an uploaded file name to a safe ASCII form.
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let mut cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    cleaned = cleaned.trim_start_matches('.').to_string();

    if cleaned.len() > MAX_NAME_LENGTH {
        // Keep the extension when truncating
        let ext = cleaned
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_string())
            .filter(|ext| ext.len() < 10)
            .unwrap_or_default();
        let keep = MAX_NAME_LENGTH - ext.len() - 1;
        cleaned = if ext.is_empty() {
            cleaned[..MAX_NAME_LENGTH].to_string()
        } else {
            format!("{}.{}", &cleaned[..keep], ext)
        };
    }

    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> MediaStore {
        MediaStore::new(MediaConfig {
            root: dir.path().to_path_buf(),
            url_prefix: "/media".to_string(),
        })
        .unwrap()
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("holiday photo.JPG"), "holiday_photo.JPG");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\me\\clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name(""), "upload");

        let long = format!("{}.png", "a".repeat(200));
        let cleaned = sanitize_file_name(&long);
        assert_eq!(cleaned.len(), MAX_NAME_LENGTH);
        assert!(cleaned.ends_with(".png"));
    }

    #[test]
    fn test_resolve_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert!(store.resolve("post_media/a.png").is_ok());
        assert!(store.resolve("../secret").is_err());
        assert!(store.resolve("/etc/passwd").is_err());
        assert!(store.resolve("").is_err());
    }

    #[test]
    fn test_url_prefix_is_normalized() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert_eq!(store.url("post_media/a.png"), "/media/post_media/a.png");
    }

    #[tokio::test]
    async fn test_save_read_delete() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);

        let path = store
            .save(MediaDir::PostMedia, "cat.png", b"png-bytes")
            .await
            .unwrap();
        assert!(path.starts_with("post_media/"));
        assert!(path.ends_with("-cat.png"));
        assert_eq!(store.read(&path).await.unwrap(), b"png-bytes");

        store.delete(&path).await.unwrap();
        assert!(matches!(store.read(&path).await, Err(MediaError::NotFound(_))));
        // Deleting again is fine
        store.delete(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_saved_names_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let a = store.save(MediaDir::ProfilePictures, "me.jpg", b"1").await.unwrap();
        let b = store.save(MediaDir::ProfilePictures, "me.jpg", b"2").await.unwrap();
        assert_ne!(a, b);
        store.check_writable().await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_all_skips_bad_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        let kept = store.save(MediaDir::PostMedia, "a.png", b"a").await.unwrap();
        let gone = store.save(MediaDir::PostMedia, "b.png", b"b").await.unwrap();

        store
            .delete_all(&[gone.clone(), "../outside.png".to_string(), "post_media/missing.png".to_string()])
            .await;
        assert!(matches!(store.read(&gone).await, Err(MediaError::NotFound(_))));
        assert_eq!(store.read(&kept).await.unwrap(), b"a");
    }
}

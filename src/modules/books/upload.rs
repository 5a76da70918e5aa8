//! Upload intake: stages a multipart file on local disk before the remote
//! write, and removes the staged copy once the object store confirms it.

use std::io;
use std::path::{Path, PathBuf};

use axum::body::Bytes;
use tokio::fs;
use uuid::Uuid;

const FALLBACK_FILE_NAME: &str = "upload.bin";

/// An uploaded file staged on local ephemeral storage.
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    file_name: String,
    content_type: String,
}

impl StagedUpload {
    /// Write the payload under a collision-free name in `dir`.
    ///
    /// The name is a time-ordered UUID followed by the sanitized original
    /// filename, so concurrent uploads of the same file never collide.
    pub async fn stage(
        dir: &Path,
        original_name: &str,
        content_type: &str,
        data: Bytes,
    ) -> io::Result<Self> {
        fs::create_dir_all(dir).await?;

        let file_name = format!("{}-{}", Uuid::now_v7(), sanitize_file_name(original_name));
        let path = dir.join(&file_name);
        fs::write(&path, &data).await?;

        Ok(Self {
            path,
            file_name,
            content_type: content_type.to_string(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Unique staged file name; doubles as the object-key suffix.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Remove the staged copy. A failed removal is logged, not fatal.
    pub async fn discard(self) {
        if let Err(err) = fs::remove_file(&self.path).await {
            tracing::warn!(
                path = %self.path.display(),
                error = %err,
                "failed to remove staged upload"
            );
        }
    }

    /// Leave the staged copy on disk and hand back its location.
    pub fn keep(self) -> PathBuf {
        self.path
    }
}

/// Reduce a client-supplied filename to a safe final path component.
pub fn sanitize_file_name(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or(FALLBACK_FILE_NAME);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stage_writes_payload_under_unique_name() {
        let dir = tempfile::tempdir().unwrap();
        let data = Bytes::from_static(b"cover bytes");

        let staged = StagedUpload::stage(dir.path(), "cover.png", "image/png", data.clone())
            .await
            .unwrap();

        assert!(staged.file_name().ends_with("-cover.png"));
        assert_eq!(staged.content_type(), "image/png");
        assert_eq!(std::fs::read(staged.path()).unwrap(), data.as_ref());
    }

    #[tokio::test]
    async fn staged_names_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();

        let a = StagedUpload::stage(dir.path(), "cover.png", "image/png", Bytes::new())
            .await
            .unwrap();
        let b = StagedUpload::stage(dir.path(), "cover.png", "image/png", Bytes::new())
            .await
            .unwrap();

        assert_ne!(a.file_name(), b.file_name());
    }

    #[tokio::test]
    async fn discard_removes_the_staged_copy() {
        let dir = tempfile::tempdir().unwrap();
        let staged = StagedUpload::stage(dir.path(), "cover.png", "image/png", Bytes::new())
            .await
            .unwrap();
        let path = staged.path().to_path_buf();

        staged.discard().await;
        assert!(!path.exists());
    }

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("dir/cover.png"), "cover.png");
    }

    #[test]
    fn sanitize_replaces_hostile_characters() {
        assert_eq!(sanitize_file_name("my cover (1).png"), "my_cover__1_.png");
    }

    #[test]
    fn sanitize_falls_back_on_empty_names() {
        assert_eq!(sanitize_file_name(""), FALLBACK_FILE_NAME);
        assert_eq!(sanitize_file_name("///"), FALLBACK_FILE_NAME);
    }
}

//! Storage for uploaded signed acta documents.
//!
//! Files live under `<root>/actas/<acta_id>/<uuid>.<ext>`. Only the relative
//! path is stored on the acta.

use crate::errors::{Error, Result};
use std::path::{Component, Path, PathBuf};

const ALLOWED_EXTENSIONS: [&str; 4] = ["pdf", "png", "jpg", "jpeg"];

/// Upload directory handle
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    /// Creates a store rooted at `root`. The directory is created on first save.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Upload root
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores a document for `acta_id` and returns its path relative to the root.
    pub async fn save(&self, acta_id: i64, filename: &str, bytes: &[u8]) -> Result<String> {
        if bytes.is_empty() {
            return Err(Error::validation("Uploaded file is empty"));
        }
        let extension = allowed_extension(filename)?;

        let relative = format!(
            "actas/{acta_id}/{}.{extension}",
            uuid::Uuid::new_v4().simple()
        );
        let target = self.root.join(&relative);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&target, bytes).await?;

        tracing::debug!("Stored {} bytes for acta {acta_id} at {relative}", bytes.len());
        Ok(relative)
    }

    /// Reads a stored document. `relative` must stay inside the root.
    pub async fn read(&self, relative: &str) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.resolve(relative)?).await?)
    }

    /// Deletes a stored document. A file that is already gone is not an error.
    pub async fn remove(&self, relative: &str) -> Result<()> {
        match tokio::fs::remove_file(self.resolve(relative)?).await {
            Ok(()) => {
                tracing::debug!("Removed stored document {relative}");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        let path = Path::new(relative);
        let escapes = path
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if relative.is_empty() || escapes {
            return Err(Error::validation(format!("Invalid document path: {relative}")));
        }
        Ok(self.root.join(path))
    }
}

fn allowed_extension(filename: &str) -> Result<String> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        Ok(extension)
    } else {
        Err(Error::validation(format!(
            "Unsupported file type for {filename}; expected pdf, png or jpg"
        )))
    }
}

/// Content type for a stored document, by extension.
#[must_use]
pub fn content_type(path: &str) -> &'static str {
    match Path::new(path).extension().and_then(|e| e.to_str()) {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_read() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = UploadStore::new(dir.path());

        let path = store.save(7, "Acta Firmada.PDF", b"%PDF-1.4").await?;
        assert!(path.starts_with("actas/7/"));
        assert!(path.ends_with(".pdf"));
        assert_eq!(store.read(&path).await?, b"%PDF-1.4");
        assert_eq!(content_type(&path), "application/pdf");
        Ok(())
    }

    #[tokio::test]
    async fn test_rejects_bad_uploads() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = UploadStore::new(dir.path());

        assert!(matches!(
            store.save(1, "doc.pdf", b"").await,
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            store.save(1, "script.sh", b"echo").await,
            Err(Error::Validation { .. })
        ));
        assert!(matches!(
            store.save(1, "no_extension", b"data").await,
            Err(Error::Validation { .. })
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_read_refuses_escaping_paths() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = UploadStore::new(dir.path());

        for path in ["../secret", "/etc/passwd", "actas/../../x", ""] {
            assert!(matches!(
                store.read(path).await,
                Err(Error::Validation { .. })
            ));
            assert!(matches!(
                store.remove(path).await,
                Err(Error::Validation { .. })
            ));
        }
        Ok(())
    }

    #[tokio::test]
    async fn test_remove() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = UploadStore::new(dir.path());

        let path = store.save(3, "scan.png", b"png").await?;
        store.remove(&path).await?;
        assert!(!dir.path().join(&path).exists());
        assert!(matches!(store.read(&path).await, Err(Error::Io(_))));

        store.remove(&path).await?;
        Ok(())
    }
}

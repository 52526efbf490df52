/// Attachment storage
///
/// Uploaded files are stored flat in a configured directory. Stored names
/// are collision-proof: a random hex identifier joined to a sanitized copy
/// of the original name, e.g. `3f2a…c9_report.pdf`. Only the generated name
/// is ever persisted or served; the user-supplied name never reaches the
/// filesystem as-is.
///
/// Extension policy: files whose extension is not in the allow list are
/// silently skipped — the owning record is still created, just without an
/// attachment reference.
///
/// # Example
///
/// ```no_run
/// use taskfolio_shared::storage::AttachmentStore;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let store = AttachmentStore::new("uploads").await?;
///
/// let stored = store.save("notes.pdf", b"%PDF-1.4...").await?;
/// assert!(stored.is_some());
///
/// let skipped = store.save("script.exe", b"MZ...").await?;
/// assert!(skipped.is_none());
/// # Ok(())
/// # }
/// ```

use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// File extensions accepted for upload (lowercase, without the dot)
pub const ALLOWED_EXTENSIONS: &[&str] =
    &["txt", "pdf", "png", "jpg", "jpeg", "gif", "doc", "docx"];

/// Error type for attachment storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Filesystem operation failed
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested name is not a name this store could have generated
    #[error("Invalid stored file name")]
    InvalidName,
}

/// Checks whether a file name carries an allowed extension
pub fn allowed_file(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => {
            ALLOWED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
        }
        _ => false,
    }
}

/// Sanitizes a user-supplied file name for use in a stored name
///
/// Keeps ASCII alphanumerics, dots, dashes, and underscores; everything
/// else (including path separators) becomes an underscore. Leading dots
/// are stripped so a stored name can never be a hidden or relative path.
pub fn sanitize_filename(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    cleaned.trim_start_matches('.').to_string()
}

/// Generates a collision-proof stored name for an upload
pub fn generate_stored_name(original: &str) -> String {
    format!("{}_{}", Uuid::new_v4().simple(), sanitize_filename(original))
}

/// Flat-file attachment store rooted at one directory
#[derive(Debug, Clone)]
pub struct AttachmentStore {
    dir: PathBuf,
}

impl AttachmentStore {
    /// Opens the store, creating the directory if needed
    pub async fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    /// The directory this store writes into
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stores an upload, returning the generated name
    ///
    /// Returns `Ok(None)` without writing anything when the extension is
    /// not allowed.
    pub async fn save(
        &self,
        original_name: &str,
        contents: &[u8],
    ) -> Result<Option<String>, StorageError> {
        if !allowed_file(original_name) {
            return Ok(None);
        }

        let stored_name = generate_stored_name(original_name);
        tokio::fs::write(self.dir.join(&stored_name), contents).await?;

        Ok(Some(stored_name))
    }

    /// Resolves a stored name to its on-disk path
    ///
    /// Rejects path separators and the bare dot names so callers cannot be
    /// tricked into reading outside the store. Interior dots are fine:
    /// every name [`save`](Self::save) accepts must resolve here, including
    /// ones like `{hex}_report..final.pdf`.
    pub fn path_of(&self, stored_name: &str) -> Result<PathBuf, StorageError> {
        if stored_name.is_empty()
            || stored_name.contains('/')
            || stored_name.contains('\\')
            || stored_name == "."
            || stored_name == ".."
        {
            return Err(StorageError::InvalidName);
        }
        Ok(self.dir.join(stored_name))
    }

    /// Reads a stored attachment
    pub async fn read(&self, stored_name: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.path_of(stored_name)?;
        Ok(tokio::fs::read(path).await?)
    }

    /// Deletes a stored attachment, best effort
    ///
    /// Failure is logged and swallowed: cleanup must never block deleting
    /// or replacing the owning record.
    pub async fn delete_best_effort(&self, stored_name: &str) {
        let path = match self.path_of(stored_name) {
            Ok(p) => p,
            Err(_) => {
                warn!(stored_name, "Refusing to delete invalid stored name");
                return;
            }
        };

        if let Err(e) = tokio::fs::remove_file(&path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!(stored_name, error = %e, "Failed to delete stored attachment");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allowed_file() {
        assert!(allowed_file("report.pdf"));
        assert!(allowed_file("photo.JPG"));
        assert!(!allowed_file("script.exe"));
        assert!(!allowed_file("no_extension"));
        assert!(!allowed_file(".pdf"));
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("notes.pdf"), "notes.pdf");
        assert_eq!(sanitize_filename("my notes (v2).pdf"), "my_notes__v2_.pdf");
        assert_eq!(sanitize_filename("../../etc/passwd"), "_.._etc_passwd");
    }

    #[test]
    fn test_generated_name_differs_from_original() {
        let name = generate_stored_name("report.pdf");
        assert_ne!(name, "report.pdf");
        assert!(name.ends_with("_report.pdf"));
        // 32 hex chars + separator + original
        assert_eq!(name.len(), 32 + 1 + "report.pdf".len());
    }

    #[tokio::test]
    async fn test_save_and_read_allowed_extension() {
        let dir = std::env::temp_dir().join(format!("taskfolio-store-{}", Uuid::new_v4()));
        let store = AttachmentStore::new(&dir).await.unwrap();

        let stored = store.save("notes.txt", b"hello").await.unwrap().unwrap();
        assert_ne!(stored, "notes.txt");
        assert_eq!(store.read(&stored).await.unwrap(), b"hello");

        store.delete_best_effort(&stored).await;
        assert!(store.read(&stored).await.is_err());

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[tokio::test]
    async fn test_save_disallowed_extension_is_skipped() {
        let dir = std::env::temp_dir().join(format!("taskfolio-store-{}", Uuid::new_v4()));
        let store = AttachmentStore::new(&dir).await.unwrap();

        let stored = store.save("script.exe", b"MZ").await.unwrap();
        assert!(stored.is_none());

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[test]
    fn test_path_of_rejects_traversal() {
        let store = AttachmentStore {
            dir: PathBuf::from("uploads"),
        };
        assert!(store.path_of("../secret").is_err());
        assert!(store.path_of("a/b").is_err());
        assert!(store.path_of("").is_err());
        assert!(store.path_of(".").is_err());
        assert!(store.path_of("..").is_err());
        assert!(store.path_of("abc123_file.pdf").is_ok());
        // Interior double dots are a valid part of a stored name
        assert!(store.path_of("abc123_report..final.pdf").is_ok());
    }

    #[tokio::test]
    async fn test_saved_name_with_double_dot_stays_readable() {
        // Every name save() accepts must round-trip through read() and
        // delete_best_effort(); consecutive dots survive sanitization
        let dir = std::env::temp_dir().join(format!("taskfolio-store-{}", Uuid::new_v4()));
        let store = AttachmentStore::new(&dir).await.unwrap();

        let stored = store
            .save("report..final.pdf", b"data")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(store.read(&stored).await.unwrap(), b"data");

        store.delete_best_effort(&stored).await;
        assert!(store.read(&stored).await.is_err());

        tokio::fs::remove_dir_all(&dir).await.ok();
    }

    #[test]
    fn test_delete_ignores_missing_file() {
        // delete_best_effort on a missing file must not panic or error
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let dir = std::env::temp_dir().join(format!("taskfolio-store-{}", Uuid::new_v4()));
            let store = AttachmentStore::new(&dir).await.unwrap();
            store.delete_best_effort("does_not_exist.pdf").await;
            tokio::fs::remove_dir_all(&dir).await.ok();
        });
    }
}

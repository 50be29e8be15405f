//! Local disk storage for uploaded images.
//!
//! Files are stored flat in the upload directory under a random name with an
//! image extension. Names coming back from clients are checked so they can
//! never leave that directory.
//!
//! Only raster image types are accepted. SVG can carry script and is refused.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::UploadConfig;

/// URL prefix files are served under.
pub const FILES_URL_PREFIX: &str = "/api/files/";

/// Accepted image types and the extension each is stored under. Extra
/// spellings of an extension follow the canonical one.
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/jpeg", "jpeg"),
    ("image/png", "png"),
    ("image/gif", "gif"),
    ("image/webp", "webp"),
    ("image/bmp", "bmp"),
    ("image/x-icon", "ico"),
    ("image/avif", "avif"),
];

/// Errors from storing or reading uploaded files.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("File is empty")]
    Empty,

    #[error("Only image files are allowed (got {0})")]
    NotAnImage(String),

    #[error("Unsupported image type: {0}")]
    UnsupportedImage(String),

    #[error("File exceeds the maximum size of {max} bytes")]
    TooLarge { max: usize },

    #[error("At most {max} files can be uploaded at once")]
    TooManyFiles { max: usize },

    #[error("Invalid file name")]
    InvalidName,

    #[error("File not found")]
    NotFound,

    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a successful upload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredFile {
    pub filename: String,
    pub original_filename: Option<String>,
    pub url: String,
    pub size: usize,
}

/// Upload directory plus the limits that apply to it.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
    max_file_size: usize,
    max_files: usize,
}

impl FileStore {
    #[must_use]
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            dir: config.dir.clone(),
            max_file_size: config.max_file_size,
            max_files: config.max_files,
        }
    }

    #[must_use]
    pub const fn max_file_size(&self) -> usize {
        self.max_file_size
    }

    #[must_use]
    pub const fn max_files(&self) -> usize {
        self.max_files
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the upload directory if it is missing.
    ///
    /// # Errors
    ///
    /// Returns `FileError::Io` if the directory cannot be created.
    pub async fn ensure_dir(&self) -> Result<(), FileError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        Ok(())
    }

    /// Check an upload against the type and size rules and return the
    /// extension it will be stored under.
    ///
    /// # Errors
    ///
    /// Returns `FileError::Empty`, `FileError::NotAnImage`,
    /// `FileError::UnsupportedImage`, or `FileError::TooLarge`.
    pub fn validate_image(
        &self,
        content_type: Option<&str>,
        size: usize,
    ) -> Result<&'static str, FileError> {
        if size == 0 {
            return Err(FileError::Empty);
        }
        let content_type = content_type.unwrap_or_default().trim();
        let normalized = content_type.to_ascii_lowercase();
        if !normalized.starts_with("image/") {
            let shown = if content_type.is_empty() {
                "unknown type"
            } else {
                content_type
            };
            return Err(FileError::NotAnImage(shown.to_owned()));
        }
        let extension = IMAGE_TYPES
            .iter()
            .find(|(mime, _)| *mime == normalized)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| FileError::UnsupportedImage(content_type.to_owned()))?;
        if size > self.max_file_size {
            return Err(FileError::TooLarge {
                max: self.max_file_size,
            });
        }
        Ok(extension)
    }

    /// Check how many files arrived in one request.
    ///
    /// # Errors
    ///
    /// Returns `FileError::Empty` for none and `FileError::TooManyFiles` above the limit.
    pub const fn validate_count(&self, count: usize) -> Result<(), FileError> {
        if count == 0 {
            return Err(FileError::Empty);
        }
        if count > self.max_files {
            return Err(FileError::TooManyFiles {
                max: self.max_files,
            });
        }
        Ok(())
    }

    /// Validate and write one image.
    ///
    /// The original extension is kept when it names the same image type as
    /// the upload, otherwise the type's own extension is used.
    ///
    /// # Errors
    ///
    /// Returns the validation errors of [`Self::validate_image`] or `FileError::Io`.
    pub async fn store_image(
        &self,
        original_filename: Option<&str>,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<StoredFile, FileError> {
        let type_extension = self.validate_image(content_type, bytes.len())?;
        let extension = original_filename
            .and_then(image_extension)
            .filter(|ext| same_type(ext, type_extension))
            .unwrap_or(type_extension);

        let filename = format!("{}.{extension}", Uuid::new_v4());
        self.ensure_dir().await?;
        tokio::fs::write(self.dir.join(&filename), bytes).await?;

        info!(%filename, size = bytes.len(), "File stored");
        Ok(StoredFile {
            url: format!("{FILES_URL_PREFIX}{filename}"),
            filename,
            original_filename: original_filename.map(str::to_owned),
            size: bytes.len(),
        })
    }

    /// Where a stored file lives on disk.
    ///
    /// # Errors
    ///
    /// Returns `FileError::InvalidName` for names that could escape the upload
    /// directory.
    pub fn path_of(&self, filename: &str) -> Result<PathBuf, FileError> {
        check_name(filename)?;
        Ok(self.dir.join(filename))
    }
}

/// Reject empty and hidden names, path separators, and parent references.
fn check_name(filename: &str) -> Result<(), FileError> {
    if filename.is_empty()
        || filename.starts_with('.')
        || filename.contains(['/', '\\', '\0'])
        || filename.contains("..")
    {
        return Err(FileError::InvalidName);
    }
    Ok(())
}

/// Accepted image extension of a file name, lowercased.
fn image_extension(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    IMAGE_TYPES
        .iter()
        .find(|(_, known)| *known == ext)
        .map(|(_, known)| *known)
}

fn same_type(a: &str, b: &str) -> bool {
    let mime = |ext: &str| IMAGE_TYPES.iter().find(|(_, e)| *e == ext).map(|(m, _)| *m);
    mime(a).is_some() && mime(a) == mime(b)
}

/// Whether a stored name carries an accepted image extension.
#[must_use]
pub fn is_image_name(filename: &str) -> bool {
    image_extension(filename).is_some()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn store() -> FileStore {
        FileStore::new(&UploadConfig {
            dir: std::env::temp_dir().join(format!("shoplite-files-{}", Uuid::new_v4())),
            max_file_size: 16,
            max_files: 2,
        })
    }

    #[test]
    fn test_validate_image() {
        let store = store();
        assert!(matches!(
            store.validate_image(Some("image/png"), 0),
            Err(FileError::Empty)
        ));
        assert!(matches!(
            store.validate_image(Some("text/plain"), 3),
            Err(FileError::NotAnImage(_))
        ));
        assert!(matches!(
            store.validate_image(None, 3),
            Err(FileError::NotAnImage(_))
        ));
        assert!(matches!(
            store.validate_image(Some("image/png"), 17),
            Err(FileError::TooLarge { max: 16 })
        ));
        assert_eq!(store.validate_image(Some("IMAGE/JPEG"), 16).unwrap(), "jpg");
    }

    #[test]
    fn test_svg_is_refused() {
        let store = store();
        assert!(matches!(
            store.validate_image(Some("image/svg+xml"), 3),
            Err(FileError::UnsupportedImage(_))
        ));
        assert!(!is_image_name("logo.svg"));
    }

    #[test]
    fn test_validate_count() {
        let store = store();
        assert!(store.validate_count(0).is_err());
        assert!(store.validate_count(2).is_ok());
        assert!(matches!(
            store.validate_count(3),
            Err(FileError::TooManyFiles { max: 2 })
        ));
    }

    #[test]
    fn test_check_name() {
        assert!(check_name("abc.png").is_ok());
        assert!(check_name("").is_err());
        assert!(check_name("../etc/passwd").is_err());
        assert!(check_name("..").is_err());
        assert!(check_name(".").is_err());
        assert!(check_name(".env").is_err());
        assert!(check_name("a/b.png").is_err());
        assert!(check_name("a\\b.png").is_err());
        assert!(store().path_of("a..b.png").is_err());
    }

    #[test]
    fn test_image_extensions() {
        assert_eq!(image_extension("Photo.JPG"), Some("jpg"));
        assert_eq!(image_extension("noext"), None);
        assert_eq!(image_extension("page.html"), None);
        assert!(same_type("jpeg", "jpg"));
        assert!(!same_type("png", "jpg"));
        assert!(is_image_name("a.webp"));
        assert!(!is_image_name("a.bin"));
    }

    #[tokio::test]
    async fn test_store_keeps_matching_extension_only() {
        let store = store();
        let stored = store
            .store_image(Some("cat.PNG"), Some("image/png"), b"\x89PNG....")
            .await
            .unwrap();
        assert!(stored.filename.ends_with(".png"));
        assert_eq!(stored.url, format!("/api/files/{}", stored.filename));
        assert_eq!(stored.size, 8);
        let on_disk = tokio::fs::read(store.path_of(&stored.filename).unwrap())
            .await
            .unwrap();
        assert_eq!(on_disk, b"\x89PNG....");

        let disguised = store
            .store_image(Some("page.html"), Some("image/png"), b"<html>")
            .await
            .unwrap();
        assert!(disguised.filename.ends_with(".png"));

        let jpeg = store
            .store_image(Some("photo.jpeg"), Some("image/jpeg"), b"\xff\xd8")
            .await
            .unwrap();
        assert!(jpeg.filename.ends_with(".jpeg"));

        tokio::fs::remove_dir_all(store.dir()).await.unwrap();
    }
}

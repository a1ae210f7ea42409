use std::io;
use std::path::{Component, Path, PathBuf};

use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Directory under the mount path that holds uploaded files.
pub const UPLOAD_SUBDIR: &str = "uploads";

pub const ALLOWED_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "text/plain",
    "text/csv",
    "application/zip",
    "application/vnd.rar",
    "application/x-7z-compressed",
    "image/jpeg",
    "image/png",
    "image/gif",
];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("file exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("request body exceeds the upload limit")]
    BodyLimit,

    #[error("upload stream failed: {0}")]
    Stream(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<MultipartError> for UploadError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            UploadError::BodyLimit
        } else {
            UploadError::Stream(err.body_text())
        }
    }
}

/// A file that made it to disk.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredFile {
    pub filename: String,
    /// Path relative to the mount, e.g. `uploads/file-<hex>.pdf`.
    pub relative_path: String,
    pub size: u64,
}

/// Owns the upload directory on the persistent disk.
#[derive(Debug, Clone)]
pub struct UploadStore {
    base_dir: PathBuf,
    max_bytes: u64,
}

impl UploadStore {
    pub fn new(base_dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            base_dir: base_dir.into(),
            max_bytes,
        }
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.base_dir.join(UPLOAD_SUBDIR)
    }

    pub async fn ensure_dir(&self) -> io::Result<()> {
        let dir = self.uploads_dir();
        fs::create_dir_all(&dir).await?;
        info!("Upload directory ensured at {}", dir.display());
        Ok(())
    }

    pub fn is_allowed(mime: &str) -> bool {
        let essence = mime.split(';').next().unwrap_or_default().trim();
        ALLOWED_MIME_TYPES
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(essence))
    }

    /// `<field>-<32 hex chars><.ext>`; the extension is kept from the
    /// client's name when it is plain ASCII alphanumerics.
    pub fn generate_filename(field_name: &str, original_name: &str) -> String {
        let extension = Path::new(original_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty() && ext.len() <= 10 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
            .unwrap_or_default();
        format!("{}-{}{}", field_name, Uuid::new_v4().simple(), extension)
    }

    /// Maps a stored relative path to disk, refusing anything that would
    /// escape the mount.
    pub fn resolve(&self, relative: &str) -> Option<PathBuf> {
        let path = Path::new(relative);
        if relative.is_empty()
            || path
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return None;
        }
        Some(self.base_dir.join(path))
    }

    /// Writes the chunk stream to a freshly named file. Whatever went wrong,
    /// no partial file survives an `Err`.
    pub async fn store<S, E>(
        &self,
        field_name: &str,
        original_name: &str,
        chunks: S,
    ) -> Result<StoredFile, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<UploadError>,
    {
        let filename = Self::generate_filename(field_name, original_name);
        let relative_path = format!("{}/{}", UPLOAD_SUBDIR, filename);
        let full_path = self.uploads_dir().join(&filename);

        fs::create_dir_all(self.uploads_dir()).await?;
        let mut file = fs::File::create(&full_path).await?;

        match self.write_chunks(&mut file, chunks).await {
            Ok(size) => {
                drop(file);
                Ok(StoredFile {
                    filename,
                    relative_path,
                    size,
                })
            }
            Err(err) => {
                drop(file);
                self.remove_quietly(&relative_path).await;
                Err(err)
            }
        }
    }

    async fn write_chunks<S, E>(&self, file: &mut fs::File, chunks: S) -> Result<u64, UploadError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Into<UploadError>,
    {
        let mut chunks = std::pin::pin!(chunks);
        let mut written: u64 = 0;

        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(Into::into)?;
            written += chunk.len() as u64;
            if written > self.max_bytes {
                return Err(UploadError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;
        Ok(written)
    }

    /// Removes a stored file. A file that is already gone counts as removed.
    pub async fn delete(&self, relative: &str) -> io::Result<()> {
        let Some(full_path) = self.resolve(relative) else {
            warn!("Refusing to delete file outside the upload tree: {:?}", relative);
            return Ok(());
        };
        match fs::remove_file(&full_path).await {
            Ok(()) => {
                info!("Deleted file {}", full_path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(
                    "File not found for deletion (already removed?): {}",
                    full_path.display()
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Best-effort delete: failures are logged and swallowed.
    pub async fn remove_quietly(&self, relative: &str) {
        if let Err(e) = self.delete(relative).await {
            error!("Failed to delete file {}: {}", relative, e);
        }
    }

    /// Full path of a stored file that is present on disk. Missing files and
    /// paths outside the upload tree are `NotFound`.
    pub async fn locate(&self, relative: &str) -> io::Result<PathBuf> {
        let full_path = self
            .resolve(relative)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "path outside upload tree"))?;
        if !fs::metadata(&full_path).await?.is_file() {
            return Err(io::Error::new(io::ErrorKind::NotFound, "not a regular file"));
        }
        Ok(full_path)
    }
}

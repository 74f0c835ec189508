use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::AppError;

const MAX_EXTENSION_LEN: usize = 10;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("file exceeds the {limit} byte upload limit")]
    TooLarge { limit: usize },
    #[error("file is empty")]
    Empty,
    #[error("invalid file reference `{0}`")]
    InvalidReference(String),
    #[error("file `{0}` not found")]
    NotFound(String),
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

impl From<BlobError> for AppError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::TooLarge { .. } => AppError::PayloadTooLarge(err.to_string()),
            BlobError::Empty | BlobError::InvalidReference(_) => {
                AppError::BadRequest(err.to_string())
            }
            BlobError::NotFound(_) => AppError::NotFound("File not found".to_string()),
            BlobError::Io(io) => AppError::Internal(format!("blob storage: {}", io)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    /// Opaque reference recorded in `Page.files`.
    pub reference: String,
    pub size: u64,
    pub sha256: String,
}

/// Flat directory of uploaded files. A reference is a bare file name inside
/// that directory, never a path.
#[derive(Debug, Clone)]
pub struct BlobStore {
    dir: PathBuf,
    max_bytes: usize,
}

impl BlobStore {
    pub async fn open(dir: PathBuf, max_bytes: usize) -> Result<Self, AppError> {
        fs::create_dir_all(&dir).await.map_err(BlobError::from)?;
        info!(dir = %dir.display(), max_bytes, "Blob storage ready");
        Ok(Self { dir, max_bytes })
    }

    pub async fn store(&self, bytes: &[u8], suggested_name: &str) -> Result<StoredBlob, BlobError> {
        if bytes.is_empty() {
            return Err(BlobError::Empty);
        }
        if bytes.len() > self.max_bytes {
            return Err(BlobError::TooLarge {
                limit: self.max_bytes,
            });
        }

        let reference = match sanitized_extension(suggested_name) {
            Some(extension) => format!("{}.{}", Uuid::new_v4().simple(), extension),
            None => Uuid::new_v4().simple().to_string(),
        };
        let path = self.dir.join(&reference);

        let mut file = fs::File::create(&path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;

        let sha256 = hex::encode(Sha256::digest(bytes));
        debug!(reference = %reference, size = bytes.len(), "Blob stored");
        Ok(StoredBlob {
            reference,
            size: bytes.len() as u64,
            sha256,
        })
    }

    pub async fn retrieve(&self, reference: &str) -> Result<Vec<u8>, BlobError> {
        let path = self.resolve(reference)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(reference.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Removing a blob that is already gone is not an error.
    pub async fn delete(&self, reference: &str) -> Result<(), BlobError> {
        let path = self.resolve(reference)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(reference = %reference, "Blob deleted");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(reference = %reference, "Blob already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Deletes every reference, logging failures instead of returning them.
    pub async fn delete_all(&self, references: &[String]) {
        for reference in references {
            if let Err(err) = self.delete(reference).await {
                warn!(reference = %reference, error = %err, "Blob cleanup failed");
            }
        }
    }

    fn resolve(&self, reference: &str) -> Result<PathBuf, BlobError> {
        if !is_plain_file_name(reference) {
            return Err(BlobError::InvalidReference(reference.to_string()));
        }
        Ok(self.dir.join(reference))
    }
}

fn is_plain_file_name(reference: &str) -> bool {
    !reference.is_empty()
        && reference != "."
        && reference != ".."
        && reference
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
        && Path::new(reference).file_name().and_then(|name| name.to_str()) == Some(reference)
}

fn sanitized_extension(name: &str) -> Option<String> {
    let extension = Path::new(name).extension()?.to_str()?;
    let extension: String = extension
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MAX_EXTENSION_LEN)
        .collect::<String>()
        .to_ascii_lowercase();
    (!extension.is_empty()).then_some(extension)
}

use serde::Serialize;

use crate::services::blob_store::StoredBlob;

#[derive(Debug, Serialize)]
pub struct UploadedFile {
    pub file: String,
    pub size: u64,
    pub sha256: String,
}

impl From<StoredBlob> for UploadedFile {
    fn from(blob: StoredBlob) -> Self {
        Self {
            file: blob.reference,
            size: blob.size,
            sha256: blob.sha256,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub uploaded: Vec<UploadedFile>,
    pub files: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<String>,
}

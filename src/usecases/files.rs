use tracing::warn;

use crate::{
    db::Database,
    dto::files::{FileListResponse, UploadResponse, UploadedFile},
    error::AppError,
    models::pages::Page,
    repositories::pages as page_repo,
    services::blob_store::{BlobStore, StoredBlob},
    usecases::ownership::OwnershipCoordinator,
};

/// One file taken from a multipart upload.
#[derive(Debug)]
pub struct IncomingFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

pub struct FileService;

impl FileService {
    /// Stores the files and records them on the page. Blobs written before a
    /// failure are removed again.
    pub async fn upload_files(
        db: &Database,
        coordinator: &OwnershipCoordinator,
        blobs: &BlobStore,
        user_id: i64,
        page_id: i64,
        incoming: Vec<IncomingFile>,
    ) -> Result<UploadResponse, AppError> {
        if incoming.is_empty() {
            return Err(AppError::BadRequest("No files in upload".to_string()));
        }
        owned_page(db, user_id, page_id).await?;

        let mut stored = Vec::with_capacity(incoming.len());
        for file in &incoming {
            match blobs.store(&file.bytes, &file.file_name).await {
                Ok(blob) => stored.push(blob),
                Err(err) => {
                    discard(blobs, &stored).await;
                    return Err(err.into());
                }
            }
        }

        let page = match coordinator.attach_files(user_id, page_id, &stored).await {
            Ok(page) => page,
            Err(err) => {
                discard(blobs, &stored).await;
                return Err(err);
            }
        };

        Ok(UploadResponse {
            uploaded: stored.into_iter().map(UploadedFile::from).collect(),
            files: page.files,
        })
    }

    pub async fn list_files(
        db: &Database,
        user_id: i64,
        page_id: i64,
    ) -> Result<FileListResponse, AppError> {
        let page = owned_page(db, user_id, page_id).await?;
        Ok(FileListResponse { files: page.files })
    }

    pub async fn download_file(
        db: &Database,
        blobs: &BlobStore,
        user_id: i64,
        page_id: i64,
        file: &str,
    ) -> Result<Vec<u8>, AppError> {
        let page = owned_page(db, user_id, page_id).await?;
        read_listed_file(blobs, &page, file).await
    }

    /// Detaches the file from the page, then deletes the blob unless another
    /// page still lists it.
    pub async fn delete_file(
        coordinator: &OwnershipCoordinator,
        blobs: &BlobStore,
        user_id: i64,
        page_id: i64,
        file: &str,
    ) -> Result<FileListResponse, AppError> {
        let (page, orphaned) = coordinator.detach_file(user_id, page_id, file).await?;
        if orphaned && let Err(err) = blobs.delete(file).await {
            warn!(page_id, file = %file, error = %err, "Detached file could not be deleted");
        }
        Ok(FileListResponse { files: page.files })
    }
}

async fn owned_page(db: &Database, user_id: i64, page_id: i64) -> Result<Page, AppError> {
    page_repo::find_owned(db.pool(), page_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Page not found".to_string()))
}

/// Reads a blob only when the page lists it.
pub(crate) async fn read_listed_file(
    blobs: &BlobStore,
    page: &Page,
    file: &str,
) -> Result<Vec<u8>, AppError> {
    if !page.files.iter().any(|listed| listed == file) {
        return Err(AppError::NotFound("File not found".to_string()));
    }
    Ok(blobs.retrieve(file).await?)
}

async fn discard(blobs: &BlobStore, stored: &[StoredBlob]) {
    let references: Vec<String> = stored.iter().map(|blob| blob.reference.clone()).collect();
    warn!(count = references.len(), "Discarding blobs of a failed upload");
    blobs.delete_all(&references).await;
}

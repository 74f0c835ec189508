use axum::{
    Extension, Json,
    extract::{Multipart, Path, State, multipart::MultipartError},
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};

use crate::{
    app::state::AppState,
    auth::middleware::AuthUser,
    dto::files::{FileListResponse, UploadResponse},
    error::AppError,
    usecases::files::{FileService, IncomingFile},
};

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(err.body_text())
    } else {
        AppError::BadRequest(err.body_text())
    }
}

fn content_type_for(file: &str) -> &'static str {
    let extension = file.rsplit_once('.').map(|(_, ext)| ext).unwrap_or_default();
    match extension {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "pdf" => "application/pdf",
        "txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Raw file body with a content type derived from the stored extension.
pub(crate) fn file_response(file: &str, bytes: Vec<u8>) -> Response {
    let mut response = bytes.into_response();
    response.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(file)),
    );
    response
}

pub async fn upload_files_handle(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(page_id): Path<i64>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let mut incoming = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field.bytes().await.map_err(multipart_error)?;
        incoming.push(IncomingFile {
            file_name,
            bytes: bytes.to_vec(),
        });
    }

    let response = FileService::upload_files(
        &state.db,
        &state.coordinator,
        &state.blobs,
        auth_user.user_id,
        page_id,
        incoming,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_files_handle(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(page_id): Path<i64>,
) -> Result<Json<FileListResponse>, AppError> {
    let files = FileService::list_files(&state.db, auth_user.user_id, page_id).await?;
    Ok(Json(files))
}

pub async fn download_file_handle(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((page_id, file)): Path<(i64, String)>,
) -> Result<Response, AppError> {
    let bytes =
        FileService::download_file(&state.db, &state.blobs, auth_user.user_id, page_id, &file)
            .await?;
    Ok(file_response(&file, bytes))
}

pub async fn delete_file_handle(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path((page_id, file)): Path<(i64, String)>,
) -> Result<Json<FileListResponse>, AppError> {
    let files = FileService::delete_file(
        &state.coordinator,
        &state.blobs,
        auth_user.user_id,
        page_id,
        &file,
    )
    .await?;
    Ok(Json(files))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(content_type_for("abc.png"), "image/png");
        assert_eq!(content_type_for("abc.jpeg"), "image/jpeg");
        assert_eq!(content_type_for("abc"), "application/octet-stream");
        assert_eq!(content_type_for("abc.exe"), "application/octet-stream");
    }
}

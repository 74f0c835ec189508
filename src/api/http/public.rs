use axum::{
    Json,
    extract::{Path, State},
    response::{Redirect, Response},
};

use crate::{
    api::http::files::file_response,
    app::state::AppState,
    dto::public::PublicPageResponse,
    error::AppError,
    usecases::{public::PublicService, qrs::QrService},
};

pub async fn get_public_page_handle(
    State(state): State<AppState>,
    Path(page_name): Path<String>,
) -> Result<Json<PublicPageResponse>, AppError> {
    let page = PublicService::get_page(&state.db, &page_name).await?;
    Ok(Json(page))
}

pub async fn get_public_file_handle(
    State(state): State<AppState>,
    Path((page_name, file)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let bytes = PublicService::get_file(&state.db, &state.blobs, &page_name, &file).await?;
    Ok(file_response(&file, bytes))
}

/// Where a scanned QR code lands.
pub async fn resolve_qr_handle(
    State(state): State<AppState>,
    Path(qr_id): Path<i64>,
) -> Result<Redirect, AppError> {
    let link = QrService::resolve_link(&state.db, qr_id).await?;
    Ok(Redirect::temporary(&link))
}

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    app::state::AppState,
    auth::middleware::AuthUser,
    dto::qrs::{CreateQrRequest, CreateQrResponse, QrResponse, RelinkQrRequest, UpdateQrRequest},
    error::AppError,
    usecases::qrs::QrService,
};

pub async fn create_qr_handle(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<CreateQrRequest>,
) -> Result<(StatusCode, Json<CreateQrResponse>), AppError> {
    let response = QrService::create_qr(&state.coordinator, auth_user.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_qrs_handle(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<Vec<QrResponse>>, AppError> {
    let qrs = QrService::list_qrs(&state.db, auth_user.user_id).await?;
    Ok(Json(qrs))
}

pub async fn get_qr_handle(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(qr_id): Path<i64>,
) -> Result<Json<QrResponse>, AppError> {
    let qr = QrService::get_qr(&state.db, auth_user.user_id, qr_id).await?;
    Ok(Json(qr))
}

pub async fn update_qr_handle(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(qr_id): Path<i64>,
    Json(req): Json<UpdateQrRequest>,
) -> Result<Json<QrResponse>, AppError> {
    let qr = QrService::update_qr(&state.coordinator, auth_user.user_id, qr_id, req).await?;
    Ok(Json(qr))
}

pub async fn relink_qr_handle(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(qr_id): Path<i64>,
    Json(req): Json<RelinkQrRequest>,
) -> Result<Json<QrResponse>, AppError> {
    let qr =
        QrService::relink_qr(&state.coordinator, auth_user.user_id, qr_id, req.page_id).await?;
    Ok(Json(qr))
}

pub async fn delete_qr_handle(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(qr_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    QrService::delete_qr(&state.coordinator, auth_user.user_id, qr_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

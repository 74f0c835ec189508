use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    app::state::AppState,
    auth::middleware::AuthUser,
    dto::pages::{CreatePageRequest, PageResponse, UpdatePageRequest},
    error::AppError,
    usecases::pages::PageService,
};

pub async fn create_page_handle(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Json(req): Json<CreatePageRequest>,
) -> Result<(StatusCode, Json<PageResponse>), AppError> {
    let page = PageService::create_page(&state.coordinator, auth_user.user_id, req).await?;
    Ok((StatusCode::CREATED, Json(page)))
}

pub async fn list_pages_handle(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<Vec<PageResponse>>, AppError> {
    let pages = PageService::list_pages(&state.db, &state.coordinator, auth_user.user_id).await?;
    Ok(Json(pages))
}

pub async fn get_page_handle(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(page_id): Path<i64>,
) -> Result<Json<PageResponse>, AppError> {
    let page =
        PageService::get_page(&state.db, &state.coordinator, auth_user.user_id, page_id).await?;
    Ok(Json(page))
}

pub async fn update_page_handle(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(page_id): Path<i64>,
    Json(req): Json<UpdatePageRequest>,
) -> Result<Json<PageResponse>, AppError> {
    let page =
        PageService::update_page(&state.coordinator, auth_user.user_id, page_id, req).await?;
    Ok(Json(page))
}

pub async fn delete_page_handle(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    Path(page_id): Path<i64>,
) -> Result<StatusCode, AppError> {
    PageService::delete_page(&state.coordinator, &state.blobs, auth_user.user_id, page_id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

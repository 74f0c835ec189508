use axum::{Extension, Json, extract::State, http::StatusCode};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    app::state::AppState,
    auth::{
        middleware::AuthUser,
        session::{clear_session, session_cookie},
    },
    dto::auth::{
        DeleteAccountResponse, LoginRequest, LoginResponse, MessageResponse, RegisterRequest,
        UserResponse,
    },
    error::AppError,
    usecases::auth::UserServices,
};

fn with_session(state: &AppState, jar: CookieJar, token: &str) -> CookieJar {
    jar.add(session_cookie(
        token.to_string(),
        state.credentials.validity(),
        state.cookie_secure,
    ))
}

pub async fn register_handle(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, CookieJar, Json<LoginResponse>), AppError> {
    let response = UserServices::register_user(&state.db, &state.credentials, req).await?;
    let jar = with_session(&state, jar, &response.token);
    Ok((StatusCode::CREATED, jar, Json(response)))
}

pub async fn login_handle(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>), AppError> {
    let response = UserServices::login(&state.db, &state.credentials, req).await?;
    let jar = with_session(&state, jar, &response.token);
    Ok((jar, Json(response)))
}

pub async fn logout_handle(jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    (
        clear_session(jar),
        Json(MessageResponse {
            message: "Logged out".to_string(),
        }),
    )
}

pub async fn get_me_handle(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<UserResponse>, AppError> {
    let user = UserServices::get_user_by_id(&state.db, auth_user.user_id).await?;
    Ok(Json(user))
}

pub async fn delete_account_handle(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<(CookieJar, Json<DeleteAccountResponse>), AppError> {
    let response =
        UserServices::delete_account(&state.coordinator, &state.blobs, auth_user.user_id).await?;
    Ok((clear_session(jar), Json(response)))
}

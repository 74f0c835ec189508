use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::{
    app::state::AppState,
    auth::session::session_token,
    error::{AppError, AuthFailure},
    repositories::users::USERS,
};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i64,
}

/// Session token from the cookie, falling back to `Authorization: Bearer`.
fn request_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    session_token(&jar).or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request_token(req.headers())
        .ok_or(AppError::Unauthenticated(AuthFailure::MissingToken))?;

    let claims = state.credentials.decode(&token)?;
    let user_id = claims.user_id()?;

    let user = USERS
        .get(state.db.pool(), user_id)
        .await?
        .ok_or(AppError::Unauthenticated(AuthFailure::UnknownSubject))?;

    req.extensions_mut().insert(AuthUser { user_id: user.id });

    Ok(next.run(req).await)
}

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Duration;

pub const SESSION_COOKIE: &str = "access_user_token";

pub fn session_cookie(token: String, validity: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::None)
        .max_age(time::Duration::seconds(validity.num_seconds()))
        .build()
}

/// Expires the session cookie on the client.
pub fn clear_session(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}

pub fn session_token(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|value| !value.is_empty())
}

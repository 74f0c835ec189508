use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    api::http::{
        auth as auth_http, files as files_http, pages as pages_http, public as public_http,
        qrs as qrs_http,
    },
    app::{config::AppConfig, middleware::security_headers, state::AppState},
    auth::middleware::auth_middleware,
    error::AppError,
    telemetry::request_logging_middleware,
};

/// Multipart framing on top of the per-file ceiling.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;
/// Files accepted in one upload request.
const MAX_FILES_PER_UPLOAD: usize = 10;

pub fn build_router(state: AppState, config: &AppConfig) -> Result<Router, AppError> {
    let origin = config
        .cors_origin
        .parse::<HeaderValue>()
        .map_err(|err| AppError::Internal(format!("CORS_ORIGIN invalid: {}", err)))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    let public_routes = Router::new()
        .route("/user/register", post(auth_http::register_handle))
        .route("/user/login", post(auth_http::login_handle))
        .route("/user/logout", post(auth_http::logout_handle))
        .route("/public/qr/{qr_id}", get(public_http::resolve_qr_handle))
        .route(
            "/public/{page_name}",
            get(public_http::get_public_page_handle),
        )
        .route(
            "/public/{page_name}/files/{file}",
            get(public_http::get_public_file_handle),
        );

    let upload_limit = config
        .max_upload_bytes
        .saturating_mul(MAX_FILES_PER_UPLOAD)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    let authenticated_routes = Router::new()
        .route(
            "/user/me",
            get(auth_http::get_me_handle).delete(auth_http::delete_account_handle),
        )
        .route("/user/check", get(auth_http::get_me_handle))
        .route(
            "/qr",
            post(qrs_http::create_qr_handle).get(qrs_http::list_qrs_handle),
        )
        .route(
            "/qr/{qr_id}",
            get(qrs_http::get_qr_handle)
                .put(qrs_http::update_qr_handle)
                .delete(qrs_http::delete_qr_handle),
        )
        .route("/qr/{qr_id}/relink", post(qrs_http::relink_qr_handle))
        .route(
            "/page",
            post(pages_http::create_page_handle).get(pages_http::list_pages_handle),
        )
        .route(
            "/page/{page_id}",
            get(pages_http::get_page_handle)
                .put(pages_http::update_page_handle)
                .delete(pages_http::delete_page_handle),
        )
        .route(
            "/page/{page_id}/files",
            post(files_http::upload_files_handle)
                .get(files_http::list_files_handle)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/page/{page_id}/files/{file}",
            get(files_http::download_file_handle).delete(files_http::delete_file_handle),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Ok(Router::new()
        .merge(public_routes)
        .merge(authenticated_routes)
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, Response, StatusCode},
    };
    use serde_json::{Value, json};
    use tower::util::ServiceExt;

    use crate::testing::{BASE_URL, TestApp, test_app};

    async fn send(app: &TestApp, request: Request<Body>) -> Response<Body> {
        app.router.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn register(app: &TestApp, username: &str) -> String {
        let response = send(
            app,
            json_request(
                "POST",
                "/user/register",
                None,
                json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": "hunter2"
                }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await["token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn login_sets_the_session_cookie() {
        let app = test_app().await;
        register(&app, "alice").await;

        let response = send(
            &app,
            json_request(
                "POST",
                "/user/login",
                None,
                json!({ "email": "alice@example.com", "password": "hunter2" }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response
            .headers()
            .get("set-cookie")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(cookie.starts_with("access_user_token="));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Secure"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Max-Age=2592000"));

        let session = cookie.split(';').next().unwrap().to_string();
        let me = send(
            &app,
            Request::builder()
                .uri("/user/me")
                .header("cookie", session)
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(me.status(), StatusCode::OK);
        assert_eq!(json_body(me).await["username"], "alice");
    }

    #[tokio::test]
    async fn token_failures_are_distinguishable() {
        let app = test_app().await;

        let missing = send(&app, get("/user/check", None)).await;
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(missing).await["error"]["code"], "TOKEN_MISSING");

        let invalid = send(&app, get("/user/check", Some("garbage"))).await;
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(invalid).await["error"]["code"], "TOKEN_INVALID");

        let orphan = app.state.credentials.issue(9999).unwrap();
        let unknown = send(&app, get("/user/check", Some(&orphan))).await;
        assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(unknown).await["error"]["code"], "USER_NOT_FOUND");
    }

    #[tokio::test]
    async fn qr_to_public_page_flow() {
        let app = test_app().await;
        let token = register(&app, "alice").await;

        let created = send(
            &app,
            json_request("POST", "/qr", Some(&token), json!({ "name": "Promo" })),
        )
        .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let created = json_body(created).await;
        let qr_id = created["qr"]["id"].as_i64().unwrap();
        let page_id = created["page"]["id"].as_i64().unwrap();
        assert_eq!(created["qr"]["link"], format!("{}/pages/promo", BASE_URL));

        let hidden = send(&app, get("/public/promo", None)).await;
        assert_eq!(hidden.status(), StatusCode::NOT_FOUND);

        let updated = send(
            &app,
            json_request(
                "PUT",
                &format!("/page/{}", page_id),
                Some(&token),
                json!({
                    "published": true,
                    "elements": [{ "id": 1, "type": "text", "x": 0, "y": 0, "text": "Hello" }]
                }),
            ),
        )
        .await;
        assert_eq!(updated.status(), StatusCode::OK);

        let public = send(&app, get("/public/promo", None)).await;
        assert_eq!(public.status(), StatusCode::OK);
        let document = json_body(public).await;
        assert_eq!(document["content"]["blocks"][0]["text"], "Hello");

        let redirect = send(&app, get(&format!("/public/qr/{}", qr_id), None)).await;
        assert_eq!(redirect.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(
            redirect.headers().get("location").unwrap(),
            &format!("{}/pages/promo", BASE_URL)
        );
    }

    #[tokio::test]
    async fn invalid_elements_report_the_field() {
        let app = test_app().await;
        let token = register(&app, "alice").await;

        let response = send(
            &app,
            json_request(
                "POST",
                "/page",
                Some(&token),
                json!({
                    "name": "broken",
                    "elements": [{
                        "id": 1, "type": "rectangle", "x": 0, "y": 0, "width": -1, "height": 1
                    }]
                }),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["field"], "elements[0].width");
    }

    #[tokio::test]
    async fn other_tenants_get_not_found() {
        let app = test_app().await;
        let alice = register(&app, "alice").await;
        let bob = register(&app, "bob").await;

        let created = json_body(
            send(
                &app,
                json_request("POST", "/qr", Some(&alice), json!({ "name": "Menu" })),
            )
            .await,
        )
        .await;
        let qr_id = created["qr"]["id"].as_i64().unwrap();
        let page_id = created["page"]["id"].as_i64().unwrap();

        for uri in [format!("/qr/{}", qr_id), format!("/page/{}", page_id)] {
            let response = send(&app, get(&uri, Some(&bob))).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
        }
        let listed = json_body(send(&app, get("/qr", Some(&bob))).await).await;
        assert_eq!(listed, json!([]));
    }

    #[tokio::test]
    async fn multipart_upload_is_served_publicly_once_published() {
        let app = test_app().await;
        let token = register(&app, "alice").await;
        let page = json_body(
            send(
                &app,
                json_request(
                    "POST",
                    "/page",
                    Some(&token),
                    json!({ "name": "docs", "published": true }),
                ),
            )
            .await,
        )
        .await;
        let page_id = page["id"].as_i64().unwrap();

        let boundary = "XBOUNDARYX";
        let body = format!(
            concat!(
                "--{b}\r\n",
                "Content-Disposition: form-data; name=\"file\"; filename=\"note.txt\"\r\n",
                "Content-Type: text/plain\r\n\r\n",
                "hello\r\n--{b}--\r\n",
            ),
            b = boundary
        );
        let upload = send(
            &app,
            Request::builder()
                .method("POST")
                .uri(format!("/page/{}/files", page_id))
                .header("authorization", format!("Bearer {}", token))
                .header(
                    "content-type",
                    format!("multipart/form-data; boundary={}", boundary),
                )
                .body(Body::from(body))
                .unwrap(),
        )
        .await;
        assert_eq!(upload.status(), StatusCode::CREATED);
        let uploaded = json_body(upload).await;
        let file = uploaded["uploaded"][0]["file"].as_str().unwrap().to_string();
        assert!(file.ends_with(".txt"));

        let download = send(&app, get(&format!("/public/docs/files/{}", file), None)).await;
        assert_eq!(download.status(), StatusCode::OK);
        assert_eq!(
            download.headers().get("content-type").unwrap(),
            "text/plain; charset=utf-8"
        );
        let bytes = to_bytes(download.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"hello");
    }

    #[tokio::test]
    async fn deleting_the_account_clears_the_session() {
        let app = test_app().await;
        let token = register(&app, "alice").await;
        send(
            &app,
            json_request("POST", "/qr", Some(&token), json!({ "name": "Menu" })),
        )
        .await;

        let response = send(
            &app,
            Request::builder()
                .method("DELETE")
                .uri("/user/me")
                .header("authorization", format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers().get("set-cookie").unwrap().to_str().unwrap();
        assert!(cookie.starts_with("access_user_token="));
        let body = json_body(response).await;
        assert_eq!(body["qrs_deleted"], 1);
        assert_eq!(body["pages_deleted"], 1);

        let after = send(&app, get("/user/me", Some(&token))).await;
        assert_eq!(json_body(after).await["error"]["code"], "USER_NOT_FOUND");
    }
}

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, State},
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use vidcast_shared::token::TokenSigner;

use crate::config::ServerConfig;
use crate::error::ServerError;
use crate::media_store::{content_type_for, MediaStore};
use crate::routes;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub media: Arc<MediaStore>,
    pub signer: Arc<TokenSigner>,
    pub config: Arc<ServerConfig>,
}

pub fn build_router(state: AppState) -> Router {
    let origins: Vec<HeaderValue> = state
        .config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(true);

    // A publish carries two files plus form fields.
    let body_limit = state
        .config
        .max_upload_size
        .saturating_mul(2)
        .saturating_add(1024 * 1024);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/media/:file", get(media_download))
        .nest("/api/v1", routes::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Success envelope shared by every API route.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    status_code: u16,
    data: T,
    message: String,
    success: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::OK, data, message)
    }

    pub fn created(data: T, message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::CREATED, data, message)
    }

    fn with_status(status: StatusCode, data: T, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            data,
            message: message.into(),
            success: true,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn root() -> &'static str {
    "vidcast API is running"
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn media_download(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    let data = state.media.read(&file).await?;
    Ok(([(CONTENT_TYPE, content_type_for(&file))], data))
}

pub async fn serve(state: AppState, addr: std::net::SocketAddr) -> anyhow::Result<()> {
    let app = build_router(state);

    info!(addr = %addr, "Starting HTTP API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header::SET_COOKIE, Request};
    use serde_json::{json, Value};
    use tempfile::TempDir;
    use tower::ServiceExt;
    use vidcast_store::Database;

    pub(crate) async fn test_app() -> (Router, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = ServerConfig {
            media_storage_path: dir.path().join("media"),
            public_base_url: "http://test.local".into(),
            ..ServerConfig::default()
        };
        let media = MediaStore::new(
            config.media_storage_path.clone(),
            config.max_upload_size,
            &config.public_base_url,
        )
        .await
        .unwrap();
        let state = AppState {
            store: Store::new(Database::open_in_memory().unwrap()),
            media: Arc::new(media),
            signer: Arc::new(TokenSigner::generate()),
            config: Arc::new(config),
        };
        (build_router(state), dir)
    }

    /// Number of files currently in the test app's media directory.
    pub(crate) fn stored_media(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path().join("media")).unwrap().count()
    }

    pub(crate) async fn call(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let resp = app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    pub(crate) fn json_request(
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    /// Sign up and log in; returns (user id, token).
    pub(crate) async fn login_as(app: &Router, name: &str) -> (String, String) {
        let email = format!("{name}@example.com");
        let (status, _) = call(
            app,
            json_request(
                Method::POST,
                "/api/v1/account/signup",
                None,
                json!({ "name": name, "email": email, "password": "pw" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = call(
            app,
            json_request(
                Method::POST,
                "/api/v1/account/login",
                None,
                json!({ "email": email, "password": "pw" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        (
            body["data"]["user"]["id"].as_str().unwrap().to_string(),
            body["data"]["accessToken"].as_str().unwrap().to_string(),
        )
    }

    pub(crate) async fn create_channel(app: &Router, token: &str, handle: &str) -> String {
        let (status, body) = call(
            app,
            json_request(
                Method::POST,
                "/api/v1/channel/create",
                Some(token),
                json!({ "name": format!("{handle} channel"), "handle": handle }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_and_root() {
        let (app, _dir) = test_app().await;
        let (status, body) = call(
            &app,
            Request::get("/health").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let resp = app
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_signup_login_and_protected_route() {
        let (app, _dir) = test_app().await;
        let (user_id, token) = login_as(&app, "alice").await;

        let (status, body) = call(
            &app,
            json_request(
                Method::POST,
                "/api/v1/channel/create",
                Some(&token),
                json!({ "name": "Alice", "handle": "@alice" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["statusCode"], 201);
        assert_eq!(body["data"]["owner"], user_id.as_str());

        let (_, body) = call(
            &app,
            Request::get(format!("/api/v1/account/userData/{user_id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(body["data"]["hasChannel"], true);
        assert!(body["data"].get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn test_login_sets_cookie_and_cookie_authenticates() {
        let (app, _dir) = test_app().await;
        let _ = login_as(&app, "carol").await;

        let resp = app
            .clone()
            .oneshot(json_request(
                Method::POST,
                "/api/v1/account/login",
                None,
                json!({ "email": "carol@example.com", "password": "pw" }),
            ))
            .await
            .unwrap();
        let cookie = resp
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
            .to_string();
        assert!(cookie.contains("HttpOnly"));
        let pair = cookie.split(';').next().unwrap().to_string();

        let req = Request::post("/api/v1/account/logout")
            .header("cookie", pair)
            .body(Body::empty())
            .unwrap();
        let (status, _) = call(&app, req).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_bad_credentials_are_unauthorized() {
        let (app, _dir) = test_app().await;
        let _ = login_as(&app, "dave").await;
        let (status, body) = call(
            &app,
            json_request(
                Method::POST,
                "/api/v1/account/login",
                None,
                json!({ "email": "dave@example.com", "password": "wrong" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "InvalidCredentials");
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_missing_or_forged_token_is_unauthorized() {
        let (app, _dir) = test_app().await;
        let body = json!({ "name": "x", "handle": "@x" });

        let (status, err) = call(
            &app,
            json_request(Method::POST, "/api/v1/channel/create", None, body.clone()),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(err["error"], "Unauthorized");

        let (status, _) = call(
            &app,
            json_request(Method::POST, "/api/v1/channel/create", Some("abc.def"), body),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_subscribe_twice_conflicts() {
        let (app, _dir) = test_app().await;
        let (_, owner) = login_as(&app, "owner").await;
        let (_, fan) = login_as(&app, "fan").await;
        let channel = create_channel(&app, &owner, "@owner").await;

        let uri = format!("/api/v1/channel/subscribe/{channel}");
        let (status, body) = call(&app, json_request(Method::POST, &uri, Some(&fan), json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["subscribers"].as_array().unwrap().len(), 1);

        let (status, body) = call(&app, json_request(Method::POST, &uri, Some(&fan), json!({}))).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "Conflict");

        let uri = format!("/api/v1/channel/unsubscribe/{channel}");
        let (status, _) = call(&app, json_request(Method::POST, &uri, Some(&fan), json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        let (status, body) = call(&app, json_request(Method::POST, &uri, Some(&fan), json!({}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "NotSubscribed");
    }

    #[tokio::test]
    async fn test_unknown_media_is_not_found() {
        let (app, _dir) = test_app().await;
        let (status, body) = call(
            &app,
            Request::get("/media/missing.png").body(Body::empty()).unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NotFound");
    }
}

use axum::{
    extract::{Multipart, Path, State},
    http::header::SET_COOKIE,
    response::IntoResponse,
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use vidcast_shared::token::AccessClaims;
use vidcast_shared::UserId;
use vidcast_store::{AccountUpdate, CascadeReport, NewUser, StoreError, User};

use super::{discard_uploads, replaced, upload_or_keep};
use crate::api::{ApiResponse, AppState};
use crate::auth::{cleared_cookie, session_cookie, AuthUser};
use crate::error::ServerError;
use crate::form::MultipartForm;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/userData/:id", get(user_data))
        .route("/update/:id", put(update_account))
        .route("/delete/:id", delete(delete_account))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    user: User,
    access_token: String,
}

async fn signup(
    State(state): State<AppState>,
    Json(new): Json<NewUser>,
) -> Result<ApiResponse<User>, ServerError> {
    let avatar = state.config.default_avatar_url.clone();
    let user = state
        .store
        .run(move |db| db.register_user(&new, Some(avatar.as_str())))
        .await?;

    info!(user_id = %user.id, "account created");
    Ok(ApiResponse::created(user, "User created successfully"))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServerError> {
    if req.email.trim().is_empty() || req.password.is_empty() {
        return Err(StoreError::ValidationFailed("All fields are required".into()).into());
    }

    let user = state
        .store
        .run(move |db| db.authenticate(&req.email, &req.password))
        .await?;

    let claims = AccessClaims::new(user.id, &user.email, &user.name, state.config.token_ttl());
    let access_token = state
        .signer
        .issue(&claims)
        .map_err(|e| ServerError::Internal(format!("token signing failed: {e}")))?;

    let cookie = session_cookie(&access_token, state.config.access_token_ttl_secs);
    info!(user_id = %user.id, "logged in");

    Ok((
        [(SET_COOKIE, cookie)],
        ApiResponse::ok(
            LoginResponse { user, access_token },
            "User logged in successfully",
        ),
    ))
}

async fn logout(AuthUser(user): AuthUser) -> impl IntoResponse {
    info!(user_id = %user.id, "logged out");
    (
        [(SET_COOKIE, cleared_cookie())],
        ApiResponse::ok(serde_json::json!({}), "User logged out"),
    )
}

async fn user_data(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
) -> Result<ApiResponse<User>, ServerError> {
    let user = state.store.run(move |db| db.get_user(id)).await?;
    Ok(ApiResponse::ok(user, "User data retrieved successfully"))
}

async fn update_account(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    AuthUser(actor): AuthUser,
    multipart: Multipart,
) -> Result<ApiResponse<User>, ServerError> {
    if id != actor.id {
        return Err(StoreError::Forbidden("You can only update your own account".into()).into());
    }

    let form = MultipartForm::read(multipart, state.media.max_size()).await?;
    let update = AccountUpdate {
        name: form.text("name").unwrap_or_default().to_string(),
        email: form.text("email").unwrap_or_default().to_string(),
        password: form.text("password").unwrap_or_default().to_string(),
        avatar: upload_or_keep(&state, &form, "avatar").await,
    };

    let actor_id = actor.id;
    let upload = update.avatar.clone();
    let user = match state.store.run(move |db| db.update_account(id, actor_id, &update)).await {
        Ok(user) => user,
        Err(e) => {
            discard_uploads(&state, upload).await;
            return Err(e);
        }
    };
    discard_uploads(&state, replaced(actor.avatar, user.avatar.as_ref())).await;
    Ok(ApiResponse::ok(user, "Account details updated successfully"))
}

async fn delete_account(
    State(state): State<AppState>,
    Path(id): Path<UserId>,
    AuthUser(actor): AuthUser,
) -> Result<impl IntoResponse, ServerError> {
    if id != actor.id {
        return Err(StoreError::Forbidden("You can only delete your own account".into()).into());
    }

    let actor_id = actor.id;
    let (report, media): (CascadeReport, Vec<String>) = state
        .store
        .run(move |db| {
            let user = db.get_user(id)?;
            let mut media: Vec<String> = user.avatar.into_iter().collect();
            for channel in db.list_channels_by_owner(id)? {
                media.extend([channel.banner, channel.avatar].into_iter().flatten());
            }
            for video in db.list_videos_by_owner(id)? {
                media.extend([video.thumbnail, video.video_file]);
            }
            let report = db.delete_user(id, actor_id)?;
            Ok((report, media))
        })
        .await?;
    discard_uploads(&state, media).await;

    Ok((
        [(SET_COOKIE, cleared_cookie())],
        ApiResponse::ok(report, "Account and associated data deleted successfully"),
    ))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode};
    use serde_json::json;

    use crate::api::tests::{
        call, create_channel, json_request, login_as, stored_media, test_app,
    };
    use crate::routes::videos::tests::publish;

    #[tokio::test]
    async fn signup_requires_fields_and_unique_identity() {
        let (app, _dir) = test_app().await;
        let (status, body) = call(
            &app,
            json_request(
                Method::POST,
                "/api/v1/account/signup",
                None,
                json!({ "name": "x", "email": "" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "ValidationFailed");

        let _ = login_as(&app, "erin").await;
        let (status, _) = call(
            &app,
            json_request(
                Method::POST,
                "/api/v1/account/signup",
                None,
                json!({ "name": "erin", "email": "other@example.com", "password": "pw" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn delete_account_cascades_and_revokes_access() {
        let (app, dir) = test_app().await;
        let (id, token) = login_as(&app, "frank").await;
        let (_, other) = login_as(&app, "gina").await;
        let channel = create_channel(&app, &token, "@frank").await;
        publish(&app, &token, "farewell", "").await;
        assert_eq!(stored_media(&dir), 2);

        let uri = format!("/api/v1/account/delete/{id}");
        let (status, _) = call(&app, json_request(Method::DELETE, &uri, Some(&other), json!({}))).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = call(&app, json_request(Method::DELETE, &uri, Some(&token), json!({}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["channelsDeleted"], 1);
        assert_eq!(body["data"]["videosDeleted"], 1);
        assert_eq!(stored_media(&dir), 0);

        let (status, _) = call(
            &app,
            json_request(
                Method::GET,
                &format!("/api/v1/channel/data/{channel}"),
                Some(&other),
                json!({}),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        // The token outlives the account but no longer resolves.
        let (status, _) = call(
            &app,
            Request::post("/api/v1/account/logout")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}

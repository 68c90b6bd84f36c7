use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::Deserialize;

use vidcast_shared::{CommentId, VideoId};
use vidcast_store::Comment;

use crate::api::{ApiResponse, AppState};
use crate::auth::AuthUser;
use crate::error::ServerError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/video/:videoId", get(list_comments).post(add_comment))
        .route("/:commentId", put(update_comment).delete(delete_comment))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct NewCommentRequest {
    comment: String,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct EditCommentRequest {
    new_comment: String,
}

async fn list_comments(
    State(state): State<AppState>,
    Path(video_id): Path<VideoId>,
) -> Result<ApiResponse<Vec<Comment>>, ServerError> {
    let comments = state
        .store
        .run(move |db| db.list_comments_for_video(video_id))
        .await?;
    Ok(ApiResponse::ok(comments, "Comments fetched successfully"))
}

async fn add_comment(
    State(state): State<AppState>,
    Path(video_id): Path<VideoId>,
    AuthUser(author): AuthUser,
    Json(req): Json<NewCommentRequest>,
) -> Result<ApiResponse<Comment>, ServerError> {
    let comment = state
        .store
        .run(move |db| db.add_comment(video_id, &author, &req.comment))
        .await?;
    Ok(ApiResponse::created(comment, "Comment added successfully"))
}

async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<CommentId>,
    AuthUser(actor): AuthUser,
    Json(req): Json<EditCommentRequest>,
) -> Result<ApiResponse<Comment>, ServerError> {
    let actor_id = actor.id;
    let comment = state
        .store
        .run(move |db| db.update_comment(id, actor_id, &req.new_comment))
        .await?;
    Ok(ApiResponse::ok(comment, "Comment updated successfully"))
}

async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<CommentId>,
    AuthUser(actor): AuthUser,
) -> Result<ApiResponse<serde_json::Value>, ServerError> {
    let actor_id = actor.id;
    state
        .store
        .run(move |db| db.delete_comment(id, actor_id))
        .await?;
    Ok(ApiResponse::ok(serde_json::json!({}), "Comment deleted successfully"))
}

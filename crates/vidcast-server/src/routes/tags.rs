use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use vidcast_shared::TagId;
use vidcast_store::Tag;

use crate::api::{ApiResponse, AppState};
use crate::error::ServerError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tags))
        .route("/createTags", post(create_tag))
        .route("/deleteTags/:id", delete(delete_tag))
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct CreateTagRequest {
    name: String,
}

async fn create_tag(
    State(state): State<AppState>,
    Json(req): Json<CreateTagRequest>,
) -> Result<ApiResponse<Tag>, ServerError> {
    let tag = state.store.run(move |db| db.create_tag(&req.name)).await?;
    Ok(ApiResponse::created(tag, "Tag created successfully"))
}

async fn list_tags(State(state): State<AppState>) -> Result<ApiResponse<Vec<Tag>>, ServerError> {
    let tags = state.store.run(|db| db.list_tags()).await?;
    Ok(ApiResponse::ok(tags, "Tags fetched successfully"))
}

async fn delete_tag(
    State(state): State<AppState>,
    Path(id): Path<TagId>,
) -> Result<ApiResponse<serde_json::Value>, ServerError> {
    state.store.run(move |db| db.delete_tag(id)).await?;
    Ok(ApiResponse::ok(serde_json::json!({}), "Tag deleted successfully"))
}

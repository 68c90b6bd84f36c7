use axum::{
    extract::{Multipart, Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use serde::Deserialize;
use tracing::info;

use vidcast_shared::{UserId, VideoId};
use vidcast_store::{parse_tag_list, CascadeReport, NewVideo, StoreError, Video, VideoUpdate};

use super::{
    discard_uploads, populate_video, populate_videos, replaced, upload_or_keep, upload_required,
    VideoView,
};
use crate::api::{ApiResponse, AppState};
use crate::auth::AuthUser;
use crate::error::ServerError;
use crate::form::MultipartForm;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/allVideo", get(all_videos))
        .route("/videoData/:id", get(video_data))
        .route("/allUserVideo/:owner", get(user_videos))
        .route("/incrementView/:id", put(increment_view))
        .route("/publish", post(publish))
        .route("/delete/:id", delete(delete_video))
        .route("/like", post(like))
        .route("/removelike", post(remove_like))
        .route("/update/:id", put(update_video))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LikeRequest {
    video_id: VideoId,
}

async fn all_videos(State(state): State<AppState>) -> Result<ApiResponse<Vec<VideoView>>, ServerError> {
    let videos = state
        .store
        .run(|db| {
            let videos = db.list_videos()?;
            populate_videos(db, videos)
        })
        .await?;
    Ok(ApiResponse::ok(videos, "Videos fetched successfully"))
}

async fn video_data(
    State(state): State<AppState>,
    Path(id): Path<VideoId>,
) -> Result<ApiResponse<VideoView>, ServerError> {
    let video = state
        .store
        .run(move |db| {
            let video = db.get_video(id)?;
            populate_video(db, video)
        })
        .await?;
    Ok(ApiResponse::ok(video, "Video fetched successfully"))
}

async fn user_videos(
    State(state): State<AppState>,
    Path(owner): Path<UserId>,
) -> Result<ApiResponse<Vec<VideoView>>, ServerError> {
    let videos = state
        .store
        .run(move |db| {
            let videos = db.list_videos_by_owner(owner)?;
            populate_videos(db, videos)
        })
        .await?;
    Ok(ApiResponse::ok(videos, "User videos fetched successfully"))
}

async fn increment_view(
    State(state): State<AppState>,
    Path(id): Path<VideoId>,
) -> Result<ApiResponse<Video>, ServerError> {
    let video = state.store.run(move |db| db.increment_views(id)).await?;
    Ok(ApiResponse::ok(video, "Video views updated"))
}

async fn publish(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    multipart: Multipart,
) -> Result<ApiResponse<Video>, ServerError> {
    let form = MultipartForm::read(multipart, state.media.max_size()).await?;

    let (Some(title), Some(description), true, true) = (
        form.text("title"),
        form.text("description"),
        form.file("thumbnail").is_some(),
        form.file("videoFile").is_some(),
    ) else {
        return Err(StoreError::ValidationFailed(
            "All fields are required, including thumbnail and video files".into(),
        )
        .into());
    };

    let duration = match form.text("duration") {
        Some(raw) => raw
            .parse::<f64>()
            .map_err(|_| ServerError::Validation(format!("Invalid duration '{raw}'")))?,
        None => 0.0,
    };

    let (thumbnail, video_file) = match tokio::join!(
        upload_required(&state, &form, "thumbnail"),
        upload_required(&state, &form, "videoFile"),
    ) {
        (Ok(thumbnail), Ok(video_file)) => (thumbnail, video_file),
        (Err(e), stored) | (stored, Err(e)) => {
            discard_uploads(&state, stored.ok()).await;
            return Err(e);
        }
    };

    let new = NewVideo {
        title: title.to_string(),
        description: description.to_string(),
        video_file,
        thumbnail,
        duration,
        tags: form.text("tags").map(parse_tag_list).unwrap_or_default(),
    };

    let owner = user.id;
    let uploads = [new.thumbnail.clone(), new.video_file.clone()];
    let video = match state.store.run(move |db| db.publish_video(owner, &new)).await {
        Ok(video) => video,
        Err(e) => {
            discard_uploads(&state, uploads).await;
            return Err(e);
        }
    };

    Ok(ApiResponse::created(video, "Video published successfully"))
}

async fn delete_video(
    State(state): State<AppState>,
    Path(id): Path<VideoId>,
    AuthUser(actor): AuthUser,
) -> Result<ApiResponse<CascadeReport>, ServerError> {
    let actor_id = actor.id;
    let (report, media) = state
        .store
        .run(move |db| {
            let video = db.get_video(id)?;
            let report = db.delete_video(id, actor_id)?;
            Ok((report, [video.thumbnail, video.video_file]))
        })
        .await?;
    discard_uploads(&state, media).await;
    Ok(ApiResponse::ok(report, "Video deleted successfully"))
}

async fn like(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<LikeRequest>,
) -> Result<ApiResponse<Video>, ServerError> {
    let user_id = user.id;
    let video = state
        .store
        .run(move |db| db.like_video(user_id, req.video_id))
        .await?;
    Ok(ApiResponse::ok(video, "Video liked successfully"))
}

async fn remove_like(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(req): Json<LikeRequest>,
) -> Result<ApiResponse<Video>, ServerError> {
    let user_id = user.id;
    let video = state
        .store
        .run(move |db| db.unlike_video(user_id, req.video_id))
        .await?;
    Ok(ApiResponse::ok(video, "Video unliked successfully"))
}

async fn update_video(
    State(state): State<AppState>,
    Path(id): Path<VideoId>,
    AuthUser(actor): AuthUser,
    multipart: Multipart,
) -> Result<ApiResponse<Video>, ServerError> {
    let actor_id = actor.id;
    let current = state.store.run(move |db| db.get_video(id)).await?;
    if current.owner != actor_id {
        return Err(
            StoreError::Forbidden("You are not authorized to edit this video".into()).into(),
        );
    }

    let form = MultipartForm::read(multipart, state.media.max_size()).await?;
    let update = VideoUpdate {
        title: form.text("title").map(str::to_string),
        description: form.text("description").map(str::to_string),
        thumbnail: upload_or_keep(&state, &form, "thumbnail").await,
        video_file: upload_or_keep(&state, &form, "videoFile").await,
        tags: form.text("tags").map(parse_tag_list),
    };

    let uploads: Vec<String> = [update.thumbnail.clone(), update.video_file.clone()]
        .into_iter()
        .flatten()
        .collect();
    let video = match state.store.run(move |db| db.update_video(id, actor_id, &update)).await {
        Ok(video) => video,
        Err(e) => {
            discard_uploads(&state, uploads).await;
            return Err(e);
        }
    };
    let stale = [
        replaced(Some(current.thumbnail), Some(&video.thumbnail)),
        replaced(Some(current.video_file), Some(&video.video_file)),
    ];
    discard_uploads(&state, stale.into_iter().flatten()).await;
    info!(video_id = %id, "video updated");
    Ok(ApiResponse::ok(video, "Video updated successfully"))
}

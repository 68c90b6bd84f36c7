use axum::{
    extract::{Multipart, Path, State},
    routing::{delete, get, post, put},
    Json, Router,
};
use tracing::info;

use vidcast_shared::ChannelId;
use vidcast_store::{CascadeReport, Channel, ChannelDefaults, ChannelUpdate, NewChannel, StoreError};

use super::{discard_uploads, populate_channel, replaced, upload_or_keep, ChannelView};
use crate::api::{ApiResponse, AppState};
use crate::auth::AuthUser;
use crate::error::ServerError;
use crate::form::MultipartForm;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/create", post(create_channel))
        .route("/data/:id", get(channel_data))
        .route("/update/:id", put(update_channel))
        .route("/delete/:id", delete(delete_channel))
        .route("/subscribe/:id", post(subscribe))
        .route("/unsubscribe/:id", post(unsubscribe))
}

async fn create_channel(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(new): Json<NewChannel>,
) -> Result<ApiResponse<Channel>, ServerError> {
    let avatar = state.config.default_avatar_url.clone();
    let banner = state.config.default_banner_url.clone();
    let owner = user.id;

    let channel = state
        .store
        .run(move |db| {
            let defaults = ChannelDefaults {
                avatar: &avatar,
                banner: &banner,
            };
            db.create_channel(owner, &new, defaults)
        })
        .await?;

    info!(channel_id = %channel.id, owner = %owner, "channel created");
    Ok(ApiResponse::created(channel, "Channel created successfully"))
}

async fn channel_data(
    State(state): State<AppState>,
    Path(id): Path<ChannelId>,
    AuthUser(_): AuthUser,
) -> Result<ApiResponse<ChannelView>, ServerError> {
    let view = state
        .store
        .run(move |db| {
            let channel = db.get_channel(id)?;
            populate_channel(db, channel)
        })
        .await?;
    Ok(ApiResponse::ok(view, "Channel fetched successfully"))
}

async fn update_channel(
    State(state): State<AppState>,
    Path(id): Path<ChannelId>,
    AuthUser(actor): AuthUser,
    multipart: Multipart,
) -> Result<ApiResponse<Channel>, ServerError> {
    let actor_id = actor.id;
    let current = state.store.run(move |db| db.get_channel(id)).await?;
    if current.owner != actor_id {
        return Err(
            StoreError::Forbidden("You are not authorized to edit this channel".into()).into(),
        );
    }

    let form = MultipartForm::read(multipart, state.media.max_size()).await?;
    let update = ChannelUpdate {
        name: form.text("name").map(str::to_string),
        handle: form.text("handle").map(str::to_string),
        description: form.text("description").map(str::to_string),
        banner: upload_or_keep(&state, &form, "banner").await,
        avatar: upload_or_keep(&state, &form, "avatar").await,
    };

    let uploads: Vec<String> = [update.banner.clone(), update.avatar.clone()]
        .into_iter()
        .flatten()
        .collect();
    let channel = match state.store.run(move |db| db.update_channel(id, actor_id, &update)).await {
        Ok(channel) => channel,
        Err(e) => {
            discard_uploads(&state, uploads).await;
            return Err(e);
        }
    };
    let stale = [
        replaced(current.banner, channel.banner.as_ref()),
        replaced(current.avatar, channel.avatar.as_ref()),
    ];
    discard_uploads(&state, stale.into_iter().flatten()).await;
    Ok(ApiResponse::ok(channel, "Channel updated successfully"))
}

async fn delete_channel(
    State(state): State<AppState>,
    Path(id): Path<ChannelId>,
    AuthUser(actor): AuthUser,
) -> Result<ApiResponse<CascadeReport>, ServerError> {
    let actor_id = actor.id;
    let (report, media) = state
        .store
        .run(move |db| {
            let channel = db.get_channel(id)?;
            let mut media: Vec<String> =
                [channel.banner, channel.avatar].into_iter().flatten().collect();
            for video in db.list_videos_by_channel(id)? {
                media.extend([video.thumbnail, video.video_file]);
            }
            let report = db.delete_channel(id, actor_id)?;
            Ok((report, media))
        })
        .await?;
    discard_uploads(&state, media).await;
    Ok(ApiResponse::ok(
        report,
        "Channel and associated data deleted successfully",
    ))
}

async fn subscribe(
    State(state): State<AppState>,
    Path(id): Path<ChannelId>,
    AuthUser(user): AuthUser,
) -> Result<ApiResponse<Channel>, ServerError> {
    let user_id = user.id;
    let channel = state.store.run(move |db| db.subscribe(user_id, id)).await?;
    Ok(ApiResponse::ok(channel, "Subscribed successfully"))
}

async fn unsubscribe(
    State(state): State<AppState>,
    Path(id): Path<ChannelId>,
    AuthUser(user): AuthUser,
) -> Result<ApiResponse<Channel>, ServerError> {
    let user_id = user.id;
    let channel = state
        .store
        .run(move |db| db.unsubscribe(user_id, id))
        .await?;
    Ok(ApiResponse::ok(channel, "Unsubscribed successfully"))
}

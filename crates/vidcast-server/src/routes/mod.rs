//! `/api/v1` route tree and the response views shared between its parts.

mod account;
mod channels;
mod comments;
mod tags;
mod videos;

use axum::Router;
use serde::Serialize;
use tracing::warn;

use vidcast_store::{Channel, Database, StoreError, User, Video};

use crate::api::AppState;
use crate::error::ServerError;
use crate::form::MultipartForm;

pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/account", account::router())
        .nest("/channel", channels::router())
        .nest("/videos", videos::router())
        .nest("/comments", comments::router())
        .nest("/tags", tags::router())
}

/// A video with its owner and channel resolved.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoView {
    #[serde(flatten)]
    pub video: Video,
    pub owner_profile: Option<User>,
    pub channel: Option<Channel>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelView {
    #[serde(flatten)]
    pub channel: Channel,
    pub owner_profile: Option<User>,
}

/// `NotFound` becomes `None`; anything else is still an error.
fn found<T>(result: vidcast_store::Result<T>) -> vidcast_store::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(StoreError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

pub(crate) fn populate_video(db: &Database, video: Video) -> vidcast_store::Result<VideoView> {
    let owner_profile = found(db.get_user(video.owner))?;
    let channel = match video.channel_id {
        Some(id) => found(db.get_channel(id))?,
        None => None,
    };
    Ok(VideoView {
        video,
        owner_profile,
        channel,
    })
}

pub(crate) fn populate_videos(
    db: &Database,
    videos: Vec<Video>,
) -> vidcast_store::Result<Vec<VideoView>> {
    videos.into_iter().map(|v| populate_video(db, v)).collect()
}

pub(crate) fn populate_channel(db: &Database, channel: Channel) -> vidcast_store::Result<ChannelView> {
    let owner_profile = found(db.get_user(channel.owner))?;
    Ok(ChannelView {
        channel,
        owner_profile,
    })
}

/// Store an optional replacement file. A failed upload keeps whatever the
/// record already has.
pub(crate) async fn upload_or_keep(
    state: &AppState,
    form: &MultipartForm,
    field: &str,
) -> Option<String> {
    let upload = form.file(field)?;
    match state.media.ingest(&upload.content_type, &upload.data).await {
        Ok(url) => Some(url),
        Err(e) => {
            warn!(field, error = %e, "media upload failed, keeping existing");
            None
        }
    }
}

/// Remove stored files nothing references any more: uploads whose store
/// write failed, files replaced by an update, media of deleted records.
pub(crate) async fn discard_uploads<I>(state: &AppState, urls: I)
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    for url in urls {
        state.media.discard(url.as_ref()).await;
    }
}

/// The old URL, if an update swapped it for a different one.
pub(crate) fn replaced(old: Option<String>, now: Option<&String>) -> Option<String> {
    old.filter(|old| Some(old) != now)
}

/// Store a required file. Missing is reported by the caller.
pub(crate) async fn upload_required(
    state: &AppState,
    form: &MultipartForm,
    field: &str,
) -> Result<String, ServerError> {
    let upload = form
        .file(field)
        .ok_or_else(|| ServerError::Validation(format!("Missing '{field}' file")))?;
    state.media.ingest(&upload.content_type, &upload.data).await
}

//! Domain model structs persisted in the SQLite database.
//!
//! Every record derives `Serialize` and `Deserialize` with camelCase field
//! names so it can be handed straight to the web client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vidcast_shared::{ChannelId, CommentId, TagId, UserId, VideoId};

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// An account.
///
/// Invariant: `has_channel` iff `channel_id` is set and names a channel
/// whose `owner` is this user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Trimmed and lowercased.
    pub email: String,
    /// Argon2id hash. Never leaves the server.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub avatar: Option<String>,
    pub has_channel: bool,
    pub channel_id: Option<ChannelId>,
    /// Channels this user follows.
    pub subscriptions: Vec<ChannelId>,
    /// Videos this user liked.
    pub likes: Vec<VideoId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Signup input. The password is plaintext here and hashed by the store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
}

/// Full account update; every field except the avatar is required.
#[derive(Debug, Clone, Default)]
pub struct AccountUpdate {
    pub name: String,
    pub email: String,
    pub password: String,
    /// `None` keeps the current avatar.
    pub avatar: Option<String>,
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// A user's publishing channel. Each user owns at most one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,
    /// Unique across all channels.
    pub handle: String,
    pub banner: Option<String>,
    pub avatar: Option<String>,
    pub description: String,
    pub owner: UserId,
    pub subscribers: Vec<UserId>,
    /// Every id here names a video whose `channel_id` is this channel.
    pub videos: Vec<VideoId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NewChannel {
    pub name: String,
    pub handle: String,
    pub description: Option<String>,
}

/// Partial channel update; only `Some` fields change.
#[derive(Debug, Clone, Default)]
pub struct ChannelUpdate {
    pub name: Option<String>,
    pub handle: Option<String>,
    pub description: Option<String>,
    pub banner: Option<String>,
    pub avatar: Option<String>,
}

// ---------------------------------------------------------------------------
// Video
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: VideoId,
    pub video_file: String,
    pub thumbnail: String,
    pub title: String,
    pub description: String,
    /// Seconds.
    pub duration: f64,
    /// Never decreases.
    pub views: u64,
    /// Only the owner may change or delete the video.
    pub owner: UserId,
    pub channel_id: Option<ChannelId>,
    pub tags: Vec<String>,
    pub likes: Vec<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Publish input. Media fields hold URLs handed back by media ingest.
#[derive(Debug, Clone, Default)]
pub struct NewVideo {
    pub title: String,
    pub description: String,
    pub video_file: String,
    pub thumbnail: String,
    pub duration: f64,
    /// Raw tag names; normalized and deduplicated on publish.
    pub tags: Vec<String>,
}

/// Partial video update; only `Some` fields change.
#[derive(Debug, Clone, Default)]
pub struct VideoUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub video_file: Option<String>,
    pub thumbnail: Option<String>,
    pub tags: Option<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Comment
// ---------------------------------------------------------------------------

/// A comment on a video. `user_name` and `user_avatar` are copies taken when
/// the comment was written and are not kept in sync with the account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    pub user_name: String,
    pub user_id: UserId,
    pub user_avatar: Option<String>,
    pub video_id: VideoId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Tag
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tag {
    pub id: TagId,
    /// Unique, lowercased.
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

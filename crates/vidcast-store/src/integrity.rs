//! Referential-integrity cascades.
//!
//! Reference sets live inside rows as JSON id arrays and the schema has no
//! foreign keys, so anything that deletes an entity or links two entities
//! goes through here. Each operation is a single transaction: either every
//! follow-on mutation lands or none does. Re-running a delete after a
//! failure is safe because each step is a no-op on already-removed ids.

use serde::Serialize;
use uuid::Uuid;

use vidcast_shared::{ChannelId, UserId, VideoId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Channel, Video};
use crate::refs::RefSet;

/// What a delete cascade removed, for logging and API responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub channels_deleted: usize,
    pub videos_deleted: usize,
    pub comments_deleted: usize,
    /// Rows whose reference sets were rewritten to drop a deleted id.
    pub references_pruned: usize,
}

impl Database {
    // ------------------------------------------------------------------
    // Deletes
    // ------------------------------------------------------------------

    /// Delete an account and everything it owns. Only the user themself
    /// may do this.
    pub fn delete_user(&self, id: UserId, actor: UserId) -> Result<CascadeReport> {
        if id != actor {
            return Err(StoreError::Forbidden(
                "You can only delete your own account".into(),
            ));
        }

        let report = self.atomically("delete user", || {
            let user = self.get_user(id)?;
            let mut report = CascadeReport::default();

            let mut channels: Vec<ChannelId> = self
                .list_channels_by_owner(id)?
                .into_iter()
                .map(|c| c.id)
                .collect();
            if let Some(linked) = user.channel_id.filter(|_| user.has_channel) {
                if !channels.contains(&linked) {
                    channels.push(linked);
                }
            }
            for channel in channels {
                self.purge_channel(channel, &mut report)?;
            }

            let leftovers = self.video_ids_by_owner(id)?;
            self.purge_videos(&leftovers, &mut report)?;

            report.comments_deleted += self.remove_comments_by_user(id)?;
            let me = [*id.as_uuid()];
            report.references_pruned += self.ref_pull_everywhere(RefSet::ChannelSubscribers, &me)?;
            report.references_pruned += self.ref_pull_everywhere(RefSet::VideoLikes, &me)?;

            if !self.remove_user_row(id)? {
                return Err(StoreError::NotFound("User"));
            }
            Ok(report)
        })?;

        tracing::info!(
            user_id = %id,
            channels = report.channels_deleted,
            videos = report.videos_deleted,
            comments = report.comments_deleted,
            "account deleted"
        );
        Ok(report)
    }

    /// Delete a channel with its videos and their comments, and unlink the
    /// owner. Owner only.
    pub fn delete_channel(&self, id: ChannelId, actor: UserId) -> Result<CascadeReport> {
        let report = self.atomically("delete channel", || {
            let channel = self.get_channel(id)?;
            if channel.owner != actor {
                return Err(StoreError::Forbidden(
                    "You are not authorized to delete this channel".into(),
                ));
            }
            let mut report = CascadeReport::default();
            self.purge_channel(id, &mut report)?;
            Ok(report)
        })?;

        tracing::info!(
            channel_id = %id,
            videos = report.videos_deleted,
            comments = report.comments_deleted,
            "channel deleted"
        );
        Ok(report)
    }

    /// Delete one video, its comments, and every reference to it. Owner
    /// only.
    pub fn delete_video(&self, id: VideoId, actor: UserId) -> Result<CascadeReport> {
        let report = self.atomically("delete video", || {
            let video = self.get_video(id)?;
            if video.owner != actor {
                return Err(StoreError::Forbidden(
                    "You are not authorized to delete this video".into(),
                ));
            }
            let mut report = CascadeReport::default();
            self.purge_videos(&[*id.as_uuid()], &mut report)?;
            Ok(report)
        })?;

        tracing::info!(video_id = %id, comments = report.comments_deleted, "video deleted");
        Ok(report)
    }

    // ------------------------------------------------------------------
    // Dual-sided links
    // ------------------------------------------------------------------

    pub fn subscribe(&self, user: UserId, channel: ChannelId) -> Result<Channel> {
        self.atomically("subscribe", || {
            self.get_user(user)?;
            if !self.ref_insert(RefSet::ChannelSubscribers, channel.as_uuid(), user.as_uuid())? {
                return Err(StoreError::Conflict(
                    "Already subscribed to this channel".into(),
                ));
            }
            self.ref_insert(RefSet::UserSubscriptions, user.as_uuid(), channel.as_uuid())?;
            self.get_channel(channel)
        })
    }

    pub fn unsubscribe(&self, user: UserId, channel: ChannelId) -> Result<Channel> {
        self.atomically("unsubscribe", || {
            self.get_user(user)?;
            if !self.ref_remove(RefSet::ChannelSubscribers, channel.as_uuid(), user.as_uuid())? {
                return Err(StoreError::NotSubscribed);
            }
            self.ref_remove(RefSet::UserSubscriptions, user.as_uuid(), channel.as_uuid())?;
            self.get_channel(channel)
        })
    }

    pub fn like_video(&self, user: UserId, video: VideoId) -> Result<Video> {
        self.atomically("like video", || {
            self.get_user(user)?;
            if !self.ref_insert(RefSet::VideoLikes, video.as_uuid(), user.as_uuid())? {
                return Err(StoreError::Conflict("Video already liked".into()));
            }
            self.ref_insert(RefSet::UserLikes, user.as_uuid(), video.as_uuid())?;
            self.get_video(video)
        })
    }

    pub fn unlike_video(&self, user: UserId, video: VideoId) -> Result<Video> {
        self.atomically("unlike video", || {
            self.get_user(user)?;
            if !self.ref_remove(RefSet::VideoLikes, video.as_uuid(), user.as_uuid())? {
                return Err(StoreError::NotLiked);
            }
            self.ref_remove(RefSet::UserLikes, user.as_uuid(), video.as_uuid())?;
            self.get_video(video)
        })
    }

    // ------------------------------------------------------------------
    // Cascade steps. Callers hold the transaction.
    // ------------------------------------------------------------------

    fn purge_channel(&self, id: ChannelId, report: &mut CascadeReport) -> Result<()> {
        let channel = match self.get_channel(id) {
            Ok(channel) => channel,
            // A stale link on the user row; nothing left to cascade.
            Err(StoreError::NotFound(_)) => return Ok(()),
            Err(e) => return Err(e),
        };

        let mut videos: Vec<Uuid> = channel.videos.iter().map(|v| *v.as_uuid()).collect();
        for extra in self.video_ids_by_channel(id)? {
            if !videos.contains(&extra) {
                videos.push(extra);
            }
        }
        self.purge_videos(&videos, report)?;

        report.references_pruned +=
            self.ref_pull_everywhere(RefSet::UserSubscriptions, &[*id.as_uuid()])?;

        if self.remove_channel_row(id)? {
            report.channels_deleted += 1;
        }
        self.set_channel_link(channel.owner, None)?;
        Ok(())
    }

    fn purge_videos(&self, ids: &[Uuid], report: &mut CascadeReport) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        report.references_pruned += self.ref_pull_everywhere(RefSet::ChannelVideos, ids)?;
        report.references_pruned += self.ref_pull_everywhere(RefSet::UserLikes, ids)?;
        report.comments_deleted += self.remove_comments_for_videos(ids)?;
        report.videos_deleted += self.remove_video_rows(ids)?;
        Ok(())
    }
}

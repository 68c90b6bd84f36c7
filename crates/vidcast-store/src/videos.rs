//! CRUD operations for [`Video`] records.

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use vidcast_shared::{ChannelId, UserId, VideoId};

use crate::database::Database;
use crate::error::{not_found, Result, StoreError};
use crate::models::{NewVideo, Video, VideoUpdate};
use crate::refs::{id_array, RefSet};
use crate::row;
use crate::tags::normalize_tags;

const VIDEO_COLUMNS: &str = "id, video_file, thumbnail, title, description, duration, views,
     owner, channel_id, tags, likes, created_at, updated_at";

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Publish a video for `owner`.
    ///
    /// If the owner has a channel the video is filed under it. Tags are
    /// normalized and any unseen tag is created.
    pub fn publish_video(&self, owner: UserId, new: &NewVideo) -> Result<Video> {
        let required = [&new.title, &new.description, &new.video_file, &new.thumbnail];
        if required.iter().any(|f| f.trim().is_empty()) {
            return Err(StoreError::ValidationFailed(
                "All fields are required, including thumbnail and video files".into(),
            ));
        }
        if !new.duration.is_finite() || new.duration < 0.0 {
            return Err(StoreError::ValidationFailed(
                "Duration must be a non-negative number of seconds".into(),
            ));
        }

        let tags = normalize_tags(&new.tags);
        let video = self.atomically("publish video", || {
            let user = self.get_user(owner)?;
            let channel_id = match user.channel_id.filter(|_| user.has_channel) {
                Some(id) => Some(self.get_channel(id)?.id),
                None => None,
            };

            let now = Utc::now();
            let video = Video {
                id: VideoId::new(),
                video_file: new.video_file.trim().to_string(),
                thumbnail: new.thumbnail.trim().to_string(),
                title: new.title.trim().to_string(),
                description: new.description.trim().to_string(),
                duration: new.duration,
                views: 0,
                owner,
                channel_id,
                tags: tags.clone(),
                likes: Vec::new(),
                created_at: now,
                updated_at: now,
            };

            self.conn().execute(
                "INSERT INTO videos (id, video_file, thumbnail, title, description, duration,
                                     views, owner, channel_id, tags, likes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?8, ?9, '[]', ?10, ?10)",
                params![
                    video.id.to_string(),
                    video.video_file,
                    video.thumbnail,
                    video.title,
                    video.description,
                    video.duration,
                    owner.to_string(),
                    channel_id.map(|c| c.to_string()),
                    serde_json::to_string(&video.tags)?,
                    now.to_rfc3339(),
                ],
            )?;

            self.ensure_tags(&tags)?;
            if let Some(channel_id) = channel_id {
                self.ref_insert(RefSet::ChannelVideos, channel_id.as_uuid(), video.id.as_uuid())?;
            }
            Ok(video)
        })?;

        tracing::info!(video_id = %video.id, owner = %owner, "video published");
        Ok(video)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_video(&self, id: VideoId) -> Result<Video> {
        self.conn()
            .query_row(
                &format!("SELECT {VIDEO_COLUMNS} FROM videos WHERE id = ?1"),
                params![id.to_string()],
                row_to_video,
            )
            .map_err(not_found("Video"))
    }

    /// Every video, oldest first.
    pub fn list_videos(&self) -> Result<Vec<Video>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos ORDER BY rowid ASC"
        ))?;
        let rows = stmt.query_map([], row_to_video)?;
        row::collect(rows)
    }

    pub fn list_videos_by_owner(&self, owner: UserId) -> Result<Vec<Video>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE owner = ?1 ORDER BY rowid ASC"
        ))?;
        let rows = stmt.query_map(params![owner.to_string()], row_to_video)?;
        row::collect(rows)
    }

    pub fn list_videos_by_channel(&self, channel: ChannelId) -> Result<Vec<Video>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {VIDEO_COLUMNS} FROM videos WHERE channel_id = ?1 ORDER BY rowid ASC"
        ))?;
        let rows = stmt.query_map(params![channel.to_string()], row_to_video)?;
        row::collect(rows)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Apply the provided fields. Only the owner may edit a video.
    pub fn update_video(&self, id: VideoId, actor: UserId, update: &VideoUpdate) -> Result<Video> {
        let mut video = self.get_video(id)?;
        if video.owner != actor {
            return Err(StoreError::Forbidden(
                "You are not authorized to edit this video".into(),
            ));
        }

        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        if let Some(title) = non_empty(&update.title) {
            video.title = title;
        }
        if let Some(description) = non_empty(&update.description) {
            video.description = description;
        }
        if let Some(thumbnail) = non_empty(&update.thumbnail) {
            video.thumbnail = thumbnail;
        }
        if let Some(video_file) = non_empty(&update.video_file) {
            video.video_file = video_file;
        }
        if let Some(tags) = &update.tags {
            video.tags = normalize_tags(tags);
        }

        self.atomically("update video", || {
            self.conn().execute(
                "UPDATE videos
                 SET title = ?1, description = ?2, thumbnail = ?3, video_file = ?4, tags = ?5,
                     updated_at = ?6
                 WHERE id = ?7",
                params![
                    video.title,
                    video.description,
                    video.thumbnail,
                    video.video_file,
                    serde_json::to_string(&video.tags)?,
                    row::now(),
                    id.to_string(),
                ],
            )?;
            self.ensure_tags(&video.tags)?;
            Ok(())
        })?;

        self.get_video(id)
    }

    /// Count one view and return the updated video.
    pub fn increment_views(&self, id: VideoId) -> Result<Video> {
        let affected = self.conn().execute(
            "UPDATE videos SET views = views + 1 WHERE id = ?1",
            params![id.to_string()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound("Video"));
        }
        self.get_video(id)
    }

    // ------------------------------------------------------------------
    // Cascade support
    // ------------------------------------------------------------------

    pub(crate) fn video_ids_by_owner(&self, owner: UserId) -> Result<Vec<Uuid>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id FROM videos WHERE owner = ?1 ORDER BY rowid ASC")?;
        let rows = stmt.query_map(params![owner.to_string()], |r| row::id(r, 0))?;
        row::collect(rows)
    }

    pub(crate) fn video_ids_by_channel(&self, channel: ChannelId) -> Result<Vec<Uuid>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id FROM videos WHERE channel_id = ?1 ORDER BY rowid ASC")?;
        let rows = stmt.query_map(params![channel.to_string()], |r| row::id(r, 0))?;
        row::collect(rows)
    }

    /// Delete-many by id set. Returns the number of rows removed.
    pub(crate) fn remove_video_rows(&self, ids: &[Uuid]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let affected = self.conn().execute(
            "DELETE FROM videos WHERE id IN (SELECT value FROM json_each(?1))",
            params![id_array(ids)?],
        )?;
        Ok(affected)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Video`].
fn row_to_video(r: &rusqlite::Row<'_>) -> rusqlite::Result<Video> {
    let views: i64 = r.get(6)?;
    Ok(Video {
        id: row::id(r, 0)?,
        video_file: r.get(1)?,
        thumbnail: r.get(2)?,
        title: r.get(3)?,
        description: r.get(4)?,
        duration: r.get(5)?,
        views: views.max(0) as u64,
        owner: row::id(r, 7)?,
        channel_id: row::opt_id(r, 8)?,
        tags: row::json(r, 9)?,
        likes: row::json(r, 10)?,
        created_at: row::timestamp(r, 11)?,
        updated_at: row::timestamp(r, 12)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::channels::tests::{channel, user};
    use crate::models::User;

    pub(crate) fn publish(db: &Database, owner: &User, title: &str, tags: &[&str]) -> Video {
        db.publish_video(
            owner.id,
            &NewVideo {
                title: title.into(),
                description: format!("{title} description"),
                video_file: format!("https://cdn/{title}.mp4"),
                thumbnail: format!("https://cdn/{title}.png"),
                duration: 42.0,
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
        )
        .unwrap()
    }

    #[test]
    fn publish_files_video_under_channel() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let ch = channel(&db, &alice, "@alice");

        let video = publish(&db, &alice, "first", &[" Music ", "music", "LIVE"]);

        assert_eq!(video.channel_id, Some(ch.id));
        assert_eq!(video.tags, vec!["music".to_string(), "live".to_string()]);
        assert_eq!(db.get_channel(ch.id).unwrap().videos, vec![video.id]);
        assert!(db.get_tag_by_name("music").is_ok());
        assert!(db.get_tag_by_name("live").is_ok());
    }

    #[test]
    fn publish_without_channel_is_allowed() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let video = publish(&db, &alice, "solo", &[]);
        assert_eq!(video.channel_id, None);
        assert_eq!(db.list_videos_by_owner(alice.id).unwrap(), vec![video]);
    }

    #[test]
    fn publish_requires_media() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let missing = NewVideo {
            title: "t".into(),
            description: "d".into(),
            video_file: "https://cdn/v.mp4".into(),
            ..Default::default()
        };
        assert!(matches!(
            db.publish_video(alice.id, &missing),
            Err(StoreError::ValidationFailed(_))
        ));
        assert!(db.list_videos().unwrap().is_empty());
    }

    #[test]
    fn views_only_go_up() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let video = publish(&db, &alice, "v", &[]);

        db.increment_views(video.id).unwrap();
        let after = db.increment_views(video.id).unwrap();
        assert_eq!(after.views, 2);
        assert!(matches!(
            db.increment_views(VideoId::new()),
            Err(StoreError::NotFound("Video"))
        ));
    }

    #[test]
    fn update_is_owner_only() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let video = publish(&db, &alice, "v", &["old"]);

        let update = VideoUpdate {
            title: Some("renamed".into()),
            tags: Some(vec!["New".into()]),
            ..Default::default()
        };
        assert!(matches!(
            db.update_video(video.id, bob.id, &update),
            Err(StoreError::Forbidden(_))
        ));

        let updated = db.update_video(video.id, alice.id, &update).unwrap();
        assert_eq!(updated.title, "renamed");
        assert_eq!(updated.description, video.description);
        assert_eq!(updated.tags, vec!["new".to_string()]);
        assert!(db.get_tag_by_name("new").is_ok());
    }

    #[test]
    fn listing_by_channel_and_in_order() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let ch = channel(&db, &alice, "@alice");
        let a = publish(&db, &alice, "a", &[]);
        let b = publish(&db, &alice, "b", &[]);

        let ids: Vec<_> = db
            .list_videos_by_channel(ch.id)
            .unwrap()
            .into_iter()
            .map(|v| v.id)
            .collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }
}

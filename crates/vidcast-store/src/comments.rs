//! Comments left on videos.
//!
//! A comment snapshots the author's name and avatar at write time so a
//! video's thread can be rendered without joining users.

use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use vidcast_shared::{CommentId, UserId, VideoId};

use crate::database::Database;
use crate::error::{not_found, Result, StoreError};
use crate::models::{Comment, User};
use crate::refs::id_array;
use crate::row;

const COMMENT_COLUMNS: &str =
    "id, text, user_name, user_id, user_avatar, video_id, created_at, updated_at";

fn require_text(text: &str) -> Result<String> {
    let text = text.trim();
    if text.is_empty() {
        return Err(StoreError::ValidationFailed("Comment text is required".into()));
    }
    Ok(text.to_string())
}

impl Database {
    pub fn add_comment(&self, video_id: VideoId, author: &User, text: &str) -> Result<Comment> {
        let text = require_text(text)?;
        // The video must exist; comments are never left orphaned.
        self.get_video(video_id)?;

        let now = Utc::now();
        let comment = Comment {
            id: CommentId::new(),
            text,
            user_name: author.name.clone(),
            user_id: author.id,
            user_avatar: author.avatar.clone(),
            video_id,
            created_at: now,
            updated_at: now,
        };
        self.conn().execute(
            "INSERT INTO comments (id, text, user_name, user_id, user_avatar, video_id,
                                   created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                comment.id.to_string(),
                comment.text,
                comment.user_name,
                comment.user_id.to_string(),
                comment.user_avatar,
                video_id.to_string(),
                now.to_rfc3339(),
            ],
        )?;
        Ok(comment)
    }

    pub fn get_comment(&self, id: CommentId) -> Result<Comment> {
        self.conn()
            .query_row(
                &format!("SELECT {COMMENT_COLUMNS} FROM comments WHERE id = ?1"),
                params![id.to_string()],
                row_to_comment,
            )
            .map_err(not_found("Comment"))
    }

    /// A video's thread, oldest first. Fails if the video does not exist.
    pub fn list_comments_for_video(&self, video_id: VideoId) -> Result<Vec<Comment>> {
        self.get_video(video_id)?;
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE video_id = ?1 ORDER BY rowid ASC"
        ))?;
        let rows = stmt.query_map(params![video_id.to_string()], row_to_comment)?;
        row::collect(rows)
    }

    pub fn list_comments_by_user(&self, user_id: UserId) -> Result<Vec<Comment>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE user_id = ?1 ORDER BY rowid ASC"
        ))?;
        let rows = stmt.query_map(params![user_id.to_string()], row_to_comment)?;
        row::collect(rows)
    }

    /// Rewrite a comment's text. Only its author may do so.
    pub fn update_comment(&self, id: CommentId, actor: UserId, text: &str) -> Result<Comment> {
        let text = require_text(text)?;
        let comment = self.get_comment(id)?;
        if comment.user_id != actor {
            return Err(StoreError::Forbidden(
                "You can only edit your own comments".into(),
            ));
        }
        self.conn().execute(
            "UPDATE comments SET text = ?1, updated_at = ?2 WHERE id = ?3",
            params![text, row::now(), id.to_string()],
        )?;
        self.get_comment(id)
    }

    pub fn delete_comment(&self, id: CommentId, actor: UserId) -> Result<()> {
        let comment = self.get_comment(id)?;
        if comment.user_id != actor {
            return Err(StoreError::Forbidden(
                "You can only delete your own comments".into(),
            ));
        }
        self.conn()
            .execute("DELETE FROM comments WHERE id = ?1", params![id.to_string()])?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cascade support
    // ------------------------------------------------------------------

    pub(crate) fn remove_comments_for_videos(&self, video_ids: &[Uuid]) -> Result<usize> {
        if video_ids.is_empty() {
            return Ok(0);
        }
        let affected = self.conn().execute(
            "DELETE FROM comments WHERE video_id IN (SELECT value FROM json_each(?1))",
            params![id_array(video_ids)?],
        )?;
        Ok(affected)
    }

    pub(crate) fn remove_comments_by_user(&self, user_id: UserId) -> Result<usize> {
        let affected = self.conn().execute(
            "DELETE FROM comments WHERE user_id = ?1",
            params![user_id.to_string()],
        )?;
        Ok(affected)
    }
}

fn row_to_comment(r: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row::id(r, 0)?,
        text: r.get(1)?,
        user_name: r.get(2)?,
        user_id: row::id(r, 3)?,
        user_avatar: r.get(4)?,
        video_id: row::id(r, 5)?,
        created_at: row::timestamp(r, 6)?,
        updated_at: row::timestamp(r, 7)?,
    })
}

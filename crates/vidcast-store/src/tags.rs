//! Tag vocabulary.
//!
//! Tags are free-form labels attached to videos by name. The `tags` table
//! is the catalogue of names seen so far; videos reference names directly,
//! so deleting a tag here never rewrites a video.

use std::collections::HashSet;

use chrono::Utc;
use rusqlite::params;

use vidcast_shared::TagId;

use crate::database::Database;
use crate::error::{conflict_on_unique, not_found, Result, StoreError};
use crate::models::Tag;
use crate::row;

/// Canonical form of a tag name: trimmed, lowercase.
pub fn normalize_tag(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Normalize a list of names, dropping blanks and duplicates. First
/// occurrence wins the position.
pub(crate) fn normalize_tags<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .iter()
        .map(|n| normalize_tag(n.as_ref()))
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(n.clone()))
        .collect()
}

/// Split a comma-separated form field (`"music, Live ,music"`) into
/// normalized tag names.
pub fn parse_tag_list(raw: &str) -> Vec<String> {
    normalize_tags(&raw.split(',').collect::<Vec<_>>())
}

impl Database {
    pub fn create_tag(&self, name: &str) -> Result<Tag> {
        let name = normalize_tag(name);
        if name.is_empty() {
            return Err(StoreError::ValidationFailed("Tag name is required".into()));
        }

        let now = Utc::now();
        let tag = Tag {
            id: TagId::new(),
            name,
            created_at: now,
            updated_at: now,
        };
        self.conn()
            .execute(
                "INSERT INTO tags (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
                params![tag.id.to_string(), tag.name, now.to_rfc3339()],
            )
            .map_err(conflict_on_unique("Tag"))?;
        Ok(tag)
    }

    /// Every known tag, in creation order.
    pub fn list_tags(&self) -> Result<Vec<Tag>> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, name, created_at, updated_at FROM tags ORDER BY rowid ASC")?;
        let rows = stmt.query_map([], row_to_tag)?;
        row::collect(rows)
    }

    pub fn get_tag_by_name(&self, name: &str) -> Result<Tag> {
        self.conn()
            .query_row(
                "SELECT id, name, created_at, updated_at FROM tags WHERE name = ?1",
                params![normalize_tag(name)],
                row_to_tag,
            )
            .map_err(not_found("Tag"))
    }

    pub fn delete_tag(&self, id: TagId) -> Result<()> {
        let affected = self
            .conn()
            .execute("DELETE FROM tags WHERE id = ?1", params![id.to_string()])?;
        if affected == 0 {
            return Err(StoreError::NotFound("Tag"));
        }
        Ok(())
    }

    /// Create any of `names` not yet in the catalogue. Names must already
    /// be normalized.
    pub(crate) fn ensure_tags(&self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let now = row::now();
        let mut stmt = self.conn().prepare(
            "INSERT OR IGNORE INTO tags (id, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        )?;
        for name in names {
            stmt.execute(params![TagId::new().to_string(), name, now])?;
        }
        Ok(())
    }
}

fn row_to_tag(r: &rusqlite::Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row::id(r, 0)?,
        name: r.get(1)?,
        created_at: row::timestamp(r, 2)?,
        updated_at: row::timestamp(r, 3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_splits_trims_and_dedupes() {
        assert_eq!(
            parse_tag_list(" Music, live ,,music,LIVE , chill"),
            vec!["music", "live", "chill"]
        );
        assert!(parse_tag_list("  , ").is_empty());
    }

    #[test]
    fn create_and_list() {
        let db = Database::open_in_memory().unwrap();
        db.create_tag("Zebra").unwrap();
        db.create_tag("apple").unwrap();

        let names: Vec<_> = db.list_tags().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["zebra", "apple"]);
    }

    #[test]
    fn duplicate_and_blank_names_are_rejected() {
        let db = Database::open_in_memory().unwrap();
        db.create_tag("rust").unwrap();
        assert!(matches!(db.create_tag(" RUST "), Err(StoreError::Conflict(_))));
        assert!(matches!(db.create_tag("   "), Err(StoreError::ValidationFailed(_))));
    }

    #[test]
    fn ensure_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let existing = db.create_tag("music").unwrap();
        db.ensure_tags(&["music".into(), "live".into()]).unwrap();
        db.ensure_tags(&["live".into()]).unwrap();

        assert_eq!(db.list_tags().unwrap().len(), 2);
        assert_eq!(db.get_tag_by_name("music").unwrap().id, existing.id);
    }

    #[test]
    fn delete_unknown_tag_is_not_found() {
        let db = Database::open_in_memory().unwrap();
        let tag = db.create_tag("gone").unwrap();
        db.delete_tag(tag.id).unwrap();
        assert!(matches!(db.delete_tag(tag.id), Err(StoreError::NotFound("Tag"))));
    }
}

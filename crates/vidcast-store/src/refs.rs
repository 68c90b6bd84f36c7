//! Reference-set primitives.
//!
//! A reference set is a JSON array of ids stored in one column of an owning
//! row (e.g. `users.likes`). These helpers give the set semantics the
//! cascades rely on: insert-if-absent, remove-if-present, and a bulk pull
//! of ids from the set of every row in a collection.

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::row;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RefSet {
    /// `users.subscriptions` -> channel ids
    UserSubscriptions,
    /// `users.likes` -> video ids
    UserLikes,
    /// `channels.subscribers` -> user ids
    ChannelSubscribers,
    /// `channels.videos` -> video ids
    ChannelVideos,
    /// `videos.likes` -> user ids
    VideoLikes,
}

impl RefSet {
    fn table(self) -> &'static str {
        match self {
            RefSet::UserSubscriptions | RefSet::UserLikes => "users",
            RefSet::ChannelSubscribers | RefSet::ChannelVideos => "channels",
            RefSet::VideoLikes => "videos",
        }
    }

    fn column(self) -> &'static str {
        match self {
            RefSet::UserSubscriptions => "subscriptions",
            RefSet::UserLikes | RefSet::VideoLikes => "likes",
            RefSet::ChannelSubscribers => "subscribers",
            RefSet::ChannelVideos => "videos",
        }
    }

    fn owner_entity(self) -> &'static str {
        match self.table() {
            "users" => "User",
            "channels" => "Channel",
            _ => "Video",
        }
    }
}

/// Encode ids as the JSON array form used by reference columns and by
/// `json_each(?)` membership filters.
pub(crate) fn id_array(ids: &[Uuid]) -> Result<String> {
    Ok(serde_json::to_string(ids)?)
}

impl Database {
    pub(crate) fn ref_members(&self, set: RefSet, owner: &Uuid) -> Result<Vec<Uuid>> {
        let sql = format!("SELECT {} FROM {} WHERE id = ?1", set.column(), set.table());
        self.conn()
            .query_row(&sql, params![owner.to_string()], |r| row::json(r, 0))
            .optional()?
            .ok_or(StoreError::NotFound(set.owner_entity()))
    }

    fn ref_store(&self, set: RefSet, owner: &Uuid, members: &[Uuid]) -> Result<()> {
        let sql = format!(
            "UPDATE {} SET {} = ?1, updated_at = ?2 WHERE id = ?3",
            set.table(),
            set.column()
        );
        self.conn().execute(
            &sql,
            params![id_array(members)?, row::now(), owner.to_string()],
        )?;
        Ok(())
    }

    /// Add `member` to the set. Returns `false` if it was already present.
    pub(crate) fn ref_insert(&self, set: RefSet, owner: &Uuid, member: &Uuid) -> Result<bool> {
        let mut members = self.ref_members(set, owner)?;
        if members.contains(member) {
            return Ok(false);
        }
        members.push(*member);
        self.ref_store(set, owner, &members)?;
        Ok(true)
    }

    /// Remove `member` from the set. Returns `false` if it was not present.
    pub(crate) fn ref_remove(&self, set: RefSet, owner: &Uuid, member: &Uuid) -> Result<bool> {
        let mut members = self.ref_members(set, owner)?;
        let before = members.len();
        members.retain(|m| m != member);
        if members.len() == before {
            return Ok(false);
        }
        self.ref_store(set, owner, &members)?;
        Ok(true)
    }

    /// Remove every id in `ids` from `set` on every row of the collection.
    /// Returns the number of rows that changed.
    pub(crate) fn ref_pull_everywhere(&self, set: RefSet, ids: &[Uuid]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let sql = format!(
            "SELECT id, {col} FROM {table}
             WHERE EXISTS (
                 SELECT 1 FROM json_each({table}.{col}) AS m
                 WHERE m.value IN (SELECT value FROM json_each(?1))
             )",
            col = set.column(),
            table = set.table(),
        );

        let affected: Vec<(Uuid, Vec<Uuid>)> = {
            let mut stmt = self.conn().prepare(&sql)?;
            let rows = stmt.query_map(params![id_array(ids)?], |r| {
                Ok((row::id(r, 0)?, row::json(r, 1)?))
            })?;
            row::collect(rows)?
        };

        for (owner, mut members) in affected.iter().cloned() {
            members.retain(|m| !ids.contains(m));
            self.ref_store(set, &owner, &members)?;
        }

        if !affected.is_empty() {
            tracing::debug!(
                table = set.table(),
                column = set.column(),
                rows = affected.len(),
                "pulled dangling references"
            );
        }
        Ok(affected.len())
    }
}

//! CRUD operations for [`Channel`] records.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use vidcast_shared::{ChannelId, UserId};

use crate::database::Database;
use crate::error::{conflict_on_unique, not_found, Result, StoreError};
use crate::models::{Channel, ChannelUpdate, NewChannel};
use crate::row;

const CHANNEL_COLUMNS: &str =
    "id, name, handle, banner, avatar, description, owner, subscribers, videos, created_at, updated_at";

/// Default media applied to a freshly created channel.
#[derive(Debug, Clone, Copy)]
pub struct ChannelDefaults<'a> {
    pub avatar: &'a str,
    pub banner: &'a str,
}

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Create `owner`'s channel and link it to the account in one step.
    pub fn create_channel(
        &self,
        owner: UserId,
        new: &NewChannel,
        defaults: ChannelDefaults<'_>,
    ) -> Result<Channel> {
        let name = new.name.trim();
        let handle = new.handle.trim();
        if name.is_empty() || handle.is_empty() {
            return Err(StoreError::ValidationFailed(
                "Channel name and handle are required".into(),
            ));
        }

        let channel = self.atomically("create channel", || {
            let user = self.get_user(owner)?;
            if user.has_channel {
                return Err(StoreError::Conflict("User already has a channel".into()));
            }
            if self.handle_taken(handle, None)? {
                return Err(StoreError::Conflict(format!("Handle '{handle}' is taken")));
            }

            let now = Utc::now();
            let channel = Channel {
                id: ChannelId::new(),
                name: name.to_string(),
                handle: handle.to_string(),
                banner: Some(defaults.banner.to_string()),
                avatar: Some(defaults.avatar.to_string()),
                description: new.description.as_deref().unwrap_or("").trim().to_string(),
                owner,
                subscribers: Vec::new(),
                videos: Vec::new(),
                created_at: now,
                updated_at: now,
            };

            self.conn()
                .execute(
                    "INSERT INTO channels (id, name, handle, banner, avatar, description, owner,
                                           subscribers, videos, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '[]', '[]', ?8, ?8)",
                    params![
                        channel.id.to_string(),
                        channel.name,
                        channel.handle,
                        channel.banner,
                        channel.avatar,
                        channel.description,
                        owner.to_string(),
                        now.to_rfc3339(),
                    ],
                )
                .map_err(conflict_on_unique("Channel handle"))?;

            self.set_channel_link(owner, Some(channel.id))?;
            Ok(channel)
        })?;

        tracing::info!(channel_id = %channel.id, owner = %owner, "channel created");
        Ok(channel)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_channel(&self, id: ChannelId) -> Result<Channel> {
        self.conn()
            .query_row(
                &format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE id = ?1"),
                params![id.to_string()],
                row_to_channel,
            )
            .map_err(not_found("Channel"))
    }

    pub fn get_channel_by_handle(&self, handle: &str) -> Result<Channel> {
        self.conn()
            .query_row(
                &format!("SELECT {CHANNEL_COLUMNS} FROM channels WHERE handle = ?1"),
                params![handle.trim()],
                row_to_channel,
            )
            .map_err(not_found("Channel"))
    }

    /// Channels owned by `owner`. At most one unless the data predates the
    /// one-channel rule.
    pub fn list_channels_by_owner(&self, owner: UserId) -> Result<Vec<Channel>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {CHANNEL_COLUMNS} FROM channels WHERE owner = ?1 ORDER BY rowid ASC"
        ))?;
        let rows = stmt.query_map(params![owner.to_string()], row_to_channel)?;
        row::collect(rows)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Apply the provided fields. Only the owner may edit a channel.
    pub fn update_channel(
        &self,
        id: ChannelId,
        actor: UserId,
        update: &ChannelUpdate,
    ) -> Result<Channel> {
        let mut channel = self.get_channel(id)?;
        if channel.owner != actor {
            return Err(StoreError::Forbidden(
                "You are not authorized to edit this channel".into(),
            ));
        }

        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        if let Some(handle) = non_empty(&update.handle) {
            if handle != channel.handle && self.handle_taken(&handle, Some(id))? {
                return Err(StoreError::Conflict(format!("Handle '{handle}' is taken")));
            }
            channel.handle = handle;
        }
        if let Some(name) = non_empty(&update.name) {
            channel.name = name;
        }
        if let Some(description) = non_empty(&update.description) {
            channel.description = description;
        }
        if let Some(banner) = non_empty(&update.banner) {
            channel.banner = Some(banner);
        }
        if let Some(avatar) = non_empty(&update.avatar) {
            channel.avatar = Some(avatar);
        }

        self.conn()
            .execute(
                "UPDATE channels
                 SET name = ?1, handle = ?2, description = ?3, banner = ?4, avatar = ?5,
                     updated_at = ?6
                 WHERE id = ?7",
                params![
                    channel.name,
                    channel.handle,
                    channel.description,
                    channel.banner,
                    channel.avatar,
                    row::now(),
                    id.to_string(),
                ],
            )
            .map_err(conflict_on_unique("Channel handle"))?;

        self.get_channel(id)
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Remove the bare row. Callers go through [`Database::delete_channel`].
    pub(crate) fn remove_channel_row(&self, id: ChannelId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM channels WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }

    fn handle_taken(&self, handle: &str, except: Option<ChannelId>) -> Result<bool> {
        let except = except.map(|id| id.to_string()).unwrap_or_default();
        let hit: Option<String> = self
            .conn()
            .query_row(
                "SELECT id FROM channels WHERE handle = ?1 AND id != ?2",
                params![handle, except],
                |r| r.get(0),
            )
            .optional()?;
        Ok(hit.is_some())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Channel`].
fn row_to_channel(r: &rusqlite::Row<'_>) -> rusqlite::Result<Channel> {
    Ok(Channel {
        id: row::id(r, 0)?,
        name: r.get(1)?,
        handle: r.get(2)?,
        banner: r.get(3)?,
        avatar: r.get(4)?,
        description: r.get(5)?,
        owner: row::id(r, 6)?,
        subscribers: row::json(r, 7)?,
        videos: row::json(r, 8)?,
        created_at: row::timestamp(r, 9)?,
        updated_at: row::timestamp(r, 10)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{NewUser, User};

    pub(crate) const DEFAULTS: ChannelDefaults<'static> = ChannelDefaults {
        avatar: "https://cdn/avatar.jpg",
        banner: "https://cdn/banner.avif",
    };

    pub(crate) fn user(db: &Database, name: &str) -> User {
        db.register_user(
            &NewUser {
                name: name.into(),
                email: format!("{name}@example.com"),
                password: "pw".into(),
            },
            None,
        )
        .unwrap()
    }

    pub(crate) fn channel(db: &Database, owner: &User, handle: &str) -> Channel {
        db.create_channel(
            owner.id,
            &NewChannel {
                name: format!("{handle} channel"),
                handle: handle.into(),
                description: None,
            },
            DEFAULTS,
        )
        .unwrap()
    }

    #[test]
    fn create_links_owner() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let ch = channel(&db, &alice, "@alice");

        let alice = db.get_user(alice.id).unwrap();
        assert!(alice.has_channel);
        assert_eq!(alice.channel_id, Some(ch.id));
        assert_eq!(ch.avatar.as_deref(), Some(DEFAULTS.avatar));
        assert_eq!(db.get_channel_by_handle("@alice").unwrap().id, ch.id);
    }

    #[test]
    fn one_channel_per_user() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        channel(&db, &alice, "@alice");

        let second = NewChannel {
            name: "again".into(),
            handle: "@alice2".into(),
            description: None,
        };
        assert!(matches!(
            db.create_channel(alice.id, &second, DEFAULTS),
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(db.list_channels_by_owner(alice.id).unwrap().len(), 1);
    }

    #[test]
    fn duplicate_handle_conflicts_and_leaves_user_unlinked() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        channel(&db, &alice, "@shared");

        let clash = NewChannel {
            name: "bob".into(),
            handle: "@shared".into(),
            description: None,
        };
        assert!(matches!(
            db.create_channel(bob.id, &clash, DEFAULTS),
            Err(StoreError::Conflict(_))
        ));
        assert!(!db.get_user(bob.id).unwrap().has_channel);
    }

    #[test]
    fn update_is_owner_only_and_partial() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        let ch = channel(&db, &alice, "@alice");

        let update = ChannelUpdate {
            description: Some("music and more".into()),
            ..Default::default()
        };
        assert!(matches!(
            db.update_channel(ch.id, bob.id, &update),
            Err(StoreError::Forbidden(_))
        ));

        let updated = db.update_channel(ch.id, alice.id, &update).unwrap();
        assert_eq!(updated.description, "music and more");
        assert_eq!(updated.name, ch.name);
        assert_eq!(updated.handle, ch.handle);
    }

    #[test]
    fn update_rejects_taken_handle() {
        let db = Database::open_in_memory().unwrap();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");
        channel(&db, &alice, "@alice");
        let bobs = channel(&db, &bob, "@bob");

        let update = ChannelUpdate {
            handle: Some("@alice".into()),
            ..Default::default()
        };
        assert!(matches!(
            db.update_channel(bobs.id, bob.id, &update),
            Err(StoreError::Conflict(_))
        ));
    }
}

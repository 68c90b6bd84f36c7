//! CRUD operations for [`User`] records.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use vidcast_shared::password::{hash_password, verify_password};
use vidcast_shared::{ChannelId, UserId};

use crate::database::Database;
use crate::error::{conflict_on_unique, not_found, Result, StoreError};
use crate::models::{AccountUpdate, NewUser, User};
use crate::row;

const USER_COLUMNS: &str = "id, name, email, password_hash, avatar, has_channel, channel_id,
     subscriptions, likes, created_at, updated_at";

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn require_account_fields(name: &str, email: &str, password: &str) -> Result<()> {
    if name.trim().is_empty() || email.trim().is_empty() || password.is_empty() {
        return Err(StoreError::ValidationFailed("All fields are required".into()));
    }
    Ok(())
}

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Register a new account with the given default avatar.
    ///
    /// Name and email must both be unused.
    pub fn register_user(&self, new: &NewUser, avatar: Option<&str>) -> Result<User> {
        require_account_fields(&new.name, &new.email, &new.password)?;

        let name = new.name.trim().to_string();
        let email = normalize_email(&new.email);
        if self.name_or_email_taken(&name, &email, None)? {
            return Err(StoreError::Conflict(
                "User with email or username already exists".into(),
            ));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            name,
            email,
            password_hash: hash_password(&new.password)?,
            avatar: avatar.map(str::to_string),
            has_channel: false,
            channel_id: None,
            subscriptions: Vec::new(),
            likes: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        self.conn()
            .execute(
                "INSERT INTO users (id, name, email, password_hash, avatar, has_channel,
                                    channel_id, subscriptions, likes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, NULL, '[]', '[]', ?6, ?6)",
                params![
                    user.id.to_string(),
                    user.name,
                    user.email,
                    user.password_hash,
                    user.avatar,
                    now.to_rfc3339(),
                ],
            )
            .map_err(conflict_on_unique("User"))?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    pub fn get_user(&self, id: UserId) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
                params![id.to_string()],
                row_to_user,
            )
            .map_err(not_found("User"))
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
                params![normalize_email(email)],
                row_to_user,
            )
            .map_err(not_found("User"))
    }

    pub fn get_user_by_name(&self, name: &str) -> Result<User> {
        self.conn()
            .query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE name = ?1"),
                params![name.trim()],
                row_to_user,
            )
            .map_err(not_found("User"))
    }

    /// Check an email / password pair and return the account.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<User> {
        let user = match self.get_user_by_email(email) {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => return Err(StoreError::InvalidCredentials),
            Err(e) => return Err(e),
        };

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!(user_id = %user.id, "password mismatch");
            return Err(StoreError::InvalidCredentials);
        }
        Ok(user)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Replace name, email and password; replace the avatar if one is given.
    /// Only the account holder may do this.
    pub fn update_account(
        &self,
        id: UserId,
        actor: UserId,
        update: &AccountUpdate,
    ) -> Result<User> {
        if id != actor {
            return Err(StoreError::Forbidden(
                "You can only update your own account".into(),
            ));
        }
        require_account_fields(&update.name, &update.email, &update.password)?;

        let current = self.get_user(id)?;
        let name = update.name.trim().to_string();
        let email = normalize_email(&update.email);
        if self.name_or_email_taken(&name, &email, Some(id))? {
            return Err(StoreError::Conflict(
                "User with email or username already exists".into(),
            ));
        }

        let avatar = update.avatar.clone().or(current.avatar);
        self.conn()
            .execute(
                "UPDATE users
                 SET name = ?1, email = ?2, password_hash = ?3, avatar = ?4, updated_at = ?5
                 WHERE id = ?6",
                params![
                    name,
                    email,
                    hash_password(&update.password)?,
                    avatar,
                    row::now(),
                    id.to_string(),
                ],
            )
            .map_err(conflict_on_unique("User"))?;

        self.get_user(id)
    }

    /// Point the account at its channel, or clear the link.
    pub(crate) fn set_channel_link(&self, id: UserId, channel: Option<ChannelId>) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE users SET has_channel = ?1, channel_id = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                channel.is_some(),
                channel.map(|c| c.to_string()),
                row::now(),
                id.to_string(),
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound("User"));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete
    // ------------------------------------------------------------------

    /// Remove the bare row. Callers go through [`Database::delete_user`].
    pub(crate) fn remove_user_row(&self, id: UserId) -> Result<bool> {
        let affected = self
            .conn()
            .execute("DELETE FROM users WHERE id = ?1", params![id.to_string()])?;
        Ok(affected > 0)
    }

    fn name_or_email_taken(&self, name: &str, email: &str, except: Option<UserId>) -> Result<bool> {
        let except = except.map(|id| id.to_string()).unwrap_or_default();
        let hit: Option<String> = self
            .conn()
            .query_row(
                "SELECT id FROM users WHERE (name = ?1 OR email = ?2) AND id != ?3 LIMIT 1",
                params![name, email, except],
                |r| r.get(0),
            )
            .optional()?;
        Ok(hit.is_some())
    }
}

/// Used by tests elsewhere in the crate to count rows without a model.
#[cfg(test)]
pub(crate) fn user_count(db: &Database) -> i64 {
    db.conn()
        .query_row("SELECT COUNT(*) FROM users", [], |r| r.get(0))
        .unwrap()
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`User`].
fn row_to_user(r: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row::id(r, 0)?,
        name: r.get(1)?,
        email: r.get(2)?,
        password_hash: r.get(3)?,
        avatar: r.get(4)?,
        has_channel: r.get(5)?,
        channel_id: row::opt_id(r, 6)?,
        subscriptions: row::json(r, 7)?,
        likes: row::json(r, 8)?,
        created_at: row::timestamp(r, 9)?,
        updated_at: row::timestamp(r, 10)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signup(db: &Database, name: &str, email: &str) -> User {
        db.register_user(
            &NewUser {
                name: name.into(),
                email: email.into(),
                password: "pw".into(),
            },
            None,
        )
        .unwrap()
    }

    #[test]
    fn register_normalizes_and_hashes() {
        let db = Database::open_in_memory().unwrap();
        let user = signup(&db, "  alice ", "  Alice@Example.COM ");

        assert_eq!(user.name, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert_ne!(user.password_hash, "pw");
        assert!(!user.has_channel);
        assert_eq!(db.get_user(user.id).unwrap(), user);
    }

    #[test]
    fn duplicate_email_or_name_conflicts() {
        let db = Database::open_in_memory().unwrap();
        signup(&db, "alice", "alice@example.com");

        let same_email = NewUser {
            name: "other".into(),
            email: "ALICE@example.com".into(),
            password: "pw".into(),
        };
        assert!(matches!(
            db.register_user(&same_email, None),
            Err(StoreError::Conflict(_))
        ));

        let same_name = NewUser {
            name: "alice".into(),
            email: "other@example.com".into(),
            password: "pw".into(),
        };
        assert!(matches!(
            db.register_user(&same_name, None),
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(user_count(&db), 1);
    }

    #[test]
    fn missing_fields_fail_validation() {
        let db = Database::open_in_memory().unwrap();
        let new = NewUser {
            name: "bob".into(),
            email: " ".into(),
            password: "pw".into(),
        };
        assert!(matches!(
            db.register_user(&new, None),
            Err(StoreError::ValidationFailed(_))
        ));
    }

    #[test]
    fn authenticate_checks_the_hash() {
        let db = Database::open_in_memory().unwrap();
        let user = signup(&db, "carol", "carol@example.com");

        assert_eq!(db.authenticate("Carol@example.com", "pw").unwrap().id, user.id);
        assert!(matches!(
            db.authenticate("carol@example.com", "wrong"),
            Err(StoreError::InvalidCredentials)
        ));
        assert!(matches!(
            db.authenticate("nobody@example.com", "pw"),
            Err(StoreError::InvalidCredentials)
        ));
    }

    #[test]
    fn update_account_is_self_only_and_keeps_avatar() {
        let db = Database::open_in_memory().unwrap();
        let dave = db
            .register_user(
                &NewUser {
                    name: "dave".into(),
                    email: "dave@example.com".into(),
                    password: "pw".into(),
                },
                Some("https://cdn/a.png"),
            )
            .unwrap();
        let eve = signup(&db, "eve", "eve@example.com");

        let update = AccountUpdate {
            name: "david".into(),
            email: "david@example.com".into(),
            password: "new-pw".into(),
            avatar: None,
        };
        assert!(matches!(
            db.update_account(dave.id, eve.id, &update),
            Err(StoreError::Forbidden(_))
        ));

        let updated = db.update_account(dave.id, dave.id, &update).unwrap();
        assert_eq!(updated.name, "david");
        assert_eq!(updated.avatar.as_deref(), Some("https://cdn/a.png"));
        assert!(db.authenticate("david@example.com", "new-pw").is_ok());

        let taken = AccountUpdate {
            email: "eve@example.com".into(),
            ..update
        };
        assert!(matches!(
            db.update_account(dave.id, dave.id, &taken),
            Err(StoreError::Conflict(_))
        ));
    }
}

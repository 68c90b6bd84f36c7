//! v001 -- Initial schema creation.
//!
//! Creates the five collections: `users`, `channels`, `videos`, `comments`
//! and `tags`. Reference sets are JSON arrays of ids; there are no foreign
//! keys, the cascades in `integrity` keep references consistent.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY NOT NULL,   -- UUID v4
    name          TEXT NOT NULL UNIQUE,
    email         TEXT NOT NULL UNIQUE,        -- trimmed, lowercased
    password_hash TEXT NOT NULL,               -- argon2id$salt$hash
    avatar        TEXT,
    has_channel   INTEGER NOT NULL DEFAULT 0,  -- boolean 0/1
    channel_id    TEXT,
    subscriptions TEXT NOT NULL DEFAULT '[]',  -- JSON [channel id]
    likes         TEXT NOT NULL DEFAULT '[]',  -- JSON [video id]
    created_at    TEXT NOT NULL,               -- RFC-3339
    updated_at    TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Channels
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS channels (
    id          TEXT PRIMARY KEY NOT NULL,
    name        TEXT NOT NULL,
    handle      TEXT NOT NULL UNIQUE,
    banner      TEXT,
    avatar      TEXT,
    description TEXT NOT NULL DEFAULT '',
    owner       TEXT NOT NULL,                 -- user id
    subscribers TEXT NOT NULL DEFAULT '[]',    -- JSON [user id]
    videos      TEXT NOT NULL DEFAULT '[]',    -- JSON [video id]
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_channels_owner ON channels(owner);

-- ----------------------------------------------------------------
-- Videos
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS videos (
    id          TEXT PRIMARY KEY NOT NULL,
    video_file  TEXT NOT NULL,
    thumbnail   TEXT NOT NULL,
    title       TEXT NOT NULL,
    description TEXT NOT NULL,
    duration    REAL NOT NULL DEFAULT 0,       -- seconds
    views       INTEGER NOT NULL DEFAULT 0,
    owner       TEXT NOT NULL,                 -- user id
    channel_id  TEXT,
    tags        TEXT NOT NULL DEFAULT '[]',    -- JSON [tag name]
    likes       TEXT NOT NULL DEFAULT '[]',    -- JSON [user id]
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_videos_owner ON videos(owner);
CREATE INDEX IF NOT EXISTS idx_videos_channel ON videos(channel_id);

-- ----------------------------------------------------------------
-- Comments
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS comments (
    id          TEXT PRIMARY KEY NOT NULL,
    text        TEXT NOT NULL,
    user_name   TEXT NOT NULL,                 -- snapshot at comment time
    user_id     TEXT NOT NULL,
    user_avatar TEXT,                          -- snapshot at comment time
    video_id    TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_comments_video ON comments(video_id);
CREATE INDEX IF NOT EXISTS idx_comments_user ON comments(user_id);

-- ----------------------------------------------------------------
-- Tags
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS tags (
    id         TEXT PRIMARY KEY NOT NULL,
    name       TEXT NOT NULL UNIQUE,           -- lowercased
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}

//! # vidcast-store
//!
//! Persistent storage for vidcast, backed by SQLite.
//!
//! Records are stored document-style: each row carries its own reference
//! sets (subscriptions, subscribers, likes, owned videos) as JSON arrays of
//! ids. Nothing in the schema enforces those references, so every delete
//! goes through the cascades in [`integrity`], which prune dangling ids
//! inside a single transaction.

pub mod channels;
pub mod comments;
pub mod database;
pub mod integrity;
pub mod migrations;
pub mod models;
pub mod tags;
pub mod users;
pub mod videos;

mod error;
mod refs;
mod row;

pub use channels::ChannelDefaults;
pub use database::Database;
pub use error::{Result, StoreError};
pub use integrity::CascadeReport;
pub use models::*;
pub use tags::parse_tag_list;

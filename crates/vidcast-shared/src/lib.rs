//! # vidcast-shared
//!
//! Types and primitives shared by the vidcast store and server: typed
//! entity ids, constants, password hashing and signed access tokens.

pub mod constants;
pub mod error;
pub mod password;
pub mod token;
pub mod types;

pub use error::SharedError;
pub use types::{ChannelId, CommentId, TagId, UserId, VideoId};

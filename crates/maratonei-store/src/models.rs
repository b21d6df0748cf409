//! Read models assembled from joins.
//!
//! The persisted domain types themselves live in `maratonei_shared::types`
//! and are re-exported here so callers only need one import path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use maratonei_shared::types::*;

/// A stamp in a user's collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserStamp {
    pub stamp: Stamp,
    pub obtained_at: DateTime<Utc>,
}

/// A post as shown in a feed: the post, its author and whether the viewer
/// already liked it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedItem {
    pub post: Post,
    pub author: UserSummary,
    pub liked_by_viewer: bool,
}

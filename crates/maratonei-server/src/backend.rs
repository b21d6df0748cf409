//! SQLite-backed implementation of every collaborator the server's services
//! depend on.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use maratonei_shared::lookup::{LookupError, UserDirectory};
use maratonei_store::{
    Comment, Database, NewNotification, NewPost, Post, PostId, RequirementKind, SeriesId, Stamp,
    StampId, StoreError, UserId, UserSummary,
};

use crate::badges::{GrantOutcome, PostCounter, StampCatalog, StampOwnership};
use crate::mentions::{HandleResolver, NotificationSink};
use crate::posting::PostStore;

/// Shared handle to the database. Every call locks for the duration of one
/// synchronous store operation; the guard never crosses an `.await`.
#[derive(Clone)]
pub struct SqliteBackend {
    db: Arc<Mutex<Database>>,
}

impl SqliteBackend {
    pub fn new(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
        }
    }

    pub fn with_db<T>(&self, f: impl FnOnce(&Database) -> maratonei_store::Result<T>) -> maratonei_store::Result<T> {
        // A panic mid-statement leaves SQLite consistent, so a poisoned lock
        // is still usable.
        let db = self.db.lock().unwrap_or_else(PoisonError::into_inner);
        f(&db)
    }
}

#[async_trait]
impl StampCatalog for SqliteBackend {
    async fn stamps_for_series(
        &self,
        series: SeriesId,
        kind: RequirementKind,
    ) -> anyhow::Result<Vec<Stamp>> {
        Ok(self.with_db(|db| db.stamps_for_series(series, kind))?)
    }
}

#[async_trait]
impl StampOwnership for SqliteBackend {
    async fn owns(&self, user: UserId, stamp: StampId) -> anyhow::Result<bool> {
        Ok(self.with_db(|db| db.has_stamp(user, stamp))?)
    }

    async fn grant(&self, user: UserId, stamp: &Stamp) -> anyhow::Result<GrantOutcome> {
        let granted = self.with_db(|db| db.grant_stamp(user, stamp))?;
        Ok(if granted {
            GrantOutcome::Granted
        } else {
            GrantOutcome::AlreadyHeld
        })
    }
}

#[async_trait]
impl PostCounter for SqliteBackend {
    async fn count_posts_for_series(&self, user: UserId, series: SeriesId) -> anyhow::Result<u64> {
        Ok(self.with_db(|db| db.count_posts_for_series(user, series))?)
    }
}

#[async_trait]
impl NotificationSink for SqliteBackend {
    async fn notify(&self, notification: NewNotification) -> anyhow::Result<()> {
        self.with_db(|db| db.create_notification(&notification))?;
        Ok(())
    }
}

#[async_trait]
impl HandleResolver for SqliteBackend {
    async fn find_by_handle(&self, handle: &str) -> anyhow::Result<Option<UserSummary>> {
        Ok(self.with_db(|db| db.find_by_handle(handle))?)
    }
}

#[async_trait]
impl PostStore for SqliteBackend {
    async fn create_post(&self, new: &NewPost) -> Result<Post, StoreError> {
        self.with_db(|db| db.create_post(new))
    }

    async fn add_comment(
        &self,
        post: PostId,
        author: UserId,
        content: &str,
    ) -> Result<Comment, StoreError> {
        self.with_db(|db| db.add_comment(post, author, content))
    }
}

#[async_trait]
impl UserDirectory for SqliteBackend {
    async fn search_users(&self, query: &str) -> Result<Vec<UserSummary>, LookupError> {
        self.with_db(|db| db.search_users(query))
            .map_err(|e| LookupError::Backend(e.to_string()))
    }
}

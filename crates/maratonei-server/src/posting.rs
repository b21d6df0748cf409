//! Publishing pipeline: validate, persist, then run the best-effort side
//! effects (mention notifications, then badge evaluation) on a detached task.

use std::sync::Arc;

use async_trait::async_trait;
use maratonei_store::{Comment, ContentKind, NewPost, Post, PostId, Stamp, StoreError, UserId};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::badges::BadgeEvaluator;
use crate::mentions::MentionNotifier;

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn create_post(&self, new: &NewPost) -> Result<Post, StoreError>;
    async fn add_comment(&self, post: PostId, author: UserId, content: &str)
        -> Result<Comment, StoreError>;
}

/// A stored item plus the handle of its side-effect task. Dropping the
/// handle detaches the task; it still runs to completion.
pub struct Published<T> {
    pub item: T,
    pub side_effects: JoinHandle<Option<Stamp>>,
}

impl<T> Published<T> {
    /// Wait for the side effects and return the stamp they awarded, if any.
    pub async fn earned_stamp(self) -> (T, Option<Stamp>) {
        let earned = match self.side_effects.await {
            Ok(earned) => earned,
            Err(e) => {
                warn!(error = %e, "post side-effect task failed");
                None
            }
        };
        (self.item, earned)
    }
}

#[derive(Clone)]
pub struct PostService {
    store: Arc<dyn PostStore>,
    mentions: MentionNotifier,
    badges: Option<BadgeEvaluator>,
}

impl PostService {
    /// `badges: None` turns badge evaluation off.
    pub fn new(
        store: Arc<dyn PostStore>,
        mentions: MentionNotifier,
        badges: Option<BadgeEvaluator>,
    ) -> Self {
        Self {
            store,
            mentions,
            badges,
        }
    }

    /// Validation and persistence failures are returned; nothing after the
    /// insert can fail the call.
    pub async fn publish(&self, new: NewPost) -> Result<Published<Post>, StoreError> {
        new.validate()?;
        let post = self.store.create_post(&new).await?;

        let mentions = self.mentions.clone();
        let badges = self.badges.clone();
        let author = post.author_id;
        let content = post.content.clone();
        let series = post.series.as_ref().map(|s| s.id);

        let side_effects = tokio::spawn(async move {
            let mentioned = mentions
                .notify_mentions(author, &content, ContentKind::Post)
                .await;
            debug!(%author, mentioned, "post mentions dispatched");

            match badges {
                Some(evaluator) => evaluator.evaluate(author, series).await,
                None => None,
            }
        });

        Ok(Published {
            item: post,
            side_effects,
        })
    }

    /// Comments only trigger mention notifications; the post author's
    /// `comment` notification is written with the comment itself.
    pub async fn comment(
        &self,
        post: PostId,
        author: UserId,
        content: &str,
    ) -> Result<Published<Comment>, StoreError> {
        let comment = self.store.add_comment(post, author, content).await?;

        let mentions = self.mentions.clone();
        let text = comment.content.clone();
        let side_effects = tokio::spawn(async move {
            mentions
                .notify_mentions(author, &text, ContentKind::Comment)
                .await;
            None
        });

        Ok(Published {
            item: comment,
            side_effects,
        })
    }
}

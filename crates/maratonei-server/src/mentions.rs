//! Mention notifications for freshly published posts and comments.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use maratonei_shared::render::mentioned_handles;
use maratonei_store::{ContentKind, NewNotification, UserId, UserSummary};
use tracing::{debug, warn};

#[async_trait]
pub trait HandleResolver: Send + Sync {
    /// Exact handle (with or without `@`) or exact display name.
    async fn find_by_handle(&self, handle: &str) -> anyhow::Result<Option<UserSummary>>;
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: NewNotification) -> anyhow::Result<()>;
}

#[derive(Clone)]
pub struct MentionNotifier {
    users: Arc<dyn HandleResolver>,
    notifications: Arc<dyn NotificationSink>,
}

impl MentionNotifier {
    pub fn new(users: Arc<dyn HandleResolver>, notifications: Arc<dyn NotificationSink>) -> Self {
        Self {
            users,
            notifications,
        }
    }

    /// Notify every distinct user referenced in `content`, except `actor`.
    /// Two references resolving to the same profile count once. Returns how
    /// many notifications were stored. Failures are logged per handle and
    /// never abort the remaining ones.
    pub async fn notify_mentions(&self, actor: UserId, content: &str, origin: ContentKind) -> usize {
        let mut sent = 0;
        let mut seen = HashSet::from([actor]);

        for handle in mentioned_handles(content) {
            let target = match self.users.find_by_handle(handle).await {
                Ok(Some(user)) => user,
                Ok(None) => {
                    debug!(%handle, "mention does not match any user");
                    continue;
                }
                Err(e) => {
                    warn!(%handle, error = %e, "mention lookup failed");
                    continue;
                }
            };

            if !seen.insert(target.id) {
                continue;
            }

            match self
                .notifications
                .notify(NewNotification::mention(target.id, actor, origin))
                .await
            {
                Ok(()) => sent += 1,
                Err(e) => warn!(%handle, error = %e, "mention notification failed"),
            }
        }

        sent
    }
}

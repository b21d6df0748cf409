//! Badge rule evaluator.
//!
//! After a post tagged with a series is stored, the evaluator compares the
//! author's post count for that series with the `post_count` stamps linked to
//! it and awards at most one newly earned stamp per call. Awards are
//! idempotent: the store's unique (user, stamp) index decides who wins a
//! race, and the loser sees [`GrantOutcome::AlreadyHeld`]. A grant and its
//! `badge_earned` notification are stored together or not at all.

use std::sync::Arc;

use async_trait::async_trait;
use maratonei_store::{RequirementKind, SeriesId, Stamp, StampId, UserId};
use tracing::{debug, info, warn};

#[async_trait]
pub trait StampCatalog: Send + Sync {
    /// Stamps linked to `series` with requirement `kind`, in catalog order:
    /// ascending threshold, then creation time.
    async fn stamps_for_series(
        &self,
        series: SeriesId,
        kind: RequirementKind,
    ) -> anyhow::Result<Vec<Stamp>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantOutcome {
    Granted,
    AlreadyHeld,
}

#[async_trait]
pub trait StampOwnership: Send + Sync {
    async fn owns(&self, user: UserId, stamp: StampId) -> anyhow::Result<bool>;

    /// Record the ownership and its `badge_earned` notification atomically.
    async fn grant(&self, user: UserId, stamp: &Stamp) -> anyhow::Result<GrantOutcome>;
}

#[async_trait]
pub trait PostCounter: Send + Sync {
    async fn count_posts_for_series(&self, user: UserId, series: SeriesId) -> anyhow::Result<u64>;
}

#[derive(Clone)]
pub struct BadgeEvaluator {
    catalog: Arc<dyn StampCatalog>,
    ownership: Arc<dyn StampOwnership>,
    posts: Arc<dyn PostCounter>,
}

impl BadgeEvaluator {
    pub fn new(
        catalog: Arc<dyn StampCatalog>,
        ownership: Arc<dyn StampOwnership>,
        posts: Arc<dyn PostCounter>,
    ) -> Self {
        Self {
            catalog,
            ownership,
            posts,
        }
    }

    /// Award the first stamp `user` newly earned for `series`, if any.
    ///
    /// Never fails: lookup or persistence errors are logged and reported as
    /// "no badge this time".
    pub async fn evaluate(&self, user: UserId, series: Option<SeriesId>) -> Option<Stamp> {
        let series = series?;
        match self.try_evaluate(user, series).await {
            Ok(earned) => earned,
            Err(e) => {
                warn!(%user, %series, error = %e, "badge evaluation failed");
                None
            }
        }
    }

    async fn try_evaluate(&self, user: UserId, series: SeriesId) -> anyhow::Result<Option<Stamp>> {
        let stamps = self
            .catalog
            .stamps_for_series(series, RequirementKind::PostCount)
            .await?;
        if stamps.is_empty() {
            return Ok(None);
        }

        let count = self.posts.count_posts_for_series(user, series).await?;
        debug!(%user, %series, count, candidates = stamps.len(), "evaluating badges");

        for stamp in stamps {
            if !stamp.is_satisfied_by(count) {
                continue;
            }
            if self.ownership.owns(user, stamp.id).await? {
                continue;
            }

            match self.ownership.grant(user, &stamp).await? {
                GrantOutcome::AlreadyHeld => continue,
                GrantOutcome::Granted => {
                    info!(%user, stamp = %stamp.id, name = %stamp.name, "badge earned");
                    return Ok(Some(stamp));
                }
            }
        }

        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use chrono::Utc;
    use maratonei_store::{NewNotification, NotificationKind, Rarity, Requirement, SeriesRef};

    use super::*;

    const SERIES: SeriesId = SeriesId(1396);

    /// In-memory stand-in for every collaborator.
    #[derive(Default)]
    struct Fake {
        stamps: Vec<Stamp>,
        counts: HashMap<(UserId, SeriesId), u64>,
        owned: Mutex<HashSet<(UserId, StampId)>>,
        notifications: Mutex<Vec<NewNotification>>,
        catalog_calls: AtomicUsize,
        fail_catalog: bool,
        fail_count: bool,
        /// Number of upcoming grants that fail before writing anything.
        failing_grants: AtomicUsize,
        /// Report every grant as lost to a concurrent evaluation.
        lose_races: bool,
    }

    #[async_trait]
    impl StampCatalog for Fake {
        async fn stamps_for_series(
            &self,
            series: SeriesId,
            kind: RequirementKind,
        ) -> anyhow::Result<Vec<Stamp>> {
            self.catalog_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_catalog {
                anyhow::bail!("catalog unavailable");
            }
            Ok(self
                .stamps
                .iter()
                .filter(|s| {
                    s.requirement.kind() == kind && s.series.as_ref().map(|r| r.id) == Some(series)
                })
                .cloned()
                .collect())
        }
    }

    #[async_trait]
    impl StampOwnership for Fake {
        async fn owns(&self, user: UserId, stamp: StampId) -> anyhow::Result<bool> {
            Ok(self.owned.lock().unwrap().contains(&(user, stamp)))
        }

        async fn grant(&self, user: UserId, stamp: &Stamp) -> anyhow::Result<GrantOutcome> {
            if self.lose_races {
                return Ok(GrantOutcome::AlreadyHeld);
            }
            let failing = self
                .failing_grants
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
            if failing.is_ok() {
                anyhow::bail!("database is locked");
            }
            if self.owned.lock().unwrap().insert((user, stamp.id)) {
                self.notifications
                    .lock()
                    .unwrap()
                    .push(NewNotification::badge_earned(user, stamp));
                Ok(GrantOutcome::Granted)
            } else {
                Ok(GrantOutcome::AlreadyHeld)
            }
        }
    }

    #[async_trait]
    impl PostCounter for Fake {
        async fn count_posts_for_series(&self, user: UserId, series: SeriesId) -> anyhow::Result<u64> {
            if self.fail_count {
                anyhow::bail!("count query failed");
            }
            Ok(self.counts.get(&(user, series)).copied().unwrap_or(0))
        }
    }

    fn stamp(name: &str, threshold: u32) -> Stamp {
        Stamp {
            id: StampId::new(),
            name: name.into(),
            description: String::new(),
            rarity: Rarity::Common,
            image_url: format!("https://img/{name}.png"),
            price: None,
            series: Some(SeriesRef {
                id: SERIES,
                title: "Breaking Bad".into(),
            }),
            requirement: Requirement::PostCount { threshold },
            max_supply: None,
            current_supply: 0,
            created_at: Utc::now(),
        }
    }

    fn build(fake: Fake) -> (BadgeEvaluator, Arc<Fake>) {
        let fake = Arc::new(fake);
        let evaluator = BadgeEvaluator::new(fake.clone(), fake.clone(), fake.clone());
        (evaluator, fake)
    }

    #[tokio::test]
    async fn no_series_means_no_lookup() {
        let (evaluator, fake) = build(Fake::default());
        assert!(evaluator.evaluate(UserId::new(), None).await.is_none());
        assert_eq!(fake.catalog_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn below_threshold_earns_nothing() {
        let user = UserId::new();
        let (evaluator, fake) = build(Fake {
            stamps: vec![stamp("Fan", 3)],
            counts: HashMap::from([((user, SERIES), 2)]),
            ..Default::default()
        });

        assert!(evaluator.evaluate(user, Some(SERIES)).await.is_none());
        assert!(fake.owned.lock().unwrap().is_empty());
        assert!(fake.notifications.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_evaluation_reports_nothing() {
        let user = UserId::new();
        let fan = stamp("Fan", 1);
        let (evaluator, fake) = build(Fake {
            stamps: vec![fan.clone()],
            counts: HashMap::from([((user, SERIES), 1)]),
            ..Default::default()
        });

        let first = evaluator.evaluate(user, Some(SERIES)).await;
        assert_eq!(first.map(|s| s.id), Some(fan.id));
        assert!(evaluator.evaluate(user, Some(SERIES)).await.is_none());

        assert_eq!(fake.owned.lock().unwrap().len(), 1);
        let sent = fake.notifications.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].kind, NotificationKind::BadgeEarned);
        assert_eq!(sent[0].link, Some(fan.badge_link()));
    }

    #[tokio::test]
    async fn one_badge_per_call_in_threshold_order() {
        let user = UserId::new();
        let two = stamp("Two", 2);
        let one = stamp("One", 1);
        // Catalog order comes from the collaborator.
        let (evaluator, fake) = build(Fake {
            stamps: vec![one.clone(), two.clone()],
            counts: HashMap::from([((user, SERIES), 3)]),
            ..Default::default()
        });

        let first = evaluator.evaluate(user, Some(SERIES)).await;
        assert_eq!(first.map(|s| s.id), Some(one.id));
        assert_eq!(fake.owned.lock().unwrap().len(), 1);

        let second = evaluator.evaluate(user, Some(SERIES)).await;
        assert_eq!(second.map(|s| s.id), Some(two.id));

        assert!(evaluator.evaluate(user, Some(SERIES)).await.is_none());
        assert_eq!(fake.notifications.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn lost_race_is_not_reported() {
        let user = UserId::new();
        let (evaluator, fake) = build(Fake {
            stamps: vec![stamp("Fan", 1)],
            counts: HashMap::from([((user, SERIES), 5)]),
            lose_races: true,
            ..Default::default()
        });

        assert!(evaluator.evaluate(user, Some(SERIES)).await.is_none());
        assert!(fake.notifications.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn collaborator_failures_are_swallowed() {
        let user = UserId::new();
        let (evaluator, _) = build(Fake {
            stamps: vec![stamp("Fan", 1)],
            fail_catalog: true,
            ..Default::default()
        });
        assert!(evaluator.evaluate(user, Some(SERIES)).await.is_none());

        let (evaluator, fake) = build(Fake {
            stamps: vec![stamp("Fan", 1)],
            fail_count: true,
            ..Default::default()
        });
        assert!(evaluator.evaluate(user, Some(SERIES)).await.is_none());
        assert!(fake.owned.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_grant_is_retried_by_the_next_evaluation() {
        let user = UserId::new();
        let fan = stamp("Fan", 1);
        let (evaluator, fake) = build(Fake {
            stamps: vec![fan.clone()],
            counts: HashMap::from([((user, SERIES), 1)]),
            failing_grants: AtomicUsize::new(1),
            ..Default::default()
        });

        assert!(evaluator.evaluate(user, Some(SERIES)).await.is_none());
        assert!(fake.owned.lock().unwrap().is_empty());
        assert!(fake.notifications.lock().unwrap().is_empty());

        let earned = evaluator.evaluate(user, Some(SERIES)).await;
        assert_eq!(earned.map(|s| s.id), Some(fan.id));
        assert_eq!(fake.notifications.lock().unwrap().len(), 1);
    }
}

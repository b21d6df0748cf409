//! Debounced mention lookups.
//!
//! Every call to [`SuggestionFetcher::fetch`] takes a new generation number.
//! After the debounce delay, and again once the collaborator answers, the
//! call checks that its generation is still the latest; otherwise the
//! lookup is skipped or its result discarded. Only the most recent query can
//! ever reach the dropdown.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use maratonei_shared::constants::SERIES_SUGGESTION_LIMIT;
use maratonei_shared::lookup::{LookupError, SeriesCatalog, UserDirectory};
use maratonei_shared::mention::{ActiveSearch, TriggerKind};
use maratonei_shared::types::MentionCandidate;
use tracing::{debug, warn};

use crate::api::ServerApi;
use crate::config::ClientConfig;
use crate::tmdb::TmdbClient;

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// Candidates for the latest query, possibly empty.
    Ready(Vec<MentionCandidate>),
    /// The query is empty; nothing was looked up.
    Skipped,
    /// A newer query arrived before this one finished.
    Superseded,
    /// The lookup failed; the list should stay as it is.
    Failed,
}

#[derive(Clone)]
pub struct SuggestionFetcher {
    users: Arc<dyn UserDirectory>,
    series: Arc<dyn SeriesCatalog>,
    debounce: Duration,
    generation: Arc<AtomicU64>,
}

impl SuggestionFetcher {
    pub fn new(
        users: Arc<dyn UserDirectory>,
        series: Arc<dyn SeriesCatalog>,
        debounce: Duration,
    ) -> Self {
        Self {
            users,
            series,
            debounce,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn from_clients(api: ServerApi, tmdb: TmdbClient, config: &ClientConfig) -> Self {
        Self::new(Arc::new(api), Arc::new(tmdb), config.mention_debounce)
    }

    /// Invalidate whatever lookup is pending or in flight.
    pub fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn is_current(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }

    /// Start a lookup for `search`. The generation is taken right away, so
    /// any later call supersedes this one even if it has not been polled yet.
    /// The returned future waits out the debounce before asking the
    /// collaborator.
    pub fn fetch(&self, search: &ActiveSearch) -> impl Future<Output = FetchOutcome> + Send + 'static {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let fetcher = self.clone();
        let search = search.clone();
        async move { fetcher.run(ticket, &search).await }
    }

    async fn run(&self, ticket: u64, search: &ActiveSearch) -> FetchOutcome {
        if !search.wants_lookup() {
            return FetchOutcome::Skipped;
        }

        tokio::time::sleep(self.debounce).await;
        if !self.is_current(ticket) {
            debug!(query = %search.query, "mention lookup superseded before sending");
            return FetchOutcome::Superseded;
        }

        let result = self.lookup(search).await;
        if !self.is_current(ticket) {
            debug!(query = %search.query, "discarding stale mention results");
            return FetchOutcome::Superseded;
        }

        match result {
            Ok(candidates) => FetchOutcome::Ready(candidates),
            Err(e) => {
                warn!(kind = ?search.kind, query = %search.query, error = %e, "mention lookup failed");
                FetchOutcome::Failed
            }
        }
    }

    async fn lookup(&self, search: &ActiveSearch) -> Result<Vec<MentionCandidate>, LookupError> {
        match search.kind {
            TriggerKind::User => Ok(self
                .users
                .search_users(&search.query)
                .await?
                .into_iter()
                .map(MentionCandidate::User)
                .collect()),
            TriggerKind::Series => Ok(self
                .series
                .search_series(&search.query)
                .await?
                .into_iter()
                .take(SERIES_SUGGESTION_LIMIT)
                .map(MentionCandidate::Series)
                .collect()),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;
    use maratonei_shared::mention::detect;
    use maratonei_shared::types::{SeriesId, SeriesSummary, UserId, UserSummary};

    use super::*;

    /// Directory and catalog double that records queries and answers after
    /// `latency`.
    #[derive(Default)]
    pub(crate) struct FakeLookups {
        pub queries: Mutex<Vec<String>>,
        pub latency: Duration,
        pub fail: bool,
    }

    impl FakeLookups {
        pub fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }

        async fn answer(&self, query: &str) -> Result<(), LookupError> {
            self.queries.lock().unwrap().push(query.to_string());
            tokio::time::sleep(self.latency).await;
            if self.fail {
                return Err(LookupError::Status(503));
            }
            Ok(())
        }
    }

    pub(crate) fn user(handle: &str) -> UserSummary {
        UserSummary {
            id: UserId::new(),
            name: handle.to_string(),
            handle: Some(format!("@{handle}")),
            avatar: None,
        }
    }

    pub(crate) fn series(id: i64, name: &str) -> SeriesSummary {
        SeriesSummary {
            id: SeriesId(id),
            name: name.to_string(),
            overview: String::new(),
            poster_path: None,
            backdrop_path: None,
            vote_average: 0.0,
            first_air_date: None,
        }
    }

    #[async_trait]
    impl UserDirectory for FakeLookups {
        async fn search_users(&self, query: &str) -> Result<Vec<UserSummary>, LookupError> {
            self.answer(query).await?;
            Ok(vec![user(query)])
        }
    }

    #[async_trait]
    impl SeriesCatalog for FakeLookups {
        async fn search_series(&self, query: &str) -> Result<Vec<SeriesSummary>, LookupError> {
            self.answer(query).await?;
            Ok((1..=8).map(|i| series(i, &format!("{query} {i}"))).collect())
        }

        async fn trending_series(&self) -> Result<Vec<SeriesSummary>, LookupError> {
            Ok(Vec::new())
        }
    }

    pub(crate) fn fetcher(fake: FakeLookups) -> (SuggestionFetcher, Arc<FakeLookups>) {
        let fake = Arc::new(fake);
        let fetcher = SuggestionFetcher::new(fake.clone(), fake.clone(), Duration::from_millis(300));
        (fetcher, fake)
    }

    fn search(text: &str) -> ActiveSearch {
        detect(text, text.chars().count()).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn user_lookup_after_debounce() {
        let (fetcher, fake) = fetcher(FakeLookups::default());

        let outcome = fetcher.fetch(&search("oi @mar")).await;

        match outcome {
            FetchOutcome::Ready(candidates) => {
                assert_eq!(candidates.len(), 1);
                assert!(matches!(&candidates[0], MentionCandidate::User(u) if u.name == "mar"));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(fake.queries(), vec!["mar"]);
    }

    #[tokio::test(start_paused = true)]
    async fn series_results_are_capped() {
        let (fetcher, _) = fetcher(FakeLookups::default());

        let FetchOutcome::Ready(candidates) = fetcher.fetch(&search("vendo /Break")).await else {
            panic!("expected candidates");
        };
        assert_eq!(candidates.len(), SERIES_SUGGESTION_LIMIT);
        assert!(candidates
            .iter()
            .all(|c| matches!(c, MentionCandidate::Series(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn empty_query_is_not_looked_up() {
        let (fetcher, fake) = fetcher(FakeLookups::default());

        assert_eq!(fetcher.fetch(&search("oi @")).await, FetchOutcome::Skipped);
        assert!(fake.queries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn typing_within_debounce_sends_only_the_last_query() {
        let (fetcher, fake) = fetcher(FakeLookups::default());

        let first = tokio::spawn(fetcher.fetch(&search("@m")));
        tokio::time::sleep(Duration::from_millis(100)).await;
        let second = tokio::spawn(fetcher.fetch(&search("@ma")));

        assert_eq!(first.await.unwrap(), FetchOutcome::Superseded);
        assert!(matches!(second.await.unwrap(), FetchOutcome::Ready(_)));
        assert_eq!(fake.queries(), vec!["ma"]);
    }

    #[tokio::test(start_paused = true)]
    async fn late_response_for_old_query_is_discarded() {
        let (fetcher, fake) = fetcher(FakeLookups {
            latency: Duration::from_secs(2),
            ..FakeLookups::default()
        });

        let slow = tokio::spawn(fetcher.fetch(&search("@jo")));
        // Past the debounce, so the first lookup is already in flight.
        tokio::time::sleep(Duration::from_millis(500)).await;
        fetcher.cancel();

        assert_eq!(slow.await.unwrap(), FetchOutcome::Superseded);
        assert_eq!(fake.queries(), vec!["jo"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_are_reported_not_raised() {
        let (fetcher, _) = fetcher(FakeLookups {
            fail: true,
            ..FakeLookups::default()
        });

        assert_eq!(fetcher.fetch(&search("@ana")).await, FetchOutcome::Failed);
    }
}

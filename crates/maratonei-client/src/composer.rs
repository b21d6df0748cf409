//! Composer state machine.
//!
//! The UI reports every edit with [`Composer::edit`]. When that opens or
//! changes a mention search, the UI runs the returned lookup (usually on a
//! spawned task) and hands the outcome back through [`Composer::apply`],
//! which ignores results for a search that is no longer open. Keys go
//! through [`Composer::handle_key`] first; accepting a candidate rewrites the
//! text and, for series in a post, records the related series.

use std::future::Future;

use maratonei_shared::draft::PostDraft;
use maratonei_shared::mention::{
    detect, insert_candidate, ActiveSearch, Key, KeyOutcome, SuggestionList,
};
use maratonei_shared::types::{Comment, MentionCandidate, PostId, SeriesRef};
use maratonei_shared::ValidationError;
use tracing::debug;

use crate::api::{PublishedPost, ServerApi};
use crate::error::ClientError;
use crate::search::{FetchOutcome, SuggestionFetcher};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeTarget {
    Post,
    Comment(PostId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    Post(PublishedPost),
    Comment(Comment),
}

pub struct Composer {
    target: ComposeTarget,
    cursor: usize,
    draft: PostDraft,
    search: Option<ActiveSearch>,
    suggestions: SuggestionList,
    fetcher: SuggestionFetcher,
}

impl Composer {
    pub fn new(target: ComposeTarget, fetcher: SuggestionFetcher) -> Self {
        Self {
            target,
            cursor: 0,
            draft: PostDraft::new(),
            search: None,
            suggestions: SuggestionList::default(),
            fetcher,
        }
    }

    pub fn target(&self) -> ComposeTarget {
        self.target
    }

    pub fn text(&self) -> &str {
        &self.draft.content
    }

    /// Character offset of the caret.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn active_search(&self) -> Option<&ActiveSearch> {
        self.search.as_ref()
    }

    pub fn suggestions(&self) -> &SuggestionList {
        &self.suggestions
    }

    pub fn related_series(&self) -> Option<&SeriesRef> {
        self.draft.related_series()
    }

    /// Drop the related series tag; the chip text stays in the content.
    pub fn clear_related_series(&mut self) -> Option<SeriesRef> {
        self.draft.clear_related_series()
    }

    pub fn set_image_url(&mut self, url: Option<String>) {
        self.draft.image_url = url;
    }

    /// Record an edit. Returns the search to look up when one is open.
    ///
    /// Leaving a mention closes the dropdown and invalidates any lookup in
    /// flight. A search that moved to another trigger also drops the
    /// candidates it had. Otherwise the current candidates stay until
    /// fresher ones arrive.
    pub fn edit(&mut self, text: impl Into<String>, cursor: usize) -> Option<ActiveSearch> {
        self.draft.content = text.into();
        self.cursor = cursor;
        let previous = self.search.take();
        self.search = detect(&self.draft.content, cursor);

        match (&previous, &self.search) {
            (_, None) => {
                self.suggestions.clear();
                self.fetcher.cancel();
            }
            (Some(old), Some(new)) if old.kind != new.kind || old.trigger_at != new.trigger_at => {
                self.suggestions.clear();
            }
            _ => {}
        }
        self.search.clone()
    }

    /// The lookup for `search`, to be awaited off the UI path.
    pub fn lookup(&self, search: &ActiveSearch) -> impl Future<Output = FetchOutcome> + Send + 'static {
        self.fetcher.fetch(search)
    }

    /// Feed a lookup outcome back. Returns whether the dropdown changed.
    pub fn apply(&mut self, search: &ActiveSearch, outcome: FetchOutcome) -> bool {
        if self.search.as_ref() != Some(search) {
            debug!(query = %search.query, "ignoring results for a closed search");
            return false;
        }
        match outcome {
            FetchOutcome::Ready(candidates) => {
                self.suggestions.show(candidates);
                true
            }
            FetchOutcome::Skipped | FetchOutcome::Superseded | FetchOutcome::Failed => false,
        }
    }

    /// Route a key through the dropdown. `Enter` on a visible list inserts
    /// the selected candidate.
    pub fn handle_key(&mut self, key: Key) -> KeyOutcome {
        let outcome = self.suggestions.handle_key(key);
        if let KeyOutcome::Accept(candidate) = &outcome {
            if !self.accept(candidate) {
                return KeyOutcome::PassThrough;
            }
        }
        outcome
    }

    /// Insert `candidate` in place of the open search. Returns `false` when
    /// no search is open or the candidate is of the other kind.
    pub fn accept(&mut self, candidate: &MentionCandidate) -> bool {
        let Some(search) = self.search.as_ref() else {
            return false;
        };
        let Some(insertion) =
            insert_candidate(&self.draft.content, self.cursor, search.kind, candidate)
        else {
            return false;
        };

        self.draft.content = insertion.text;
        self.cursor = insertion.cursor;
        if let (ComposeTarget::Post, Some(series)) = (self.target, insertion.series) {
            debug!(series = %series.id, title = %series.title, "related series set");
            self.draft.set_related_series(series);
        }

        self.search = None;
        self.suggestions.clear();
        self.fetcher.cancel();
        true
    }

    /// Send the post or comment. The composer is cleared only on success,
    /// so a failed submit can be retried as is.
    pub async fn submit(&mut self, api: &ServerApi) -> Result<Submitted, ClientError> {
        let author = api.user().ok_or(ClientError::NotSignedIn)?;

        let submitted = match self.target {
            ComposeTarget::Post => {
                let post = self.draft.to_new_post(author)?;
                Submitted::Post(api.publish(&post).await?)
            }
            ComposeTarget::Comment(post) => {
                if self.draft.content.trim().is_empty() {
                    return Err(ValidationError::EmptyContent.into());
                }
                Submitted::Comment(api.add_comment(post, &self.draft.content).await?)
            }
        };

        self.reset();
        Ok(submitted)
    }

    pub fn reset(&mut self) {
        self.draft.reset();
        self.cursor = 0;
        self.search = None;
        self.suggestions.clear();
        self.fetcher.cancel();
    }
}

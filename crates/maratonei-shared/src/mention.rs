//! Composer-side mention parsing.
//!
//! A mention search is opened by typing `@` (users) or `/` (series). The
//! text between the trigger and the cursor is the pending query. Accepting a
//! candidate rewrites that span into a normalized reference token:
//! `@handle ` for users, `*Series Name* ` for series. [`crate::render`]
//! turns those tokens back into spans when the post is displayed.
//!
//! Cursor positions are character offsets, as reported by text inputs, not
//! byte offsets.

use serde::{Deserialize, Serialize};

use crate::constants::{MAX_PENDING_QUERY_CHARS, SERIES_TRIGGER, USER_TRIGGER};
use crate::types::{MentionCandidate, SeriesRef};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    User,
    Series,
}

impl TriggerKind {
    pub fn trigger(&self) -> char {
        match self {
            TriggerKind::User => USER_TRIGGER,
            TriggerKind::Series => SERIES_TRIGGER,
        }
    }

    /// Whether `query` may still be part of an open reference of this kind.
    fn accepts(&self, query: &str) -> bool {
        if query.contains(['\n', '\r']) || query.chars().count() > MAX_PENDING_QUERY_CHARS {
            return false;
        }
        match self {
            TriggerKind::User => query.chars().all(is_handle_char),
            TriggerKind::Series => true,
        }
    }
}

/// Characters allowed in a user handle: word characters and dots.
pub fn is_handle_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.'
}

/// An open mention search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveSearch {
    pub kind: TriggerKind,
    /// Character offset of the trigger character.
    pub trigger_at: usize,
    pub query: String,
}

impl ActiveSearch {
    /// An empty query keeps the search open but is not worth a lookup.
    pub fn wants_lookup(&self) -> bool {
        !self.query.is_empty()
    }
}

/// Byte offset of the `cursor`-th character, clamped to the end of `text`.
fn byte_offset(text: &str, cursor: usize) -> usize {
    text.char_indices()
        .nth(cursor)
        .map(|(i, _)| i)
        .unwrap_or(text.len())
}

/// Find the mention search open at `cursor`, if any.
///
/// The trigger closest to the cursor wins. The search is dropped when the
/// pending query contains a line break, grows past
/// [`MAX_PENDING_QUERY_CHARS`], or (for users) contains anything other than
/// handle characters.
pub fn detect(text: &str, cursor: usize) -> Option<ActiveSearch> {
    let before = &text[..byte_offset(text, cursor)];

    let user_at = before.rfind(USER_TRIGGER);
    let series_at = before.rfind(SERIES_TRIGGER);

    let (kind, at) = match (user_at, series_at) {
        (Some(u), Some(s)) if s > u => (TriggerKind::Series, s),
        (Some(u), _) => (TriggerKind::User, u),
        (None, Some(s)) => (TriggerKind::Series, s),
        (None, None) => return None,
    };

    let query = &before[at + kind.trigger().len_utf8()..];
    if !kind.accepts(query) {
        return None;
    }

    Some(ActiveSearch {
        kind,
        trigger_at: before[..at].chars().count(),
        query: query.to_string(),
    })
}

/// Result of accepting a candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Insertion {
    pub text: String,
    /// Character offset right after the inserted token and its space.
    pub cursor: usize,
    /// Set when a series was inserted.
    pub series: Option<SeriesRef>,
}

/// The reference token written for `candidate`, trailing space included.
pub fn reference_token(candidate: &MentionCandidate) -> String {
    match candidate {
        MentionCandidate::User(user) => format!("{USER_TRIGGER}{} ", user.mention_handle()),
        MentionCandidate::Series(series) => format!("*{}* ", series.name),
    }
}

/// Replace the `kind` trigger before `cursor` (inclusive) up to `cursor`
/// (exclusive) with the reference token for `candidate`.
///
/// Returns `None` when no such trigger precedes the cursor or when the
/// candidate does not match `kind`.
pub fn insert_candidate(
    text: &str,
    cursor: usize,
    kind: TriggerKind,
    candidate: &MentionCandidate,
) -> Option<Insertion> {
    let series = match (kind, candidate) {
        (TriggerKind::User, MentionCandidate::User(_)) => None,
        (TriggerKind::Series, MentionCandidate::Series(s)) => Some(s.to_ref()),
        _ => return None,
    };

    let split = byte_offset(text, cursor);
    let (before, after) = text.split_at(split);
    let at = before.rfind(kind.trigger())?;
    let prefix = &before[..at];

    let token = reference_token(candidate);
    let cursor = prefix.chars().count() + token.chars().count();

    let mut rewritten = String::with_capacity(prefix.len() + token.len() + after.len());
    rewritten.push_str(prefix);
    rewritten.push_str(&token);
    rewritten.push_str(after);

    Some(Insertion {
        text: rewritten,
        cursor,
        series,
    })
}

// ---------------------------------------------------------------------------
// Dropdown navigation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Down,
    Up,
    Enter,
    Escape,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub enum KeyOutcome {
    /// The selection moved; the key is consumed.
    Moved(usize),
    /// The selected candidate should be inserted.
    Accept(MentionCandidate),
    /// The list was closed; the text is untouched.
    Closed,
    /// Not handled by the list; normal editing applies.
    PassThrough,
}

/// Candidate list backing the mention dropdown.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SuggestionList {
    candidates: Vec<MentionCandidate>,
    selected: usize,
    open: bool,
}

impl SuggestionList {
    /// A freshly filled list opens with the first candidate selected.
    pub fn show(&mut self, candidates: Vec<MentionCandidate>) {
        self.candidates = candidates;
        self.selected = 0;
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn clear(&mut self) {
        self.candidates.clear();
        self.selected = 0;
        self.open = false;
    }

    /// Open and non-empty.
    pub fn is_visible(&self) -> bool {
        self.open && !self.candidates.is_empty()
    }

    pub fn candidates(&self) -> &[MentionCandidate] {
        &self.candidates
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&MentionCandidate> {
        self.candidates.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if !self.candidates.is_empty() {
            self.selected = (self.selected + 1) % self.candidates.len();
        }
    }

    pub fn select_prev(&mut self) {
        let len = self.candidates.len();
        if len > 0 {
            self.selected = (self.selected + len - 1) % len;
        }
    }

    pub fn handle_key(&mut self, key: Key) -> KeyOutcome {
        if !self.is_visible() {
            return KeyOutcome::PassThrough;
        }
        match key {
            Key::Down => {
                self.select_next();
                KeyOutcome::Moved(self.selected)
            }
            Key::Up => {
                self.select_prev();
                KeyOutcome::Moved(self.selected)
            }
            Key::Enter => match self.selected().cloned() {
                Some(candidate) => KeyOutcome::Accept(candidate),
                None => KeyOutcome::PassThrough,
            },
            Key::Escape => {
                self.close();
                KeyOutcome::Closed
            }
            Key::Other => KeyOutcome::PassThrough,
        }
    }
}

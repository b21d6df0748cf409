use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::types::{NewPost, SeriesRef, UserId};

/// An in-progress post.
///
/// The related series is the last series reference picked while composing;
/// it tags the post on submit so badge rules can count it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PostDraft {
    pub content: String,
    pub image_url: Option<String>,
    related_series: Option<SeriesRef>,
}

impl PostDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn related_series(&self) -> Option<&SeriesRef> {
        self.related_series.as_ref()
    }

    /// Last selection wins; returns the reference it replaced.
    pub fn set_related_series(&mut self, series: SeriesRef) -> Option<SeriesRef> {
        self.related_series.replace(series)
    }

    pub fn clear_related_series(&mut self) -> Option<SeriesRef> {
        self.related_series.take()
    }

    /// Build the submission without consuming the draft, so a failed submit
    /// can be retried.
    pub fn to_new_post(&self, author_id: UserId) -> Result<NewPost, ValidationError> {
        let post = NewPost {
            author_id,
            content: self.content.clone(),
            image_url: self.image_url.clone(),
            series: self.related_series.clone(),
        };
        post.validate()?;
        Ok(post)
    }

    /// Forget everything after a successful submit.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

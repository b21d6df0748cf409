//! Lookup collaborators consulted while composing.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{SeriesSummary, UserSummary};

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("Lookup transport error: {0}")]
    Transport(String),

    #[error("Lookup returned status {0}")]
    Status(u16),

    #[error("Malformed lookup response: {0}")]
    Decode(String),

    #[error("Lookup backend error: {0}")]
    Backend(String),
}

/// Profile directory.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Relevance-ordered matches for `query`.
    async fn search_users(&self, query: &str) -> Result<Vec<UserSummary>, LookupError>;
}

/// Series metadata source.
#[async_trait]
pub trait SeriesCatalog: Send + Sync {
    async fn search_series(&self, query: &str) -> Result<Vec<SeriesSummary>, LookupError>;

    /// This week's trending series.
    async fn trending_series(&self) -> Result<Vec<SeriesSummary>, LookupError>;
}

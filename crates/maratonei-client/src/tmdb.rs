//! TMDB v3 client for series metadata.

use async_trait::async_trait;
use maratonei_shared::lookup::{LookupError, SeriesCatalog};
use maratonei_shared::types::{SeriesId, SeriesSummary};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{read_json, ClientError};

pub const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";
pub const PLACEHOLDER_IMAGE_URL: &str =
    "https://placeholder.pics/svg/300x450/DEDEDE/555555/Sem%20Imagem";

/// Full poster/backdrop URL for a TMDB image path.
pub fn image_url(path: Option<&str>) -> String {
    match path {
        Some(path) if !path.is_empty() => format!("{IMAGE_BASE_URL}{path}"),
        _ => PLACEHOLDER_IMAGE_URL.to_string(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

/// `/tv/{id}` response: the search fields plus show-level details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesDetails {
    #[serde(flatten)]
    pub summary: SeriesSummary,
    #[serde(default)]
    pub number_of_seasons: Option<u32>,
    #[serde(default)]
    pub number_of_episodes: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub genres: Vec<Genre>,
}

#[derive(Deserialize)]
struct ResultPage<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Clone)]
pub struct TmdbClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
}

impl TmdbClient {
    pub fn new(api_key: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: TMDB_BASE_URL.to_string(),
            api_key: api_key.into(),
            language: language.into(),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let key = config
            .tmdb_api_key
            .as_deref()
            .ok_or(ClientError::MissingApiKey)?;
        Ok(Self::new(key, config.tmdb_language.clone()))
    }

    /// Point the client at another TMDB-compatible host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        extra: &[(&str, &str)],
    ) -> Result<T, ClientError> {
        let resp = self
            .http
            .get(self.url(path))
            .query(&[
                ("api_key", self.api_key.as_str()),
                ("language", self.language.as_str()),
            ])
            .query(extra)
            .send()
            .await?;
        read_json(resp).await
    }

    /// Series whose name matches `query`. A blank query returns nothing
    /// without a request.
    pub async fn search(&self, query: &str) -> Result<Vec<SeriesSummary>, ClientError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let page: ResultPage<SeriesSummary> =
            self.get("/search/tv", &[("query", query)]).await?;
        debug!(%query, results = page.results.len(), "TMDB search");
        Ok(page.results)
    }

    /// This week's trending series, in TMDB order.
    pub async fn trending(&self) -> Result<Vec<SeriesSummary>, ClientError> {
        let page: ResultPage<SeriesSummary> = self.get("/trending/tv/week", &[]).await?;
        Ok(page.results)
    }

    pub async fn series_details(&self, id: SeriesId) -> Result<SeriesDetails, ClientError> {
        self.get(&format!("/tv/{id}"), &[]).await
    }
}

#[async_trait]
impl SeriesCatalog for TmdbClient {
    async fn search_series(&self, query: &str) -> Result<Vec<SeriesSummary>, LookupError> {
        Ok(self.search(query).await?)
    }

    async fn trending_series(&self) -> Result<Vec<SeriesSummary>, LookupError> {
        Ok(self.trending().await?)
    }
}

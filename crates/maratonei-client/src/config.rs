//! Client configuration loaded from environment variables.

use std::time::Duration;

use maratonei_shared::constants::{DEFAULT_HTTP_PORT, MENTION_DEBOUNCE_MS};

/// Default response language for TMDB.
pub const DEFAULT_TMDB_LANGUAGE: &str = "pt-BR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the Maratonei server, without a trailing slash.
    /// Env: `MARATONEI_SERVER_URL`
    /// Default: `http://localhost:8080`
    pub server_url: String,

    /// TMDB v3 API key. Series lookups are unavailable without it.
    /// Env: `TMDB_API_KEY`
    pub tmdb_api_key: Option<String>,

    /// Env: `TMDB_LANGUAGE`
    /// Default: `pt-BR`
    pub tmdb_language: String,

    /// Quiet period before a mention lookup is sent.
    /// Env: `MENTION_DEBOUNCE_MS`
    /// Default: 300 ms
    pub mention_debounce: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: format!("http://localhost:{DEFAULT_HTTP_PORT}"),
            tmdb_api_key: None,
            tmdb_language: DEFAULT_TMDB_LANGUAGE.to_string(),
            mention_debounce: Duration::from_millis(MENTION_DEBOUNCE_MS),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(url) = var("MARATONEI_SERVER_URL") {
            let url = url.trim_end_matches('/');
            if !url.is_empty() {
                config.server_url = url.to_string();
            }
        }

        if let Some(key) = var("TMDB_API_KEY") {
            if !key.is_empty() {
                config.tmdb_api_key = Some(key);
            }
        }

        if let Some(language) = var("TMDB_LANGUAGE") {
            if !language.is_empty() {
                config.tmdb_language = language;
            }
        }

        if let Some(ms) = var("MENTION_DEBOUNCE_MS") {
            match ms.parse::<u64>() {
                Ok(ms) => config.mention_debounce = Duration::from_millis(ms),
                Err(_) => tracing::warn!(value = %ms, "Invalid MENTION_DEBOUNCE_MS, using default"),
            }
        }

        config
    }
}

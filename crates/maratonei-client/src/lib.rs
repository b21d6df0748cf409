//! # maratonei-client
//!
//! Client-side plumbing for the Maratonei composer: HTTP clients for the
//! Maratonei server and the TMDB metadata API, the debounced suggestion
//! fetcher behind the mention dropdown, and the composer state machine that
//! ties text edits, suggestions and submission together.

pub mod api;
pub mod composer;
pub mod config;
pub mod error;
pub mod search;
pub mod tmdb;

pub use error::ClientError;

use tracing_subscriber::{fmt, EnvFilter};

/// Install the global tracing subscriber. Respects `RUST_LOG`.
///
/// Calling it twice is harmless; the second subscriber is ignored.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("maratonei_client=debug,warn"));

    let _ = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();

    tracing::debug!("Maratonei client tracing initialised");
}

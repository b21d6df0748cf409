//! # maratonei-store
//!
//! SQLite persistence for Maratonei. The crate exposes a synchronous
//! `Database` handle that wraps a `rusqlite::Connection` and provides typed
//! CRUD helpers for every domain model: profiles, follows, posts with likes
//! and comments, notifications, stamps and the watchlist.

pub mod database;
pub mod follows;
pub mod migrations;
pub mod models;
pub mod notifications;
pub mod posts;
pub mod profiles;
pub mod stamps;
pub mod watchlist;

mod codec;
mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;

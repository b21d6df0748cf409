//! # maratonei-shared
//!
//! Domain types and pure composer logic shared by the Maratonei server and
//! client: ids and records, validation errors, mention detection and
//! insertion, reference rendering, and the post draft.

pub mod constants;
pub mod draft;
pub mod error;
pub mod lookup;
pub mod mention;
pub mod render;
pub mod types;

pub use error::ValidationError;

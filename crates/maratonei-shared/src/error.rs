use thiserror::Error;

/// Rejections raised before any collaborator is called.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Content must not be empty")]
    EmptyContent,

    #[error("A post_count requirement needs a linked series")]
    MissingSeriesLink,

    #[error("Requirement threshold must be at least 1")]
    InvalidThreshold,

    #[error("Stamp name must not be empty")]
    EmptyName,

    #[error("Rating must be between 1 and 3, got {0}")]
    InvalidRating(u8),

    #[error("Users cannot follow themselves")]
    SelfFollow,

    #[error("Invalid e-mail address: {0}")]
    InvalidEmail(String),

    #[error("Unknown {field}: {value}")]
    UnknownVariant { field: &'static str, value: String },
}

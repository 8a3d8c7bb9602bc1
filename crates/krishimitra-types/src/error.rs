//! Error types for krishimitra-types.

use thiserror::Error;

/// Errors that can occur when parsing record tags from text.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ParseError {
    /// The advisory category is not one of weather, pest, disease, general.
    #[error("Unknown advisory category: {0}")]
    UnknownCategory(String),

    /// The pending action kind is not a known tag.
    #[error("Unknown action kind: {0}")]
    UnknownActionKind(String),
}

/// Result type alias using krishimitra-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;

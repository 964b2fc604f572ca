//! Error types for the masking data model.
//!
//! Messages name placeholders only. Original values never appear in an
//! error string.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaceholderError {
    #[error("Malformed placeholder token: {0}")]
    Malformed(String),

    #[error("Placeholder category is empty")]
    EmptyCategory,

    #[error("Placeholder category contains characters outside A-Z and '_': {0}")]
    InvalidCategory(String),

    #[error("Placeholder index must start at 1")]
    ZeroIndex,

    #[error("Placeholder {0} is already bound to a different value")]
    Conflict(String),

    #[error("Value is already masked as {existing}, refusing second placeholder {incoming}")]
    DuplicateOriginal { existing: String, incoming: String },
}

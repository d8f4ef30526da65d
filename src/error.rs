//! Error types for the fallible edges of the crate.
//!
//! The layout passes themselves never fail: inconsistencies found while
//! laying out are logged and skipped. Errors only come from loading
//! configuration or score data and from exporting results.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("invalid style: {0}")]
    InvalidStyle(String),

    #[error("invalid score: {0}")]
    InvalidScore(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type LayoutResult<T> = Result<T, LayoutError>;

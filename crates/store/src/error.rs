//! Store error types.

use thiserror::Error;

/// Errors surfaced by a remote store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid document path: {0}")]
    InvalidPath(String),

    #[error("Remote store backend error: {0}")]
    Backend(String),
}

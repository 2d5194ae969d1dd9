//! Domain error types.

use thiserror::Error;

/// Errors produced while converting between documents and domain models.
///
/// A malformed stored document fails closed: no partial entity is ever
/// produced from a document missing required fields.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Malformed document: {0}")]
    Malformed(String),

    #[error("Document encoding failed: {0}")]
    Encode(String),
}

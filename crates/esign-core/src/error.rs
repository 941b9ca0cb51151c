//! Error taxonomy for the signing core
//!
//! Validation and state rejections never partially apply and are safe to
//! show to the acting party; storage problems carry no actor-facing text.

use shared_pdf::PdfError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed input: bad geometry, invalid email, missing required
    /// value at completion time.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The entity is not in a status that permits the requested action.
    #[error("{0}")]
    State(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Object-store or persistence failure.
    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Pdf(#[from] PdfError),
}

impl CoreError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

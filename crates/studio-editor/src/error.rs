//! Error types for loading documents into a session.

use studio_core::Diagnostic;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StudioError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid document: {count} structural error(s), first: {first}")]
    InvalidDocument { count: usize, first: String },
}

impl StudioError {
    /// Summarize error-level validator findings.
    pub(crate) fn invalid(errors: &[Diagnostic]) -> Self {
        StudioError::InvalidDocument {
            count: errors.len(),
            first: errors
                .first()
                .map(|d| format!("[{}] {}", d.rule, d.message))
                .unwrap_or_default(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StudioError>;

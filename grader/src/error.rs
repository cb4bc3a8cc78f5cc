//! Error types surfaced by the grading pipeline.

use thiserror::Error;

/// Errors that can abort a grading request.
///
/// Degraded file extraction is deliberately absent: a file that cannot be
/// read yields a placeholder string in the extracted text, never an error.
#[derive(Debug, Error)]
pub enum GradeError {
    /// A required input slot was empty after combining pasted and file text.
    #[error("{0}")]
    Validation(String),

    /// The user's free daily limit is already spent.
    #[error("Free plan daily limit reached. Upgrade to Pro for unlimited grading.")]
    QuotaExceeded { uses_today: i32, limit: i32 },

    /// Every configured model candidate failed; carries the last failure.
    #[error("Model call failed: {0}")]
    ModelInvocation(String),

    /// Database failure while gating or recording usage.
    #[error("Database error: {0}")]
    Db(#[from] sea_orm::DbErr),
}

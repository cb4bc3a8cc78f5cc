//! # Grader Library
//!
//! This crate provides the core logic for rubric-based grading of student
//! submissions with an LLM. It combines pasted text and uploaded files into
//! canonical rubric and submission blocks, assembles them into a grading
//! instruction, invokes a model deterministically with fallback, and returns
//! a sanitized plain-text report.
//!
//! ## Key Concepts
//! - **GradingJob**: One grading request for a single user, built up from
//!   pasted text, optional file uploads, and an optional custom template.
//! - **Quota Gate**: Every run is charged against the user's daily quota
//!   before any extraction or model work happens.
//! - **Invokers**: Pluggable strategies for executing the assembled
//!   instruction (the default talks to an OpenAI-compatible API).

pub mod combine;
pub mod error;
pub mod extract;
pub mod model;
pub mod prompt;
pub mod sanitize;

use common::config::AppConfig;
use db::models::user::{self, UsageDecision};
use sea_orm::DatabaseConnection;
use serde::Serialize;

use crate::error::GradeError;
use crate::model::{ModelInvoker, OpenAiInvoker};

/// An uploaded file: the declared filename (used for extension dispatch)
/// and its raw bytes.
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            bytes,
        }
    }
}

/// The finished grading report together with the quota state it was
/// charged against.
#[derive(Debug, Clone, Serialize)]
pub struct GradingResult {
    /// Sanitized plain-text report.
    pub result: String,
    /// The user's plan at the time of grading.
    pub plan: user::Plan,
    /// Gradings charged today, including this one.
    pub uses_today: i32,
    /// Daily limit in force; `None` for unlimited plans.
    pub limit: Option<i32>,
}

/// Represents one grading request for a single user.
///
/// Inputs arrive in two slots, rubric and submission. Each slot accepts
/// pasted text, an uploaded file, or both; at least one source per slot
/// must yield text or the job is rejected.
pub struct GradingJob<'a> {
    rubric_text: String,
    submission_text: String,
    rubric_file: Option<UploadedFile>,
    submission_file: Option<UploadedFile>,
    template: Option<String>,
    invoker: Box<dyn ModelInvoker + 'a>,
}

impl Default for GradingJob<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> GradingJob<'a> {
    /// Creates an empty job wired to the configured OpenAI-compatible
    /// invoker.
    pub fn new() -> Self {
        Self {
            rubric_text: String::new(),
            submission_text: String::new(),
            rubric_file: None,
            submission_file: None,
            template: None,
            invoker: Box::new(OpenAiInvoker::from_config()),
        }
    }

    /// Sets the pasted rubric text.
    pub fn with_rubric_text(mut self, text: impl Into<String>) -> Self {
        self.rubric_text = text.into();
        self
    }

    /// Sets the pasted submission text.
    pub fn with_submission_text(mut self, text: impl Into<String>) -> Self {
        self.submission_text = text.into();
        self
    }

    /// Attaches an uploaded rubric file.
    pub fn with_rubric_file(mut self, file: UploadedFile) -> Self {
        self.rubric_file = Some(file);
        self
    }

    /// Attaches an uploaded submission file.
    pub fn with_submission_file(mut self, file: UploadedFile) -> Self {
        self.submission_file = Some(file);
        self
    }

    /// Overrides the grading instruction template. A blank template falls
    /// back to the built-in one.
    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = Some(template.into());
        self
    }

    /// Replaces the model invoker strategy.
    pub fn with_invoker<I: ModelInvoker + 'a>(mut self, invoker: I) -> Self {
        self.invoker = Box::new(invoker);
        self
    }

    /// Runs the full grading pipeline for `user_id`.
    ///
    /// # Steps
    /// 1. Charges the user's daily quota; a denied request stops here.
    /// 2. Extracts text from any uploaded files (degrading, never failing).
    /// 3. Combines pasted and extracted text per slot and validates that
    ///    both slots are non-empty.
    /// 4. Assembles the instruction with brace-safe substitution.
    /// 5. Invokes the model candidates in order.
    /// 6. Sanitizes the raw model output into plain text.
    ///
    /// The quota is charged up front, so a request that later fails
    /// validation or model invocation has still consumed one use.
    pub async fn grade(
        self,
        db: &DatabaseConnection,
        user_id: i64,
    ) -> Result<GradingResult, GradeError> {
        let limit = AppConfig::global().free_daily_limit;
        let usage = match user::Model::record_usage(db, user_id, limit).await? {
            UsageDecision::Granted(snapshot) => snapshot,
            UsageDecision::Denied { uses_today, limit } => {
                return Err(GradeError::QuotaExceeded { uses_today, limit });
            }
        };

        let rubric_file_text = self
            .rubric_file
            .as_ref()
            .map(|f| extract::extract_text(&f.filename, &f.bytes))
            .unwrap_or_default();
        let submission_file_text = self
            .submission_file
            .as_ref()
            .map(|f| extract::extract_text(&f.filename, &f.bytes))
            .unwrap_or_default();

        let rubric = combine::combine(&self.rubric_text, &rubric_file_text);
        let submission = combine::combine(&self.submission_text, &submission_file_text);

        if rubric.is_empty() {
            return Err(GradeError::Validation(
                "Rubric is required. Paste rubric text or upload a rubric file.".to_string(),
            ));
        }
        if submission.is_empty() {
            return Err(GradeError::Validation(
                "Student work is required. Paste student text or upload a student file."
                    .to_string(),
            ));
        }

        let template = self
            .template
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(prompt::DEFAULT_PROMPT_TEMPLATE);

        let instruction = prompt::assemble(template, &rubric, &submission);
        let raw = self.invoker.invoke(&instruction).await?;
        let result = sanitize::sanitize(&raw);

        Ok(GradingResult {
            result,
            plan: usage.plan,
            uses_today: usage.uses_today,
            limit: usage.limit,
        })
    }
}

/// Convenience accessor kept close to [`GradingResult`] so API layers can
/// report remaining quota without recomputing it.
impl GradingResult {
    pub fn remaining(&self) -> Option<i32> {
        self.limit.map(|limit| (limit - self.uses_today).max(0))
    }
}

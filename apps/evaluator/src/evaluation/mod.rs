// Interview evaluation: prompt building, completion polling, persistence.
// All completion calls go through llm_client::CompletionService.

pub mod builder;
pub mod handlers;
pub mod persister;
pub mod poller;
pub mod prompts;
pub mod rubrics;
pub mod schema;
pub mod store;

use thiserror::Error;
use uuid::Uuid;

use crate::llm_client::LlmError;
use crate::models::interview::InterviewMode;

/// Errors raised by the evaluation steps. `is_retryable` drives the step runner.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("Interview {interview_id} not found for user {user_id}")]
    InterviewNotFound { interview_id: Uuid, user_id: Uuid },

    #[error("Interview transcript is empty")]
    EmptyTranscript,

    #[error("Missing context for {mode} interview: {detail}")]
    MissingContext { mode: InterviewMode, detail: String },

    #[error("Completion request failed: {0}")]
    Upstream(#[from] LlmError),

    #[error("Completion failed: {0}")]
    CompletionFailed(String),

    #[error("Completion was refused: {0}")]
    Refusal(String),

    #[error("Completion contained no parseable JSON evaluation")]
    NoJsonPayload,

    #[error("Timed out waiting for completion after {attempts} polls")]
    Timeout { attempts: u32 },

    #[error("Expected {expected} skills in evaluation, got {actual}")]
    SkillCountMismatch { expected: usize, actual: usize },

    #[error("Verdict {verdict:?} is not allowed for {mode} interviews")]
    InvalidVerdict { mode: InterviewMode, verdict: String },

    #[error("Score {score} for skill {skill:?} is not on the 1-4 half-point scale")]
    InvalidScore { skill: String, score: f64 },

    #[error("Job-specific evaluation is missing the company fit assessment")]
    MissingCompanyFit,

    #[error("Storage error: {0}")]
    Storage(anyhow::Error),

    #[error("Internal error: {0}")]
    Internal(anyhow::Error),
}

impl EvaluationError {
    /// Precondition and shape errors fail the job immediately; upstream,
    /// timeout and storage errors may succeed on another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            EvaluationError::Upstream(_)
            | EvaluationError::CompletionFailed(_)
            | EvaluationError::Refusal(_)
            | EvaluationError::NoJsonPayload
            | EvaluationError::Timeout { .. }
            | EvaluationError::Storage(_) => true,
            EvaluationError::InterviewNotFound { .. }
            | EvaluationError::EmptyTranscript
            | EvaluationError::MissingContext { .. }
            | EvaluationError::SkillCountMismatch { .. }
            | EvaluationError::InvalidVerdict { .. }
            | EvaluationError::InvalidScore { .. }
            | EvaluationError::MissingCompanyFit
            | EvaluationError::Internal(_) => false,
        }
    }
}

// Background evaluation jobs: trigger/failure events, step checkpoints,
// the step runner and the Redis-backed queue that feeds it.

pub mod checkpoints;
pub mod queue;
pub mod runner;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::interview::InterviewMode;

/// Emitted when a transcript is ready to be scored. `job_id` keys the step checkpoints,
/// so redelivering the same event resumes rather than restarts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationRequested {
    pub job_id: Uuid,
    pub interview_id: Uuid,
    pub user_id: Uuid,
    pub interview_mode: InterviewMode,
}

/// Emitted once a job has exhausted its retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluationFailed {
    pub job_id: Uuid,
    pub interview_id: Uuid,
    pub user_id: Uuid,
    pub error: String,
}

impl EvaluationFailed {
    pub fn from_request(event: &EvaluationRequested, error: impl ToString) -> Self {
        Self {
            job_id: event.job_id,
            interview_id: event.interview_id,
            user_id: event.user_id,
            error: error.to_string(),
        }
    }
}

//! Result Persister and Failure Handler: the only two writers of an interview's
//! evaluation fields.
//!
//! The persister is a plain overwrite, so a retried step stores the same document.
//! The failure handler only writes while the interview is still `pending`, so a
//! redelivered failure signal can never clobber a completed evaluation.

use tracing::{info, warn};
use uuid::Uuid;

use crate::evaluation::store::InterviewStore;
use crate::evaluation::EvaluationError;
use crate::models::evaluation::{EvaluatedJob, Evaluation, StoredEvaluation};
use crate::models::interview::{InterviewMode, InterviewRecord};

/// Longest error message written onto an interview row.
const MAX_ERROR_MESSAGE_CHARS: usize = 1000;

/// Attaches what was practiced (question, or job and questions asked) to the evaluation.
pub fn merge_context(evaluation: Evaluation, record: &InterviewRecord) -> StoredEvaluation {
    let mut stored = StoredEvaluation {
        evaluation,
        question: None,
        job_context: None,
        questions_asked: None,
    };
    match record.mode {
        InterviewMode::Full => {}
        InterviewMode::QuickQuestion => stored.question = record.question.clone(),
        InterviewMode::JobSpecific => {
            if let Some(job) = &record.job_context {
                stored.job_context = Some(EvaluatedJob::from(job));
                stored.questions_asked = Some(job.generated_questions.clone());
            }
        }
    }
    if record.mode != InterviewMode::JobSpecific {
        stored.evaluation.company_fit_assessment = None;
    }
    stored
}

/// Writes the evaluation onto the interview. Returns the number of rows updated;
/// zero means the interview does not exist for `user_id` or has already failed,
/// and nothing was written.
pub async fn persist_evaluation(
    store: &dyn InterviewStore,
    interview_id: Uuid,
    user_id: Uuid,
    stored: &StoredEvaluation,
) -> Result<u64, EvaluationError> {
    let document =
        serde_json::to_value(stored).map_err(|e| EvaluationError::Internal(e.into()))?;

    let rows = store
        .save_evaluation(interview_id, user_id, &document)
        .await
        .map_err(EvaluationError::Storage)?;

    if rows == 0 {
        warn!(
            interview_id = %interview_id,
            user_id = %user_id,
            "Evaluation not persisted: no open interview owned by this user"
        );
    } else {
        info!(
            interview_id = %interview_id,
            verdict = %stored.evaluation.overall_verdict,
            "Evaluation persisted"
        );
    }
    Ok(rows)
}

/// Marks the interview `failed` with `message`. Returns whether a row changed.
pub async fn handle_failure(
    store: &dyn InterviewStore,
    interview_id: Uuid,
    user_id: Uuid,
    message: &str,
) -> anyhow::Result<bool> {
    let message = truncate_message(message);
    let rows = store.mark_failed(interview_id, user_id, &message).await?;

    if rows == 0 {
        info!(
            interview_id = %interview_id,
            "Failure not recorded: interview is no longer pending"
        );
    } else {
        warn!(interview_id = %interview_id, error = %message, "Evaluation marked failed");
    }
    Ok(rows > 0)
}

fn truncate_message(message: &str) -> String {
    let trimmed = message.trim();
    if trimmed.chars().count() <= MAX_ERROR_MESSAGE_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(MAX_ERROR_MESSAGE_CHARS).collect();
    out.push('…');
    out
}

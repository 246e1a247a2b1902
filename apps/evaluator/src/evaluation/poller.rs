//! Completion Poller: waits for a submitted completion to finish, then extracts
//! and shape-checks the evaluation it contains.
//!
//! The loop is a plain fixed-interval poll with an attempt bound. Exceeding the
//! bound is a timeout error; nothing here ever returns an empty evaluation.

use std::time::Duration;

use tracing::debug;

use crate::evaluation::EvaluationError;
use crate::evaluation::schema::SCORE_VALUES;
use crate::llm_client::{strip_json_fences, CompletionResponse, CompletionService, ResponseStatus};
use crate::models::evaluation::Evaluation;
use crate::models::interview::InterviewMode;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);
const DEFAULT_MAX_ATTEMPTS: u32 = 60;

#[derive(Debug, Clone, Copy)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

/// Polls until the response is terminal. `completed` is returned as-is;
/// `failed`, `incomplete` and `cancelled` become `CompletionFailed`.
pub async fn poll_until_complete(
    service: &dyn CompletionService,
    response_id: &str,
    config: &PollConfig,
) -> Result<CompletionResponse, EvaluationError> {
    for attempt in 1..=config.max_attempts {
        let response = service.retrieve(response_id).await?;

        match response.status {
            ResponseStatus::Completed => {
                debug!("Completion {response_id} finished after {attempt} polls");
                return Ok(response);
            }
            status if status.is_terminal() => {
                return Err(EvaluationError::CompletionFailed(response.failure_reason()));
            }
            status => {
                debug!(
                    "Completion {response_id} is {status:?} (poll {attempt}/{})",
                    config.max_attempts
                );
            }
        }

        if attempt < config.max_attempts {
            tokio::time::sleep(config.interval).await;
        }
    }

    Err(EvaluationError::Timeout {
        attempts: config.max_attempts,
    })
}

/// Pulls the evaluation out of a completed response.
///
/// A refusal anywhere in the content fails extraction. Otherwise the first content
/// item whose text parses as an `Evaluation` wins and is then shape-checked.
pub fn extract_evaluation(
    response: &CompletionResponse,
    mode: InterviewMode,
    expected_skill_count: usize,
) -> Result<Evaluation, EvaluationError> {
    if let Some(refusal) = response.refusal() {
        return Err(EvaluationError::Refusal(refusal.to_string()));
    }

    let evaluation = response
        .content_items()
        .filter_map(|item| item.text.as_deref())
        .find_map(|text| serde_json::from_str::<Evaluation>(strip_json_fences(text)).ok())
        .ok_or(EvaluationError::NoJsonPayload)?;

    validate_shape(&evaluation, mode, expected_skill_count)?;
    Ok(evaluation)
}

/// Fenced or non-strict output bypasses the schema, so the closed sets are
/// re-checked here.
fn validate_shape(
    evaluation: &Evaluation,
    mode: InterviewMode,
    expected_skill_count: usize,
) -> Result<(), EvaluationError> {
    if evaluation.skills.len() != expected_skill_count {
        return Err(EvaluationError::SkillCountMismatch {
            expected: expected_skill_count,
            actual: evaluation.skills.len(),
        });
    }

    if let Some(skill) = evaluation
        .skills
        .iter()
        .find(|s| !SCORE_VALUES.contains(&s.score))
    {
        return Err(EvaluationError::InvalidScore {
            skill: skill.skill_name.clone(),
            score: skill.score,
        });
    }

    if !mode.verdicts().contains(&evaluation.overall_verdict.as_str()) {
        return Err(EvaluationError::InvalidVerdict {
            mode,
            verdict: evaluation.overall_verdict.clone(),
        });
    }

    if mode == InterviewMode::JobSpecific
        && evaluation
            .company_fit_assessment
            .as_deref()
            .map_or(true, |fit| fit.trim().is_empty())
    {
        return Err(EvaluationError::MissingCompanyFit);
    }

    Ok(())
}

/// Poll, then extract.
pub async fn await_evaluation(
    service: &dyn CompletionService,
    response_id: &str,
    mode: InterviewMode,
    expected_skill_count: usize,
    config: &PollConfig,
) -> Result<Evaluation, EvaluationError> {
    let response = poll_until_complete(service, response_id, config).await?;
    extract_evaluation(&response, mode, expected_skill_count)
}

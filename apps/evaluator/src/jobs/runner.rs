//! Evaluation job runner. Executes the five evaluation steps in order.
//!
//! Flow: load transcript → build prompt → submit completion → poll completion →
//!       persist result.
//!
//! Every step goes through `run_step`, which returns a stored checkpoint when one
//! exists and otherwise runs the step (retrying retryable errors per `RetryPolicy`)
//! and stores its output. Replaying a job therefore never re-submits a completion
//! whose handle was already checkpointed.
//!
//! The runner never writes `failed`. A job that returns `Err` is reported as an
//! `EvaluationFailed` event and handled by `handle_job_failure`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::archive::EvaluationArchive;
use crate::evaluation::builder::{build_prompt, BuiltPrompt, ModeContext};
use crate::evaluation::persister::{handle_failure, merge_context, persist_evaluation};
use crate::evaluation::poller::{await_evaluation, PollConfig};
use crate::evaluation::store::InterviewStore;
use crate::evaluation::EvaluationError;
use crate::jobs::checkpoints::CheckpointStore;
use crate::jobs::{EvaluationFailed, EvaluationRequested};
use crate::llm_client::{CompletionService, MODEL};
use crate::models::evaluation::Evaluation;
use crate::models::interview::InterviewRecord;

const DEFAULT_STEP_RETRIES: u32 = 1;
const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// How often a failing step is re-attempted before the job gives up.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_STEP_RETRIES,
            delay: DEFAULT_RETRY_DELAY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    LoadTranscript,
    BuildPrompt,
    SubmitCompletion,
    PollCompletion,
    PersistResult,
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Step::LoadTranscript => "load-transcript",
            Step::BuildPrompt => "build-prompt",
            Step::SubmitCompletion => "submit-completion",
            Step::PollCompletion => "poll-completion",
            Step::PersistResult => "persist-result",
        }
    }
}

#[derive(Clone)]
pub struct EvaluationJob {
    interviews: Arc<dyn InterviewStore>,
    checkpoints: Arc<dyn CheckpointStore>,
    completions: Arc<dyn CompletionService>,
    archive: Option<EvaluationArchive>,
    poll: PollConfig,
    retry: RetryPolicy,
}

impl EvaluationJob {
    pub fn new(
        interviews: Arc<dyn InterviewStore>,
        checkpoints: Arc<dyn CheckpointStore>,
        completions: Arc<dyn CompletionService>,
    ) -> Self {
        Self {
            interviews,
            checkpoints,
            completions,
            archive: None,
            poll: PollConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_archive(mut self, archive: EvaluationArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn interviews(&self) -> &Arc<dyn InterviewStore> {
        &self.interviews
    }

    /// Runs the job to completion. Returns the number of interview rows updated.
    pub async fn run(&self, event: &EvaluationRequested) -> Result<u64, EvaluationError> {
        let job_id = event.job_id;
        info!(
            job_id = %job_id,
            interview_id = %event.interview_id,
            mode = %event.interview_mode,
            "Starting interview evaluation"
        );

        // Step 1: Load transcript and context
        let interviews = self.interviews.as_ref();
        let record: InterviewRecord = self
            .run_step(event, Step::LoadTranscript, move || async move {
                interviews
                    .load_interview(event.interview_id, event.user_id)
                    .await
                    .map_err(EvaluationError::Storage)?
                    .ok_or(EvaluationError::InterviewNotFound {
                        interview_id: event.interview_id,
                        user_id: event.user_id,
                    })
            })
            .await?;

        if record.mode != event.interview_mode {
            warn!(
                job_id = %job_id,
                "Event mode {} differs from stored mode {}; using stored mode",
                event.interview_mode, record.mode
            );
        }

        // Step 2: Build prompt
        let record_ref = &record;
        let built: BuiltPrompt = self
            .run_step(event, Step::BuildPrompt, move || async move {
                let context = ModeContext::from_record(record_ref)?;
                build_prompt(&record_ref.transcript, &context)
            })
            .await?;

        // Step 3: Submit completion
        let completions = self.completions.as_ref();
        let built_ref = &built;
        let response_id: String = self
            .run_step(event, Step::SubmitCompletion, move || async move {
                completions
                    .submit(
                        &built_ref.prompt,
                        &built_ref.system,
                        &built_ref.schema,
                        &built_ref.schema_name,
                    )
                    .await
                    .map_err(EvaluationError::from)
            })
            .await?;
        info!(job_id = %job_id, response_id = %response_id, "Completion submitted");

        // Step 4: Poll until done, extract and validate
        let poll = &self.poll;
        let response_ref = response_id.as_str();
        let evaluation: Evaluation = self
            .run_step(event, Step::PollCompletion, move || async move {
                await_evaluation(
                    completions,
                    response_ref,
                    built_ref.mode,
                    built_ref.expected_skill_count,
                    poll,
                )
                .await
            })
            .await?;

        self.archive_best_effort(event, &built, &response_id, &evaluation)
            .await;

        // Step 5: Persist
        let stored = merge_context(evaluation, &record);
        let stored_ref = &stored;
        let rows: u64 = self
            .run_step(event, Step::PersistResult, move || async move {
                persist_evaluation(interviews, event.interview_id, event.user_id, stored_ref).await
            })
            .await?;

        info!(
            job_id = %job_id,
            interview_id = %event.interview_id,
            verdict = %stored.evaluation.overall_verdict,
            "Interview evaluation finished"
        );
        Ok(rows)
    }

    /// Runs one step with checkpointing and retries.
    async fn run_step<T, F, Fut>(
        &self,
        event: &EvaluationRequested,
        step: Step,
        f: F,
    ) -> Result<T, EvaluationError>
    where
        T: Serialize + DeserializeOwned,
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, EvaluationError>>,
    {
        let job_id = event.job_id;

        if let Some(saved) = self
            .checkpoints
            .load(job_id, step.name())
            .await
            .map_err(EvaluationError::Storage)?
        {
            debug!(job_id = %job_id, step = step.name(), "Replaying checkpointed step");
            return serde_json::from_value(saved).map_err(|e| EvaluationError::Internal(e.into()));
        }

        let mut retries = 0;
        let output = loop {
            match f().await {
                Ok(output) => break output,
                Err(e) if e.is_retryable() && retries < self.retry.max_retries => {
                    retries += 1;
                    warn!(
                        job_id = %job_id,
                        step = step.name(),
                        "Step failed ({e}); retry {retries}/{} in {}ms",
                        self.retry.max_retries,
                        self.retry.delay.as_millis()
                    );
                    tokio::time::sleep(self.retry.delay).await;
                }
                Err(e) => {
                    warn!(job_id = %job_id, step = step.name(), "Step failed: {e}");
                    return Err(e);
                }
            }
        };

        let value = serde_json::to_value(&output).map_err(|e| EvaluationError::Internal(e.into()))?;
        self.checkpoints
            .save(job_id, step.name(), &value)
            .await
            .map_err(EvaluationError::Storage)?;

        debug!(job_id = %job_id, step = step.name(), "Step completed");
        Ok(output)
    }

    async fn archive_best_effort(
        &self,
        event: &EvaluationRequested,
        built: &BuiltPrompt,
        response_id: &str,
        evaluation: &Evaluation,
    ) {
        let Some(archive) = &self.archive else {
            return;
        };
        let key = EvaluationArchive::key(event.user_id, event.interview_id, event.job_id);
        let document = json!({
            "jobId": event.job_id,
            "interviewId": event.interview_id,
            "mode": built.mode,
            "model": MODEL,
            "responseId": response_id,
            "schemaName": built.schema_name,
            "system": built.system,
            "prompt": built.prompt,
            "evaluation": evaluation,
        });
        if let Err(e) = archive.put(&key, &document).await {
            warn!(job_id = %event.job_id, "Failed to archive evaluation: {e:#}");
        }
    }
}

/// The Failure Handler entry point: records a terminal failure on the interview.
pub async fn handle_job_failure(
    interviews: &dyn InterviewStore,
    failed: &EvaluationFailed,
) -> anyhow::Result<bool> {
    handle_failure(interviews, failed.interview_id, failed.user_id, &failed.error).await
}

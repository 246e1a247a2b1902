//! Redis-backed evaluation queue.
//!
//! Two lists: `evaluation:requested` carries trigger events to the worker, and
//! `evaluation:failed` carries failure signals to the failure listener. A pop moves
//! the payload onto the list's `:processing` twin (`BLMOVE`); it is removed from
//! there only once the event has been fully handled. Whatever a dead worker left
//! on a processing list is moved back when the next worker starts, so one worker
//! process per Redis instance is assumed.
//!
//! A per-interview claim key, holding the job id, keeps at most one evaluation in
//! flight for each interview. It is released only after the job's terminal status
//! has been written.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::evaluation::store::InterviewStore;
use crate::jobs::runner::{handle_job_failure, EvaluationJob};
use crate::jobs::{EvaluationFailed, EvaluationRequested};

pub const REQUESTED_QUEUE: &str = "evaluation:requested";
pub const REQUESTED_PROCESSING: &str = "evaluation:requested:processing";
pub const FAILED_QUEUE: &str = "evaluation:failed";
pub const FAILED_PROCESSING: &str = "evaluation:failed:processing";

/// Blocking-pop timeout; bounds how long a loop waits before re-checking its connection.
const POP_TIMEOUT_SECS: u64 = 5;
const RECONNECT_DELAY: Duration = Duration::from_secs(1);
const MAX_CONCURRENT_JOBS: usize = 8;

// Deletes the claim only while it still names the releasing job.
const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
end
return 0
"#;

/// Queue operations shared by the HTTP trigger, the worker and the failure listener.
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Claims the interview for `job_id`. `false` if another evaluation holds it.
    async fn claim(&self, interview_id: Uuid, job_id: Uuid) -> Result<bool>;

    /// Releases the claim if `job_id` still holds it.
    async fn release(&self, interview_id: Uuid, job_id: Uuid) -> Result<()>;

    async fn enqueue(&self, event: &EvaluationRequested) -> Result<()>;

    async fn publish_failure(&self, failed: &EvaluationFailed) -> Result<()>;
}

#[derive(Clone)]
pub struct EvaluationQueue {
    client: redis::Client,
    claim_ttl: Duration,
}

impl EvaluationQueue {
    pub fn new(client: redis::Client, claim_ttl: Duration) -> Self {
        Self { client, claim_ttl }
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .context("Failed to connect to Redis")
    }

    pub fn claim_key(interview_id: Uuid) -> String {
        format!("evaluation:inflight:{interview_id}")
    }

    async fn push(&self, queue: &str, payload: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("LPUSH")
            .arg(queue)
            .arg(payload)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    /// Drops a handled payload from its processing list.
    async fn acknowledge(&self, processing: &str, payload: &str) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::cmd("LREM")
            .arg(processing)
            .arg(1)
            .arg(payload)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    /// Moves payloads a previous worker left on `processing` back to the consuming
    /// end of `queue`, oldest first.
    async fn requeue_orphans(&self, queue: &str, processing: &str) -> Result<usize> {
        let mut conn = self.connection().await?;
        let mut moved = 0;
        loop {
            let payload: Option<String> = redis::cmd("LMOVE")
                .arg(processing)
                .arg(queue)
                .arg("LEFT")
                .arg("RIGHT")
                .query_async(&mut conn)
                .await?;
            if payload.is_none() {
                return Ok(moved);
            }
            moved += 1;
        }
    }
}

#[async_trait]
impl JobQueue for EvaluationQueue {
    async fn claim(&self, interview_id: Uuid, job_id: Uuid) -> Result<bool> {
        let mut conn = self.connection().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(Self::claim_key(interview_id))
            .arg(job_id.to_string())
            .arg("NX")
            .arg("EX")
            .arg(self.claim_ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    async fn release(&self, interview_id: Uuid, job_id: Uuid) -> Result<()> {
        let mut conn = self.connection().await?;
        redis::Script::new(RELEASE_SCRIPT)
            .key(Self::claim_key(interview_id))
            .arg(job_id.to_string())
            .invoke_async::<_, i64>(&mut conn)
            .await?;
        Ok(())
    }

    async fn enqueue(&self, event: &EvaluationRequested) -> Result<()> {
        self.push(REQUESTED_QUEUE, &serde_json::to_string(event)?)
            .await
    }

    async fn publish_failure(&self, failed: &EvaluationFailed) -> Result<()> {
        self.push(FAILED_QUEUE, &serde_json::to_string(failed)?).await
    }
}

/// Waits up to `POP_TIMEOUT_SECS` for a payload and parks it on `processing`.
async fn pop(
    conn: &mut MultiplexedConnection,
    queue: &str,
    processing: &str,
) -> Result<Option<String>> {
    Ok(redis::cmd("BLMOVE")
        .arg(queue)
        .arg(processing)
        .arg("RIGHT")
        .arg("LEFT")
        .arg(POP_TIMEOUT_SECS)
        .query_async(conn)
        .await?)
}

/// Requeues orphans once per process; retried on every reconnect until it succeeds.
async fn recover_once(queue: &EvaluationQueue, recovered: &mut bool, list: &str, processing: &str) {
    if *recovered {
        return;
    }
    match queue.requeue_orphans(list, processing).await {
        Ok(0) => *recovered = true,
        Ok(moved) => {
            warn!("Requeued {moved} unfinished payloads from {processing}");
            *recovered = true;
        }
        Err(e) => error!("Failed to requeue {processing}: {e:#}"),
    }
}

/// Pops trigger events forever and runs each job on its own task.
pub async fn run_worker(queue: EvaluationQueue, job: EvaluationJob) {
    let permits = Arc::new(Semaphore::new(MAX_CONCURRENT_JOBS));
    let mut recovered = false;
    info!("Evaluation worker listening on {REQUESTED_QUEUE}");

    loop {
        let mut conn = match queue.connection().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Evaluation worker cannot reach Redis: {e:#}");
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };
        recover_once(&queue, &mut recovered, REQUESTED_QUEUE, REQUESTED_PROCESSING).await;

        loop {
            let payload = match pop(&mut conn, REQUESTED_QUEUE, REQUESTED_PROCESSING).await {
                Ok(Some(payload)) => payload,
                Ok(None) => continue,
                Err(e) => {
                    error!("Failed to pop from {REQUESTED_QUEUE}: {e:#}");
                    break;
                }
            };

            let event: EvaluationRequested = match serde_json::from_str(&payload) {
                Ok(event) => event,
                Err(e) => {
                    error!("Dropping malformed evaluation event: {e}");
                    if let Err(e) = queue.acknowledge(REQUESTED_PROCESSING, &payload).await {
                        warn!("Failed to drop malformed event: {e:#}");
                    }
                    continue;
                }
            };

            let permit = match permits.clone().acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            let queue = queue.clone();
            let job = job.clone();
            tokio::spawn(async move {
                process_event(&queue, &job, &event).await;
                if let Err(e) = queue.acknowledge(REQUESTED_PROCESSING, &payload).await {
                    warn!(job_id = %event.job_id, "Failed to acknowledge evaluation event: {e:#}");
                }
                drop(permit);
            });
        }

        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

/// Runs one job. Success frees the claim at once. A failure is handed to the
/// failure listener, which frees the claim after writing `failed`; if the signal
/// cannot be published the failure is recorded here instead.
pub async fn process_event(queue: &dyn JobQueue, job: &EvaluationJob, event: &EvaluationRequested) {
    let err = match job.run(event).await {
        Ok(_) => {
            release_claim(queue, event.interview_id, event.job_id).await;
            return;
        }
        Err(e) => e,
    };

    error!(
        job_id = %event.job_id,
        interview_id = %event.interview_id,
        "Interview evaluation failed: {err}"
    );
    let failed = EvaluationFailed::from_request(event, &err);
    if let Err(publish_err) = queue.publish_failure(&failed).await {
        warn!(
            job_id = %event.job_id,
            "Could not publish failure signal ({publish_err:#}); recording failure directly"
        );
        if let Err(e) = record_failure(queue, job.interviews().as_ref(), &failed).await {
            error!(job_id = %event.job_id, "Failed to record evaluation failure: {e:#}");
        }
    }
}

/// Writes the terminal failure, then frees the interview for a new trigger.
pub async fn record_failure(
    queue: &dyn JobQueue,
    interviews: &dyn InterviewStore,
    failed: &EvaluationFailed,
) -> Result<()> {
    handle_job_failure(interviews, failed).await?;
    release_claim(queue, failed.interview_id, failed.job_id).await;
    Ok(())
}

async fn release_claim(queue: &dyn JobQueue, interview_id: Uuid, job_id: Uuid) {
    if let Err(e) = queue.release(interview_id, job_id).await {
        warn!(interview_id = %interview_id, "Failed to release evaluation claim: {e:#}");
    }
}

/// Pops failure signals forever and records them on the interview.
pub async fn run_failure_listener(queue: EvaluationQueue, interviews: Arc<dyn InterviewStore>) {
    let mut recovered = false;
    info!("Failure listener listening on {FAILED_QUEUE}");

    loop {
        let mut conn = match queue.connection().await {
            Ok(conn) => conn,
            Err(e) => {
                error!("Failure listener cannot reach Redis: {e:#}");
                tokio::time::sleep(RECONNECT_DELAY).await;
                continue;
            }
        };
        recover_once(&queue, &mut recovered, FAILED_QUEUE, FAILED_PROCESSING).await;

        loop {
            let payload = match pop(&mut conn, FAILED_QUEUE, FAILED_PROCESSING).await {
                Ok(Some(payload)) => payload,
                Ok(None) => continue,
                Err(e) => {
                    error!("Failed to pop from {FAILED_QUEUE}: {e:#}");
                    break;
                }
            };

            match serde_json::from_str::<EvaluationFailed>(&payload) {
                Ok(failed) => {
                    if let Err(e) = record_failure(&queue, interviews.as_ref(), &failed).await {
                        error!(job_id = %failed.job_id, "Failed to record evaluation failure: {e:#}");
                        // Back onto the queue; if that fails too it stays on the processing list.
                        if let Err(e) = queue.publish_failure(&failed).await {
                            error!(job_id = %failed.job_id, "Failure event left on {FAILED_PROCESSING}: {e:#}");
                            tokio::time::sleep(RECONNECT_DELAY).await;
                            continue;
                        }
                        tokio::time::sleep(RECONNECT_DELAY).await;
                    }
                }
                Err(e) => error!("Dropping malformed failure event: {e}"),
            }

            if let Err(e) = queue.acknowledge(FAILED_PROCESSING, &payload).await {
                warn!("Failed to acknowledge failure event: {e:#}");
            }
        }

        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

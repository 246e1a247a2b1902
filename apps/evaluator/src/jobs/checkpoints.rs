use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

/// Checkpoints outlive any redelivery of their job by a wide margin.
pub const CHECKPOINT_RETENTION_DAYS: i64 = 7;
const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Durable per-step outputs of a job run. A step with a stored output is never re-run.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load(&self, job_id: Uuid, step: &str) -> Result<Option<Value>>;

    /// First write wins; saving an existing (job, step) is a no-op.
    async fn save(&self, job_id: Uuid, step: &str, output: &Value) -> Result<()>;

    /// Deletes every checkpoint written before `cutoff`. Returns the number removed.
    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}

#[derive(Clone)]
pub struct PgCheckpointStore {
    pool: PgPool,
}

impl PgCheckpointStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CheckpointStore for PgCheckpointStore {
    async fn load(&self, job_id: Uuid, step: &str) -> Result<Option<Value>> {
        Ok(sqlx::query_scalar(
            "SELECT output FROM evaluation_job_steps WHERE job_id = $1 AND step = $2",
        )
        .bind(job_id)
        .bind(step)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn save(&self, job_id: Uuid, step: &str, output: &Value) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO evaluation_job_steps (job_id, step, output)
            VALUES ($1, $2, $3)
            ON CONFLICT (job_id, step) DO NOTHING
            "#,
        )
        .bind(job_id)
        .bind(step)
        .bind(output)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM evaluation_job_steps WHERE created_at < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

/// Removes checkpoints older than `CHECKPOINT_RETENTION_DAYS`.
pub async fn prune_expired(checkpoints: &dyn CheckpointStore) -> Result<u64> {
    let cutoff = Utc::now() - chrono::Duration::days(CHECKPOINT_RETENTION_DAYS);
    checkpoints.prune_before(cutoff).await
}

/// Prunes expired checkpoints once an hour, forever.
pub async fn run_checkpoint_sweeper(checkpoints: Arc<dyn CheckpointStore>) {
    let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        ticker.tick().await;
        match prune_expired(checkpoints.as_ref()).await {
            Ok(0) => {}
            Ok(removed) => info!("Pruned {removed} expired evaluation checkpoints"),
            Err(e) => warn!("Checkpoint sweep failed: {e:#}"),
        }
    }
}

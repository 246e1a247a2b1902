use anyhow::Result;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

/// Object-storage archive of what was sent to and received from the completion
/// service for each evaluation job.
#[derive(Clone)]
pub struct EvaluationArchive {
    s3: aws_sdk_s3::Client,
    bucket: String,
}

impl EvaluationArchive {
    pub fn new(s3: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { s3, bucket }
    }

    pub fn key(user_id: Uuid, interview_id: Uuid, job_id: Uuid) -> String {
        format!("evaluations/{user_id}/{interview_id}/{job_id}.json")
    }

    /// Uploads `document` as pretty-printed JSON. Re-uploading the same key overwrites it.
    pub async fn put(&self, key: &str, document: &Value) -> Result<()> {
        let body = serde_json::to_vec_pretty(document)?;
        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(Bytes::from(body)))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("S3 upload failed: {e}"))?;

        info!("Archived evaluation to s3://{}/{}", self.bucket, key);
        Ok(())
    }
}

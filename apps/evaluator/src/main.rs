mod archive;
mod config;
mod db;
mod errors;
mod evaluation;
mod jobs;
mod llm_client;
mod models;
mod routes;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::archive::EvaluationArchive;
use crate::config::Config;
use crate::db::create_pool;
use crate::evaluation::store::{InterviewStore, PgInterviewStore};
use crate::jobs::checkpoints::{run_checkpoint_sweeper, CheckpointStore, PgCheckpointStore};
use crate::jobs::queue::{run_failure_listener, run_worker, EvaluationQueue};
use crate::jobs::runner::EvaluationJob;
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting interview evaluator v{}", env!("CARGO_PKG_VERSION"));

    // PostgreSQL (migrations run on connect)
    let db = create_pool(&config.database_url).await?;

    // Redis job queue
    let redis = redis::Client::open(config.redis_url.clone())?;
    let queue = EvaluationQueue::new(redis, config.claim_ttl());
    info!("Redis client initialized");

    // S3 / MinIO evaluation archive
    let s3 = build_s3_client(&config).await;
    let archive = EvaluationArchive::new(s3, config.s3_bucket.clone());
    info!("S3 archive initialized (bucket: {})", config.s3_bucket);

    let llm = LlmClient::new(config.openai_api_key.clone(), config.openai_base_url.clone())?;
    info!("Completion client initialized (model: {})", llm_client::MODEL);

    let interviews: Arc<dyn InterviewStore> = Arc::new(PgInterviewStore::new(db.clone()));
    let checkpoints: Arc<dyn CheckpointStore> = Arc::new(PgCheckpointStore::new(db));
    let job = EvaluationJob::new(interviews.clone(), checkpoints.clone(), Arc::new(llm))
        .with_archive(archive)
        .with_poll_config(config.poll_config())
        .with_retry_policy(config.retry_policy());

    tokio::spawn(run_worker(queue.clone(), job));
    tokio::spawn(run_failure_listener(queue.clone(), interviews.clone()));
    tokio::spawn(run_checkpoint_sweeper(checkpoints));
    info!("Evaluation worker started");

    let state = AppState {
        interviews,
        queue: Arc::new(queue),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "evaluator-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO requires path-style bucket addressing.
    let s3_config = aws_sdk_s3::config::Builder::from(&s3_config)
        .force_path_style(true)
        .build();

    aws_sdk_s3::Client::from_conf(s3_config)
}

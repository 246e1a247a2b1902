/// LLM Client: the single point of entry for all completion-service calls.
///
/// ARCHITECTURAL RULE: No other module may call the completion API directly.
/// Everything goes through the `CompletionService` trait; `LlmClient` is the
/// production implementation over an OpenAI-compatible Responses API.
///
/// Requests run in background mode: `submit` returns a response handle and the
/// caller polls `retrieve` until the response is terminal. This client never
/// retries; retry decisions belong to the job step runner.
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

pub mod prompts;

/// The model used for all evaluation calls.
/// Hardcoded so scores stay comparable across evaluations.
pub const MODEL: &str = "gpt-4.1";
pub const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Completion service reply did not include a response id")]
    MissingResponseId,
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    input: Vec<InputMessage<'a>>,
    background: bool,
    store: bool,
    text: TextConfig<'a>,
}

#[derive(Debug, Serialize)]
struct InputMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct TextConfig<'a> {
    format: JsonSchemaFormat<'a>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'a str,
    name: &'a str,
    schema: &'a Value,
    strict: bool,
}

/// Lifecycle status reported by the completion service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Incomplete,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl ResponseStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ResponseStatus::Completed
                | ResponseStatus::Failed
                | ResponseStatus::Incomplete
                | ResponseStatus::Cancelled
        )
    }
}

/// A response object as returned by `GET /responses/{id}`.
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionResponse {
    #[serde(default)]
    pub id: Option<String>,
    pub status: ResponseStatus,
    #[serde(default)]
    pub output: Vec<OutputItem>,
    #[serde(default)]
    pub error: Option<ResponseErrorBody>,
    #[serde(default)]
    pub incomplete_details: Option<IncompleteDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputItem {
    #[serde(rename = "type")]
    pub item_type: String,
    #[serde(default)]
    pub content: Vec<ContentItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    pub content_type: String,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub refusal: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncompleteDetails {
    #[serde(default)]
    pub reason: Option<String>,
}

impl CompletionResponse {
    /// All content items across message outputs, in order.
    pub fn content_items(&self) -> impl Iterator<Item = &ContentItem> {
        self.output
            .iter()
            .filter(|o| o.item_type == "message")
            .flat_map(|o| o.content.iter())
    }

    /// Text of the first content item tagged as a refusal, if any.
    pub fn refusal(&self) -> Option<&str> {
        self.content_items()
            .find(|c| c.content_type == "refusal")
            .map(|c| c.refusal.as_deref().or(c.text.as_deref()).unwrap_or("(no reason given)"))
    }

    /// Human-readable reason for a non-completed terminal status.
    pub fn failure_reason(&self) -> String {
        if let Some(err) = &self.error {
            return match &err.code {
                Some(code) => format!("{code}: {}", err.message),
                None => err.message.clone(),
            };
        }
        if let Some(reason) = self.incomplete_details.as_ref().and_then(|d| d.reason.as_deref()) {
            return format!("response incomplete: {reason}");
        }
        format!("response ended with status {:?}", self.status)
    }
}

#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Trait definition
// ────────────────────────────────────────────────────────────────────────────

/// The two operations the evaluation job consumes from the completion service.
///
/// Carried in the job dependencies as `Arc<dyn CompletionService>`.
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// Submits a prompt constrained to `schema`; returns the response handle id.
    async fn submit(
        &self,
        prompt: &str,
        system: &str,
        schema: &Value,
        schema_name: &str,
    ) -> Result<String, LlmError>;

    /// Fetches the current state of a submitted response.
    async fn retrieve(&self, response_id: &str) -> Result<CompletionResponse, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// LlmClient: production implementation
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl LlmClient {
    pub fn new(api_key: String, base_url: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
                .build()?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn error_from_response(response: reqwest::Response) -> LlmError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiError>(&body)
            .map(|e| e.error.message)
            .unwrap_or(body);
        LlmError::Api { status, message }
    }
}

#[async_trait]
impl CompletionService for LlmClient {
    async fn submit(
        &self,
        prompt: &str,
        system: &str,
        schema: &Value,
        schema_name: &str,
    ) -> Result<String, LlmError> {
        let request_body = ResponsesRequest {
            model: MODEL,
            input: vec![
                InputMessage {
                    role: "system",
                    content: system,
                },
                InputMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            background: true,
            store: true,
            text: TextConfig {
                format: JsonSchemaFormat {
                    format_type: "json_schema",
                    name: schema_name,
                    schema,
                    strict: true,
                },
            },
        };

        let response = self
            .client
            .post(format!("{}/responses", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let created: CompletionResponse = response.json().await?;
        let id = created
            .id
            .filter(|id| !id.is_empty())
            .ok_or(LlmError::MissingResponseId)?;

        debug!("Submitted completion {id} (schema {schema_name}, status {:?})", created.status);
        Ok(id)
    }

    async fn retrieve(&self, response_id: &str) -> Result<CompletionResponse, LlmError> {
        let response = self
            .client
            .get(format!("{}/responses/{}", self.base_url, response_id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        Ok(response.json().await?)
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

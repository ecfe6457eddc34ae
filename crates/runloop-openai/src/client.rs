//! HTTP client for the Assistants v2 API.
//!
//! # Connection Behavior
//!
//! | Setting | Default | Override |
//! |---------|---------|----------|
//! | Request timeout | 30 seconds | `RUNLOOP_REQUEST_TIMEOUT_MS` |
//! | Base URL | `https://api.openai.com/v1/` | `OPENAI_BASE_URL` |
//!
//! The client uses `reqwest`'s connection pooling, is `Clone` and safe to
//! share across tasks. It never retries: the run orchestrator owns the
//! polling budget and decides what a failed request costs.
//!
//! # Error Handling
//!
//! Every non-2xx response becomes [`TransportError::Http`] carrying the
//! status code and the raw response body. Connection failures map to
//! `Connection`, elapsed request timeouts to `Timeout`, and bodies that do
//! not match the expected shape to `Protocol`.

use crate::config::{ApiKey, OpenAiConfig};
use crate::model::Model;
use crate::schema::response_format_for;
use crate::types::{
    AssistantObject, AssistantRequest, CreateMessageRequest, CreateRunRequest, MessageList,
    MessageObject, RunObject, SubmitToolOutputsRequest, ThreadObject, thread_id,
};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method};
use runloop_core::{
    AssistantId, MessageRole, RunHandle, RunId, RunTransport, ThreadId, ThreadMessage,
    ToolOutputBatch, TransportError, TransportResult,
};
use schemars::JsonSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const BETA_HEADER: &str = "OpenAI-Beta";
const BETA_VALUE: &str = "assistants=v2";

/// Page size requested when listing thread messages
const MESSAGE_PAGE_LIMIT: &str = "100";

/// Client for the assistant, thread, message and run endpoints
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: Url,
    http: Client,
    api_key: ApiKey,
    trace_http: bool,
    request_timeout: Duration,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("base_url", &self.base_url.as_str())
            .field("trace_http", &self.trace_http)
            .finish_non_exhaustive()
    }
}

impl OpenAiClient {
    /// Create a client from resolved configuration.
    ///
    /// # Errors
    ///
    /// `MissingApiKey` when no key was configured, `Connection` when the
    /// HTTP client cannot be built.
    pub fn new(config: &OpenAiConfig) -> TransportResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(format!("runloop/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                TransportError::connection(format!("Failed to create HTTP client: {e}"))
            })?;
        Self::with_http_client(config, http)
    }

    /// Create a client around an existing `reqwest::Client`
    pub fn with_http_client(config: &OpenAiConfig, http: Client) -> TransportResult<Self> {
        let api_key = config.require_api_key()?.clone();
        if config.base_url.cannot_be_a_base() {
            return Err(TransportError::invalid_url(format!(
                "{} cannot be used as a base URL",
                config.base_url
            )));
        }
        Ok(Self {
            base_url: config.base_url.clone(),
            http,
            api_key,
            trace_http: config.trace_http,
            request_timeout: config.request_timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a URL by appending path segments to the base URL
    fn endpoint(&self, segments: &[&str]) -> TransportResult<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| TransportError::invalid_url("base URL cannot hold a path"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn map_send_error(&self, err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout {
                timeout_ms: u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX),
            }
        } else if err.is_builder() {
            TransportError::invalid_url(err.to_string())
        } else {
            TransportError::connection(err.to_string())
        }
    }

    async fn execute<R: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<String>,
    ) -> TransportResult<R> {
        debug!(method = %method, url = %url, "Sending request");
        if self.trace_http
            && let Some(body) = &body
        {
            debug!(url = %url, body = %body, "Request body");
        }

        let mut request = self
            .http
            .request(method, url.clone())
            .bearer_auth(self.api_key.expose())
            .header(BETA_HEADER, BETA_VALUE);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_send_error(e))?;

        if self.trace_http {
            debug!(url = %url, status = status.as_u16(), body = %text, "Response body");
        }

        if !status.is_success() {
            debug!(url = %url, status = status.as_u16(), "Request failed");
            return Err(TransportError::http(status.as_u16(), text));
        }

        serde_json::from_str(&text).map_err(|e| {
            TransportError::protocol(format!("Unexpected response body from {url}: {e}"))
        })
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> TransportResult<R> {
        let url = self.endpoint(segments)?;
        let body = serde_json::to_string(body)?;
        self.execute(Method::POST, url, Some(body)).await
    }

    async fn get<R: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> TransportResult<R> {
        let mut url = self.endpoint(segments)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        self.execute(Method::GET, url, None).await
    }

    /// Create an empty conversation thread
    pub async fn create_thread(&self) -> TransportResult<ThreadId> {
        let thread: ThreadObject = self.post(&["threads"], &serde_json::json!({})).await?;
        let id = thread_id(&thread.id)?;
        info!(thread_id = %id, "Thread created");
        Ok(id)
    }

    /// Create an assistant
    pub async fn create_assistant(&self, request: &AssistantRequest) -> TransportResult<AssistantId> {
        let assistant: AssistantObject = self.post(&["assistants"], request).await?;
        let id = AssistantId::parse(&assistant.id).map_err(|e| {
            TransportError::protocol(format!("invalid assistant id {:?}: {e}", assistant.id))
        })?;
        info!(
            assistant_id = %id,
            model = %assistant.model,
            tools = request.tools.len(),
            "Assistant created"
        );
        Ok(id)
    }

    /// Create an assistant whose replies are constrained to the JSON schema of `T`.
    ///
    /// # Errors
    ///
    /// `UnsupportedModel` when `model` cannot produce strict JSON-schema output;
    /// no request is sent in that case.
    pub async fn create_assistant_with_response_type<T: JsonSchema>(
        &self,
        name: &str,
        instructions: &str,
        model: Model,
    ) -> TransportResult<AssistantId> {
        if !model.supports_json_schema() {
            return Err(TransportError::UnsupportedModel {
                model: model.id().to_string(),
            });
        }
        let request = AssistantRequest::new(name, model)
            .instructions(instructions)
            .response_format(response_format_for::<T>()?);
        self.create_assistant(&request).await
    }
}

#[async_trait]
impl RunTransport for OpenAiClient {
    async fn create_message(&self, thread_id: &ThreadId, content: &str) -> TransportResult<()> {
        let body = CreateMessageRequest {
            role: MessageRole::User,
            content,
        };
        let message: MessageObject = self
            .post(&["threads", thread_id.as_str(), "messages"], &body)
            .await?;
        debug!(thread_id = %thread_id, message_id = %message.id, "Message created");
        Ok(())
    }

    async fn create_run(
        &self,
        thread_id: &ThreadId,
        assistant_id: &AssistantId,
    ) -> TransportResult<RunHandle> {
        let body = CreateRunRequest {
            assistant_id: assistant_id.as_str(),
        };
        let run: RunObject = self
            .post(&["threads", thread_id.as_str(), "runs"], &body)
            .await?;
        RunHandle::try_from(run)
    }

    async fn get_run(&self, thread_id: &ThreadId, run_id: &RunId) -> TransportResult<RunHandle> {
        let run: RunObject = self
            .get(&["threads", thread_id.as_str(), "runs", run_id.as_str()], &[])
            .await?;
        RunHandle::try_from(run)
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &ThreadId,
        run_id: &RunId,
        outputs: &ToolOutputBatch,
    ) -> TransportResult<RunHandle> {
        let body = SubmitToolOutputsRequest::new(outputs);
        let run: RunObject = self
            .post(
                &[
                    "threads",
                    thread_id.as_str(),
                    "runs",
                    run_id.as_str(),
                    "submit_tool_outputs",
                ],
                &body,
            )
            .await?;
        RunHandle::try_from(run)
    }

    async fn list_messages(&self, thread_id: &ThreadId) -> TransportResult<Vec<ThreadMessage>> {
        let list: MessageList = self
            .get(
                &["threads", thread_id.as_str(), "messages"],
                &[("order", "desc"), ("limit", MESSAGE_PAGE_LIMIT)],
            )
            .await?;
        list.data.into_iter().map(ThreadMessage::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> OpenAiConfig {
        OpenAiConfig::new().api_key("sk-test")
    }

    #[test]
    fn test_client_requires_api_key() {
        let err = OpenAiClient::new(&OpenAiConfig::new()).unwrap_err();
        assert_eq!(err, TransportError::MissingApiKey);
    }

    #[test]
    fn test_endpoint_keeps_version_prefix() {
        let client = OpenAiClient::new(&config()).unwrap();
        let url = client
            .endpoint(&["threads", "thread_1", "runs", "run_1", "submit_tool_outputs"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.openai.com/v1/threads/thread_1/runs/run_1/submit_tool_outputs"
        );
    }

    #[test]
    fn test_endpoint_on_bare_host() {
        let config = config().base_url(Url::parse("http://127.0.0.1:9000").unwrap());
        let client = OpenAiClient::new(&config).unwrap();
        assert_eq!(
            client.endpoint(&["threads"]).unwrap().as_str(),
            "http://127.0.0.1:9000/threads"
        );
    }

    #[test]
    fn test_debug_hides_key() {
        let client = OpenAiClient::new(&config()).unwrap();
        assert!(!format!("{client:?}").contains("sk-test"));
    }
}

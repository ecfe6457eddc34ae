//! # Runloop
//!
//! Runloop drives OpenAI assistant runs to completion and executes the tool
//! calls they request against handlers registered in Rust.
//!
//! ## Core Components
//!
//! - **[`ToolRegistry`]**: name-to-handler table built once at startup
//! - **[`DispatchExecutor`]**: runs a batch of tool calls concurrently and
//!   answers every call id, failures included
//! - **[`RunOrchestrator`]**: posts the message, starts the run, polls it and
//!   services `requires_action` until a terminal status
//! - **[`Runloop`]**: everything above wired to the OpenAI transport
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use runloop::{Model, RunRequest, Runloop, RunloopConfig, ToolRegistry};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let mut tools = ToolRegistry::builder();
//! tools.register("add", &["a", "b"], |a: i64, b: i64| async move {
//!     Ok::<_, String>(a + b)
//! })?;
//!
//! let config = RunloopConfig::from_env()?;
//! let runloop = Runloop::new(&config, tools.build())?;
//!
//! let assistant = runloop
//!     .create_assistant("calculator", Model::Gpt4oMini, "Use the add tool.")
//!     .await?;
//! let thread = runloop.create_thread().await?;
//!
//! let request = RunRequest::new("What is 2 + 40?", thread, assistant);
//! let reply = runloop.run_text(&request, &CancellationToken::new()).await?;
//! println!("{reply}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod orchestrator;
pub mod telemetry;

pub use config::RunloopConfig;
pub use orchestrator::{RunOrchestrator, RunRequest};
pub use telemetry::{LogFormat, init_tracing};

pub use runloop_core as core;
pub use runloop_openai as openai;
pub use runloop_tools as tools;

pub use runloop_core::{
    AssistantId, CallId, ConfigError, DispatchConfig, DispatchError, PollPolicy, RunError,
    RunResult, RunStatus, ThreadId, TransportError, TransportResult,
};
pub use runloop_openai::{Model, OpenAiClient, OpenAiConfig};
pub use runloop_tools::{DispatchExecutor, Json, ToolProvider, ToolRegistry, tool_enum};

use runloop_openai::{AssistantRequest, AssistantTool};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// The orchestrator bound to the OpenAI transport.
#[derive(Debug, Clone)]
pub struct Runloop {
    client: OpenAiClient,
    orchestrator: RunOrchestrator<OpenAiClient>,
}

impl Runloop {
    /// Wire a client, dispatcher and orchestrator from `config`.
    ///
    /// # Errors
    ///
    /// `TransportError::MissingApiKey` when no API key was configured, or any
    /// error building the HTTP client.
    pub fn new(config: &RunloopConfig, registry: ToolRegistry) -> TransportResult<Self> {
        let client = OpenAiClient::new(&config.openai)?;
        let executor = DispatchExecutor::new(registry, config.dispatch);
        let orchestrator = RunOrchestrator::new(client.clone(), executor, config.poll);
        Ok(Self {
            client,
            orchestrator,
        })
    }

    pub fn client(&self) -> &OpenAiClient {
        &self.client
    }

    pub fn orchestrator(&self) -> &RunOrchestrator<OpenAiClient> {
        &self.orchestrator
    }

    pub fn registry(&self) -> &ToolRegistry {
        self.orchestrator.executor().registry()
    }

    pub async fn create_thread(&self) -> TransportResult<ThreadId> {
        self.client.create_thread().await
    }

    /// Create an assistant that can call every registered tool
    pub async fn create_assistant(
        &self,
        name: &str,
        model: Model,
        instructions: &str,
    ) -> TransportResult<AssistantId> {
        let request = self
            .registry()
            .descriptors()
            .fold(
                AssistantRequest::new(name, model).instructions(instructions),
                |request, descriptor| {
                    request.tool(AssistantTool::function(
                        descriptor.name().as_str(),
                        descriptor.parameters_schema(),
                    ))
                },
            );
        self.client.create_assistant(&request).await
    }

    /// Create an assistant whose replies follow the JSON schema of `T`
    pub async fn create_assistant_with_response_type<T: JsonSchema>(
        &self,
        name: &str,
        instructions: &str,
        model: Model,
    ) -> TransportResult<AssistantId> {
        self.client
            .create_assistant_with_response_type::<T>(name, instructions, model)
            .await
    }

    pub async fn run<R: DeserializeOwned>(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> RunResult<R> {
        self.orchestrator.run(request, cancel).await
    }

    pub async fn run_text(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> RunResult<String> {
        self.orchestrator.run_text(request, cancel).await
    }

    pub fn spawn<R>(&self, request: RunRequest, cancel: CancellationToken) -> JoinHandle<RunResult<R>>
    where
        R: DeserializeOwned + Send + 'static,
    {
        self.orchestrator.spawn(request, cancel)
    }

    pub fn run_blocking<R: DeserializeOwned>(&self, request: &RunRequest) -> RunResult<R> {
        self.orchestrator.run_blocking(request)
    }
}

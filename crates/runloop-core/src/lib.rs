//! # Runloop Core
//!
//! Shared building blocks for driving remote assistant runs: validated
//! identifiers, the run and tool-call data model, the [`RunTransport`]
//! seam and the error taxonomy every other runloop crate reports through.

pub mod collections;
pub mod config;
pub mod error;
pub mod identifiers;
pub mod message;
pub mod run;
pub mod tool;
pub mod transport;

pub use collections::{EmptyVecError, NonEmptyVec};
pub use config::{ConfigError, DispatchConfig, EnvSource, PollPolicy, ProcessEnv};
pub use error::{
    CoercionError, DispatchError, OutputCoverageError, RegistryError, RegistryResult, RunContext,
    RunError, RunResult, TransportError, TransportResult,
};
pub use identifiers::{
    AssistantId, CallId, IdValidationError, MessageId, RunId, ThreadId, ToolName,
};
pub use message::{MessageRole, ThreadMessage, latest_assistant_text};
pub use run::{RunHandle, RunStatus};
pub use tool::{
    ArgumentBag, MalformedArguments, ToolArguments, ToolCallRequest, ToolOutput, ToolOutputBatch,
};
pub use transport::RunTransport;

//! Concurrent execution of one batch of tool calls.

use crate::handler::{ToolFuture, ToolOutcome};
use crate::registry::ToolRegistry;
use futures::future::join_all;
use runloop_core::{
    DispatchConfig, DispatchError, NonEmptyVec, ToolArguments, ToolCallRequest, ToolOutput,
    ToolOutputBatch,
};
use serde_json::Value;
use std::any::Any;
use tokio::task::JoinError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Runs every call of a batch concurrently and answers each call id exactly once.
///
/// Failures never drop a call: an unknown tool, a bad argument, a handler
/// error, a panic, a timeout or cancellation all become an error payload
/// (see [`DispatchError::to_payload`]) in the returned batch.
#[derive(Debug, Clone)]
pub struct DispatchExecutor {
    registry: ToolRegistry,
    config: DispatchConfig,
}

impl DispatchExecutor {
    pub fn new(registry: ToolRegistry, config: DispatchConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Execute `calls` and wait for all of them.
    ///
    /// Outputs come back in request order. Cancelling `cancel` aborts the
    /// invocations still running; they are answered with `cancelled` payloads.
    pub async fn dispatch(
        &self,
        calls: &NonEmptyVec<ToolCallRequest>,
        cancel: &CancellationToken,
    ) -> ToolOutputBatch {
        debug!(calls = calls.len(), "Dispatching tool calls");
        let outputs = join_all(calls.iter().map(|call| self.execute(call, cancel))).await;
        ToolOutputBatch::new(outputs)
    }

    async fn execute(&self, call: &ToolCallRequest, cancel: &CancellationToken) -> ToolOutput {
        let outcome = match self.start(call, cancel) {
            Ok(invocation) => self.supervise(&call.name, invocation, cancel).await,
            Err(err) => Err(err),
        };

        let output = match outcome {
            Ok(value) => {
                debug!(call_id = %call.call_id, tool = %call.name, "Tool call succeeded");
                render_output(value)
            }
            Err(err) => {
                warn!(
                    call_id = %call.call_id,
                    tool = %call.name,
                    kind = err.kind(),
                    error = %err,
                    "Tool call failed"
                );
                err.to_payload()
            }
        };
        ToolOutput::new(call.call_id.clone(), output)
    }

    /// Look up the handler and bind its arguments
    fn start(
        &self,
        call: &ToolCallRequest,
        cancel: &CancellationToken,
    ) -> Result<ToolFuture, DispatchError> {
        let tool = call.name.clone();
        if cancel.is_cancelled() {
            return Err(DispatchError::Cancelled { tool });
        }

        let descriptor = self
            .registry
            .lookup(&call.name)
            .ok_or_else(|| DispatchError::ToolNotFound { tool: tool.clone() })?;

        let args = match &call.arguments {
            ToolArguments::Bag(bag) => bag,
            ToolArguments::Malformed(source) => {
                return Err(DispatchError::MalformedArguments {
                    tool,
                    source: source.clone(),
                });
            }
        };

        descriptor
            .bind(args)
            .map_err(|source| DispatchError::Binding { tool, source })
    }

    /// Run the invocation on its own task, enforcing timeout and cancellation
    async fn supervise(
        &self,
        tool: &str,
        invocation: ToolFuture,
        cancel: &CancellationToken,
    ) -> Result<Value, DispatchError> {
        let handle = tokio::spawn(invocation);
        let abort = handle.abort_handle();

        let finished = async {
            match self.config.call_timeout {
                Some(limit) => tokio::time::timeout(limit, handle).await.map_err(|_| {
                    DispatchError::TimedOut {
                        tool: tool.to_string(),
                        timeout_ms: u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                    }
                }),
                None => Ok(handle.await),
            }
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DispatchError::Cancelled { tool: tool.to_string() }),
            result = finished => result,
        };

        match result {
            Ok(joined) => joined_outcome(tool, joined),
            Err(err) => {
                abort.abort();
                Err(err)
            }
        }
    }
}

fn joined_outcome(
    tool: &str,
    joined: Result<ToolOutcome, JoinError>,
) -> Result<Value, DispatchError> {
    match joined {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(message)) => Err(DispatchError::Handler {
            tool: tool.to_string(),
            message,
        }),
        Err(err) if err.is_panic() => Err(DispatchError::Panicked {
            tool: tool.to_string(),
            message: panic_message(err.into_panic()),
        }),
        Err(_) => Err(DispatchError::Cancelled {
            tool: tool.to_string(),
        }),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Text submitted for a successful call: strings verbatim, anything else as JSON
fn render_output(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}

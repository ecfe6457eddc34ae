//! # Run Orchestrator
//!
//! Drives one remote run from the user message to the final assistant reply.
//!
//! ## Lifecycle
//!
//! 1. Post the request content as a user message on the thread
//! 2. Start a run of the assistant on that thread
//! 3. Poll the run on a fixed interval, one attempt per tick:
//!    - `queued`, `in_progress`, `cancelling`: keep polling
//!    - `requires_action`: dispatch the pending tool calls, submit every
//!      output in one batch, keep polling
//!    - `completed`: fetch the thread messages and return the newest
//!      assistant reply
//!    - `failed`, `cancelled`, `expired`, `incomplete`: [`RunError::RunFailed`]
//! 4. Spending the attempt budget without a terminal status is
//!    [`RunError::Timeout`]
//!
//! A transport failure while polling or submitting costs one attempt and the
//! next tick retries. A failed submission leaves the run in
//! `requires_action`, so its batch is dispatched again later; tools may
//! therefore run more than once per call id.

use runloop_core::{
    AssistantId, NonEmptyVec, PollPolicy, RunContext, RunError, RunHandle, RunId, RunResult,
    RunStatus, RunTransport, ThreadId, ToolCallRequest, latest_assistant_text,
};
use runloop_tools::DispatchExecutor;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tokio::runtime::{Builder, Handle};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span, debug, error, field, info, info_span, warn};

/// What to send and where to run it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub content: String,
    pub thread_id: ThreadId,
    pub assistant_id: AssistantId,
}

impl RunRequest {
    pub fn new(content: impl Into<String>, thread_id: ThreadId, assistant_id: AssistantId) -> Self {
        Self {
            content: content.into(),
            thread_id,
            assistant_id,
        }
    }
}

/// Polls runs to completion and services their tool calls.
///
/// Cloning is cheap; clones share the transport and the tool registry.
pub struct RunOrchestrator<T> {
    transport: Arc<T>,
    executor: DispatchExecutor,
    policy: PollPolicy,
}

impl<T> Clone for RunOrchestrator<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            executor: self.executor.clone(),
            policy: self.policy,
        }
    }
}

impl<T> std::fmt::Debug for RunOrchestrator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunOrchestrator")
            .field("executor", &self.executor)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl<T: RunTransport> RunOrchestrator<T> {
    pub fn new(transport: T, executor: DispatchExecutor, policy: PollPolicy) -> Self {
        Self::from_shared(Arc::new(transport), executor, policy)
    }

    /// Build around a transport that is also used elsewhere
    pub fn from_shared(transport: Arc<T>, executor: DispatchExecutor, policy: PollPolicy) -> Self {
        Self {
            transport,
            executor,
            policy,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn executor(&self) -> &DispatchExecutor {
        &self.executor
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Run the request and decode the final assistant reply as JSON into `R`.
    ///
    /// # Errors
    ///
    /// Every failure carries the thread, and the run once it exists; see
    /// [`RunError`] for the variants.
    pub async fn run<R: DeserializeOwned>(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> RunResult<R> {
        let (context, text) = self.complete(request, cancel).await?;
        serde_json::from_str(&text).map_err(|source| {
            error!(%context, error = %source, "Assistant reply did not match the expected shape");
            RunError::Decode {
                context,
                payload: text,
                source,
            }
        })
    }

    /// Run the request and return the final assistant reply verbatim
    pub async fn run_text(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> RunResult<String> {
        self.complete(request, cancel).await.map(|(_, text)| text)
    }

    /// Start the run on the current runtime and return its deferred result
    pub fn spawn<R>(&self, request: RunRequest, cancel: CancellationToken) -> JoinHandle<RunResult<R>>
    where
        T: 'static,
        R: DeserializeOwned + Send + 'static,
    {
        let orchestrator = self.clone();
        tokio::spawn(async move { orchestrator.run(&request, &cancel).await })
    }

    /// Blocking form of [`run`](Self::run) for synchronous callers.
    ///
    /// # Errors
    ///
    /// `RunError::Runtime` when called from inside an async runtime, where
    /// blocking would stall the executor.
    pub fn run_blocking<R: DeserializeOwned>(&self, request: &RunRequest) -> RunResult<R> {
        if Handle::try_current().is_ok() {
            return Err(RunError::runtime(
                "run_blocking called from within an async runtime; use run or spawn instead",
            ));
        }
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| RunError::runtime(format!("failed to build runtime: {e}")))?;
        runtime.block_on(self.run(request, &CancellationToken::new()))
    }

    async fn complete(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> RunResult<(RunContext, String)> {
        let span = info_span!(
            "run",
            thread_id = %request.thread_id,
            assistant_id = %request.assistant_id,
            run_id = field::Empty,
        );
        self.drive(request, cancel).instrument(span).await
    }

    async fn drive(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> RunResult<(RunContext, String)> {
        let thread_id = &request.thread_id;
        let mut context = RunContext::new(thread_id.clone());
        if cancel.is_cancelled() {
            return Err(RunError::Cancelled { context });
        }

        self.transport
            .create_message(thread_id, &request.content)
            .await
            .map_err(|e| RunError::transport(context.clone(), e))?;
        debug!("User message posted");

        let started = self
            .transport
            .create_run(thread_id, &request.assistant_id)
            .await
            .map_err(|e| RunError::transport(context.clone(), e))?;
        context = context.with_run(started.run_id.clone());
        Span::current().record("run_id", field::display(&started.run_id));
        info!(status = %started.status, "Run started");

        let finished = self.poll(&context, &started.run_id, cancel).await?;
        if finished.status != RunStatus::Completed {
            error!(
                status = %finished.status,
                last_error = finished.last_error.as_deref().unwrap_or(""),
                "Run ended without completing"
            );
            return Err(RunError::RunFailed {
                context,
                status: finished.status,
                last_error: finished.last_error,
            });
        }

        let messages = self
            .transport
            .list_messages(thread_id)
            .await
            .map_err(|e| RunError::transport(context.clone(), e))?;
        match latest_assistant_text(&messages) {
            Some(text) => {
                info!(messages = messages.len(), "Run completed");
                Ok((context, text.to_string()))
            }
            None => Err(RunError::NoAssistantMessage { context }),
        }
    }

    /// Poll until a terminal status, servicing tool calls along the way
    async fn poll(
        &self,
        context: &RunContext,
        run_id: &RunId,
        cancel: &CancellationToken,
    ) -> RunResult<RunHandle> {
        let mut ticker = interval(self.policy.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_status = None;
        let mut last_error = None;

        for attempt in 1..=self.policy.max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    warn!(attempt, "Run cancelled while polling");
                    return Err(RunError::Cancelled { context: context.clone() });
                }
                _ = ticker.tick() => {}
            }

            let handle = match self.transport.get_run(&context.thread_id, run_id).await {
                Ok(handle) => handle,
                Err(err) => {
                    warn!(attempt, error = %err, "Run status fetch failed");
                    last_error = Some(err.to_string());
                    continue;
                }
            };
            debug!(attempt, status = %handle.status, "Run polled");
            last_status = Some(handle.status);
            if handle.last_error.is_some() {
                last_error.clone_from(&handle.last_error);
            }

            if handle.status.is_terminal() {
                return Ok(handle);
            }
            if handle.status.requires_action() {
                match handle.pending_calls() {
                    Some(calls) => {
                        if let Some(err) = self.answer(context, run_id, calls, cancel).await? {
                            last_error = Some(err);
                        }
                    }
                    None => warn!(attempt, "Run requires action but lists no tool calls"),
                }
            }
        }

        error!(
            attempts = self.policy.max_attempts,
            last_status = last_status.map(|s| s.as_str()).unwrap_or("unknown"),
            "Run did not reach a terminal status"
        );
        Err(RunError::Timeout {
            context: context.clone(),
            attempts: self.policy.max_attempts,
            last_status,
            last_error,
        })
    }

    /// Dispatch one batch and submit its outputs.
    ///
    /// Returns the submission failure, if any, so the caller can count it as
    /// a spent attempt; only cancellation and an incomplete batch abort the run.
    async fn answer(
        &self,
        context: &RunContext,
        run_id: &RunId,
        calls: &NonEmptyVec<ToolCallRequest>,
        cancel: &CancellationToken,
    ) -> RunResult<Option<String>> {
        info!(calls = calls.len(), "Run requires action");
        let outputs = self.executor.dispatch(calls, cancel).await;
        if cancel.is_cancelled() {
            warn!("Run cancelled during tool dispatch; outputs not submitted");
            return Err(RunError::Cancelled {
                context: context.clone(),
            });
        }

        if let Err(source) = outputs.ensure_covers(calls) {
            error!(error = %source, "Dispatch produced an incomplete output batch");
            return Err(RunError::IncompleteOutputs {
                context: context.clone(),
                source,
            });
        }

        match self
            .transport
            .submit_tool_outputs(&context.thread_id, run_id, &outputs)
            .await
        {
            Ok(resumed) => {
                info!(outputs = outputs.len(), status = %resumed.status, "Tool outputs submitted");
                Ok(None)
            }
            Err(err) => {
                warn!(error = %err, "Tool output submission failed; batch will be dispatched again");
                Ok(Some(err.to_string()))
            }
        }
    }
}

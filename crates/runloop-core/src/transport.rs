//! The seam between the orchestrator and the remote assistant service.

use crate::error::TransportResult;
use crate::identifiers::{AssistantId, RunId, ThreadId};
use crate::message::ThreadMessage;
use crate::run::RunHandle;
use crate::tool::ToolOutputBatch;
use async_trait::async_trait;
use std::sync::Arc;

/// Remote operations a run needs.
///
/// Implementations do not retry; the orchestrator owns the polling budget.
#[async_trait]
pub trait RunTransport: Send + Sync {
    /// Append a user message to the thread
    async fn create_message(&self, thread_id: &ThreadId, content: &str) -> TransportResult<()>;

    /// Start a run of `assistant_id` on the thread
    async fn create_run(
        &self,
        thread_id: &ThreadId,
        assistant_id: &AssistantId,
    ) -> TransportResult<RunHandle>;

    async fn get_run(&self, thread_id: &ThreadId, run_id: &RunId) -> TransportResult<RunHandle>;

    /// Answer the pending tool calls of a run
    async fn submit_tool_outputs(
        &self,
        thread_id: &ThreadId,
        run_id: &RunId,
        outputs: &ToolOutputBatch,
    ) -> TransportResult<RunHandle>;

    async fn list_messages(&self, thread_id: &ThreadId) -> TransportResult<Vec<ThreadMessage>>;
}

#[async_trait]
impl<T: RunTransport + ?Sized> RunTransport for Arc<T> {
    async fn create_message(&self, thread_id: &ThreadId, content: &str) -> TransportResult<()> {
        (**self).create_message(thread_id, content).await
    }

    async fn create_run(
        &self,
        thread_id: &ThreadId,
        assistant_id: &AssistantId,
    ) -> TransportResult<RunHandle> {
        (**self).create_run(thread_id, assistant_id).await
    }

    async fn get_run(&self, thread_id: &ThreadId, run_id: &RunId) -> TransportResult<RunHandle> {
        (**self).get_run(thread_id, run_id).await
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &ThreadId,
        run_id: &RunId,
        outputs: &ToolOutputBatch,
    ) -> TransportResult<RunHandle> {
        (**self).submit_tool_outputs(thread_id, run_id, outputs).await
    }

    async fn list_messages(&self, thread_id: &ThreadId) -> TransportResult<Vec<ThreadMessage>> {
        (**self).list_messages(thread_id).await
    }
}

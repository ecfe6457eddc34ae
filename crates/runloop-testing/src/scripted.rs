use crate::fixtures;
use async_trait::async_trait;
use runloop_core::{
    AssistantId, RunHandle, RunId, RunStatus, RunTransport, ThreadId, ThreadMessage, ToolOutput,
    ToolOutputBatch, TransportError, TransportResult,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

/// One request received by a [`ScriptedTransport`], with the ids it was addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    CreateMessage {
        thread_id: ThreadId,
        content: String,
    },
    CreateRun {
        thread_id: ThreadId,
        assistant_id: AssistantId,
    },
    GetRun {
        thread_id: ThreadId,
        run_id: RunId,
    },
    SubmitToolOutputs {
        thread_id: ThreadId,
        run_id: RunId,
        outputs: Vec<ToolOutput>,
    },
    ListMessages {
        thread_id: ThreadId,
    },
}

#[derive(Default)]
struct Script {
    created: VecDeque<TransportResult<RunHandle>>,
    polls: VecDeque<TransportResult<RunHandle>>,
    last_poll: Option<RunHandle>,
    submits: VecDeque<TransportResult<RunHandle>>,
    messages: Vec<ThreadMessage>,
    create_message_error: Option<TransportError>,
    list_messages_error: Option<TransportError>,
    calls: Vec<TransportCall>,
}

/// In-memory [`RunTransport`] that replays scripted responses.
///
/// `get_run` answers from the poll queue in order and keeps returning the
/// last snapshot once the queue is drained, so a run left `in_progress`
/// stays that way. `create_run` and `submit_tool_outputs` fall back to a
/// queued or in-progress snapshot of the requested ids when nothing is
/// scripted. Clones share the script and the call record.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl std::fmt::Debug for ScriptedTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let script = self.script();
        f.debug_struct("ScriptedTransport")
            .field("pending_polls", &script.polls.len())
            .field("pending_submits", &script.submits.len())
            .field("calls", &script.calls.len())
            .finish()
    }
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot returned by the next `create_run`
    pub fn on_create_run(self, handle: RunHandle) -> Self {
        self.script().created.push_back(Ok(handle));
        self
    }

    pub fn fail_create_run(self, error: TransportError) -> Self {
        self.script().created.push_back(Err(error));
        self
    }

    /// Queue a snapshot for the next `get_run`
    pub fn then_run(self, handle: RunHandle) -> Self {
        self.script().polls.push_back(Ok(handle));
        self
    }

    /// Queue a failure for the next `get_run`
    pub fn then_run_error(self, error: TransportError) -> Self {
        self.script().polls.push_back(Err(error));
        self
    }

    /// Queue the snapshot returned by the next `submit_tool_outputs`
    pub fn then_submit(self, handle: RunHandle) -> Self {
        self.script().submits.push_back(Ok(handle));
        self
    }

    pub fn then_submit_error(self, error: TransportError) -> Self {
        self.script().submits.push_back(Err(error));
        self
    }

    /// Messages returned by `list_messages`, in the order given
    pub fn with_messages(self, messages: Vec<ThreadMessage>) -> Self {
        self.script().messages = messages;
        self
    }

    pub fn fail_create_message(self, error: TransportError) -> Self {
        self.script().create_message_error = Some(error);
        self
    }

    pub fn fail_list_messages(self, error: TransportError) -> Self {
        self.script().list_messages_error = Some(error);
        self
    }

    /// Every request received so far, oldest first
    pub fn calls(&self) -> Vec<TransportCall> {
        self.script().calls.clone()
    }

    pub fn poll_count(&self) -> usize {
        self.script()
            .calls
            .iter()
            .filter(|call| matches!(call, TransportCall::GetRun { .. }))
            .count()
    }

    /// Output batches submitted so far, oldest first
    pub fn submissions(&self) -> Vec<Vec<ToolOutput>> {
        self.script()
            .calls
            .iter()
            .filter_map(|call| match call {
                TransportCall::SubmitToolOutputs { outputs, .. } => Some(outputs.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: TransportCall) {
        self.script().calls.push(call);
    }
}

#[async_trait]
impl RunTransport for ScriptedTransport {
    async fn create_message(&self, thread_id: &ThreadId, content: &str) -> TransportResult<()> {
        self.record(TransportCall::CreateMessage {
            thread_id: thread_id.clone(),
            content: content.to_string(),
        });
        match self.script().create_message_error.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn create_run(
        &self,
        thread_id: &ThreadId,
        assistant_id: &AssistantId,
    ) -> TransportResult<RunHandle> {
        self.record(TransportCall::CreateRun {
            thread_id: thread_id.clone(),
            assistant_id: assistant_id.clone(),
        });
        self.script().created.pop_front().unwrap_or_else(|| {
            Ok(RunHandle::new(
                fixtures::run_id(),
                thread_id.clone(),
                RunStatus::Queued,
            ))
        })
    }

    async fn get_run(&self, thread_id: &ThreadId, run_id: &RunId) -> TransportResult<RunHandle> {
        self.record(TransportCall::GetRun {
            thread_id: thread_id.clone(),
            run_id: run_id.clone(),
        });
        let mut script = self.script();
        match script.polls.pop_front() {
            Some(Ok(handle)) => {
                script.last_poll = Some(handle.clone());
                Ok(handle)
            }
            Some(Err(error)) => Err(error),
            None => script
                .last_poll
                .clone()
                .ok_or_else(|| TransportError::protocol("no run snapshot scripted")),
        }
    }

    async fn submit_tool_outputs(
        &self,
        thread_id: &ThreadId,
        run_id: &RunId,
        outputs: &ToolOutputBatch,
    ) -> TransportResult<RunHandle> {
        self.record(TransportCall::SubmitToolOutputs {
            thread_id: thread_id.clone(),
            run_id: run_id.clone(),
            outputs: outputs.outputs().to_vec(),
        });
        self.script().submits.pop_front().unwrap_or_else(|| {
            Ok(RunHandle::new(
                run_id.clone(),
                thread_id.clone(),
                RunStatus::InProgress,
            ))
        })
    }

    async fn list_messages(&self, thread_id: &ThreadId) -> TransportResult<Vec<ThreadMessage>> {
        self.record(TransportCall::ListMessages {
            thread_id: thread_id.clone(),
        });
        let script = self.script();
        match &script.list_messages_error {
            Some(error) => Err(error.clone()),
            None => Ok(script.messages.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{assistant_id, run, thread_id};

    #[tokio::test]
    async fn last_snapshot_repeats_after_queue_drains() {
        let transport = ScriptedTransport::new()
            .then_run(run(RunStatus::Queued))
            .then_run(run(RunStatus::InProgress));

        for expected in [RunStatus::Queued, RunStatus::InProgress, RunStatus::InProgress] {
            let handle = transport
                .get_run(&thread_id(), &fixtures::run_id())
                .await
                .unwrap();
            assert_eq!(handle.status, expected);
        }
        assert_eq!(transport.poll_count(), 3);
    }

    #[tokio::test]
    async fn empty_poll_script_is_protocol_error() {
        let transport = ScriptedTransport::new();
        let err = transport
            .get_run(&thread_id(), &fixtures::run_id())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Protocol { .. }));
    }

    #[tokio::test]
    async fn records_ids_per_request() {
        let transport = ScriptedTransport::new();
        let clone = transport.clone();
        let created = clone.create_run(&thread_id(), &assistant_id()).await.unwrap();
        assert_eq!(created.thread_id, thread_id());
        assert_eq!(created.status, RunStatus::Queued);

        assert_eq!(
            transport.calls(),
            vec![TransportCall::CreateRun {
                thread_id: thread_id(),
                assistant_id: assistant_id(),
            }]
        );
    }

    #[tokio::test]
    async fn scripted_errors_surface_once() {
        let transport = ScriptedTransport::new()
            .then_run_error(TransportError::connection("reset"))
            .then_run(run(RunStatus::Completed));

        assert!(transport.get_run(&thread_id(), &fixtures::run_id()).await.is_err());
        assert_eq!(
            transport
                .get_run(&thread_id(), &fixtures::run_id())
                .await
                .unwrap()
                .status,
            RunStatus::Completed
        );
    }
}

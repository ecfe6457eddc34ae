//! Every fixture uses the same thread, run and assistant ids so snapshots
//! line up with what [`ScriptedTransport`](crate::ScriptedTransport) hands
//! out from `create_run`.

use runloop_core::{
    AssistantId, CallId, MessageId, MessageRole, NonEmptyVec, RunHandle, RunId, RunStatus,
    ThreadId, ThreadMessage, ToolArguments, ToolCallRequest,
};
use serde_json::Value;

pub const THREAD_ID: &str = "thread_fixture";
pub const RUN_ID: &str = "run_fixture";
pub const ASSISTANT_ID: &str = "asst_fixture";

pub fn thread_id() -> ThreadId {
    ThreadId::new_unchecked(THREAD_ID)
}

pub fn run_id() -> RunId {
    RunId::new_unchecked(RUN_ID)
}

pub fn assistant_id() -> AssistantId {
    AssistantId::new_unchecked(ASSISTANT_ID)
}

/// Snapshot of the fixture run in `status`
pub fn run(status: RunStatus) -> RunHandle {
    RunHandle::new(run_id(), thread_id(), status)
}

/// `requires_action` snapshot asking for `calls`
pub fn requires_action(head: ToolCallRequest, tail: Vec<ToolCallRequest>) -> RunHandle {
    run(RunStatus::RequiresAction).with_tool_calls(NonEmptyVec::new(head, tail))
}

/// A tool call whose arguments arrive as the given JSON text
pub fn tool_call(call_id: &str, name: &str, arguments: &str) -> ToolCallRequest {
    ToolCallRequest::new(
        CallId::new_unchecked(call_id),
        name,
        ToolArguments::from_json_str(arguments),
    )
}

/// A tool call built from an argument object
pub fn tool_call_json(call_id: &str, name: &str, arguments: Value) -> ToolCallRequest {
    tool_call(call_id, name, &arguments.to_string())
}

pub fn assistant_message(id: &str, created_at: i64, text: &str) -> ThreadMessage {
    ThreadMessage {
        id: MessageId::new_unchecked(id),
        role: MessageRole::Assistant,
        run_id: Some(run_id()),
        created_at,
        text: text.to_string(),
    }
}

pub fn user_message(id: &str, created_at: i64, text: &str) -> ThreadMessage {
    ThreadMessage {
        id: MessageId::new_unchecked(id),
        role: MessageRole::User,
        run_id: None,
        created_at,
        text: text.to_string(),
    }
}

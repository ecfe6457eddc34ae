//! Wire types of the Assistants v2 API and their conversion into the core model.

use crate::model::Model;
use runloop_core::{
    CallId, IdValidationError, MessageId, MessageRole, NonEmptyVec, RunHandle, RunId, RunStatus,
    ThreadId, ThreadMessage, ToolArguments, ToolCallRequest, ToolOutputBatch, TransportError,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub struct ThreadObject {
    pub id: String,
    #[serde(default)]
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateMessageRequest<'a> {
    pub role: MessageRole,
    pub content: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateRunRequest<'a> {
    pub assistant_id: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolOutputObject<'a> {
    pub tool_call_id: &'a str,
    pub output: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitToolOutputsRequest<'a> {
    pub tool_outputs: Vec<ToolOutputObject<'a>>,
    pub stream: bool,
}

impl<'a> SubmitToolOutputsRequest<'a> {
    pub fn new(batch: &'a ToolOutputBatch) -> Self {
        Self {
            tool_outputs: batch
                .outputs()
                .iter()
                .map(|o| ToolOutputObject {
                    tool_call_id: o.call_id.as_str(),
                    output: &o.output,
                })
                .collect(),
            stream: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunObject {
    pub id: String,
    pub thread_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub assistant_id: Option<String>,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub last_error: Option<LastError>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequiredAction {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub submit_tool_outputs: Option<SubmitToolOutputs>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitToolOutputs {
    #[serde(default)]
    pub tool_calls: Vec<ToolCallObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallObject {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded argument object
    #[serde(default)]
    pub arguments: String,
}

/// Failure detail of a run; older payloads carry a bare string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum LastError {
    Detail {
        #[serde(default)]
        code: Option<String>,
        message: String,
    },
    Text(String),
}

impl LastError {
    pub fn describe(&self) -> String {
        match self {
            LastError::Detail {
                code: Some(code),
                message,
            } => format!("{code}: {message}"),
            LastError::Detail { code: None, message } => message.clone(),
            LastError::Text(text) => text.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageObject {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub content: Vec<MessageContent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: TextContent },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextContent {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageList {
    pub data: Vec<MessageObject>,
    #[serde(default)]
    pub has_more: bool,
}

/// Request body for `POST /assistants`.
#[derive(Debug, Clone, Serialize)]
pub struct AssistantRequest {
    pub name: String,
    pub model: Model,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<AssistantTool>,
}

impl AssistantRequest {
    pub fn new(name: impl Into<String>, model: Model) -> Self {
        Self {
            name: name.into(),
            model,
            instructions: None,
            response_format: None,
            tools: Vec::new(),
        }
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = Some(instructions.into());
        self
    }

    pub fn response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    pub fn tool(mut self, tool: AssistantTool) -> Self {
        self.tools.push(tool);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantTool {
    Function { function: FunctionDefinition },
}

impl AssistantTool {
    /// Function tool taking the parameter object described by `parameters`
    pub fn function(name: impl Into<String>, parameters: Value) -> Self {
        Self::Function {
            function: FunctionDefinition {
                name: name.into(),
                description: None,
                parameters,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    Text,
    JsonObject,
    JsonSchema { json_schema: JsonSchemaFormat },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonSchemaFormat {
    pub name: String,
    pub strict: bool,
    pub schema: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantObject {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub model: String,
}

fn remote_id<T, F>(kind: &str, raw: &str, parse: F) -> Result<T, TransportError>
where
    F: FnOnce(&str) -> Result<T, IdValidationError>,
{
    parse(raw).map_err(|e| TransportError::protocol(format!("invalid {kind} id {raw:?}: {e}")))
}

pub(crate) fn thread_id(raw: &str) -> Result<ThreadId, TransportError> {
    remote_id("thread", raw, |s| ThreadId::parse(s))
}

impl TryFrom<RunObject> for RunHandle {
    type Error = TransportError;

    fn try_from(run: RunObject) -> Result<Self, Self::Error> {
        let run_id = remote_id("run", &run.id, |s| RunId::parse(s))?;
        let thread_id = thread_id(&run.thread_id)?;

        let calls = run
            .required_action
            .and_then(|action| action.submit_tool_outputs)
            .map(|outputs| outputs.tool_calls)
            .unwrap_or_default()
            .into_iter()
            .map(ToolCallRequest::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        let mut handle = RunHandle::new(run_id, thread_id, run.status);
        if let Ok(calls) = NonEmptyVec::try_from(calls) {
            handle = handle.with_tool_calls(calls);
        }
        if let Some(error) = run.last_error {
            handle = handle.with_last_error(error.describe());
        }
        Ok(handle)
    }
}

impl TryFrom<ToolCallObject> for ToolCallRequest {
    type Error = TransportError;

    fn try_from(call: ToolCallObject) -> Result<Self, Self::Error> {
        let call_id = remote_id("tool call", &call.id, |s| CallId::parse(s))?;
        Ok(ToolCallRequest::new(
            call_id,
            call.function.name,
            ToolArguments::from_json_str(&call.function.arguments),
        ))
    }
}

impl TryFrom<MessageObject> for ThreadMessage {
    type Error = TransportError;

    fn try_from(message: MessageObject) -> Result<Self, Self::Error> {
        let id = remote_id("message", &message.id, |s| MessageId::parse(s))?;
        let run_id = message
            .run_id
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(|raw| remote_id("run", raw, |s| RunId::parse(s)))
            .transpose()?;
        let text = message
            .content
            .iter()
            .filter_map(|part| match part {
                MessageContent::Text { text } => Some(text.value.as_str()),
                MessageContent::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(ThreadMessage {
            id,
            role: message.role,
            run_id,
            created_at: message.created_at,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_with_tool_calls_converts() {
        let run: RunObject = serde_json::from_value(json!({
            "id": "run_1",
            "object": "thread.run",
            "thread_id": "thread_1",
            "assistant_id": "asst_1",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "evaluate", "arguments": "{\"depth\":\"12\"}"}
                    }]
                }
            },
            "last_error": null
        }))
        .unwrap();

        let handle = RunHandle::try_from(run).unwrap();
        let calls = handle.pending_calls().unwrap();
        assert_eq!(calls.head().call_id.as_str(), "call_1");
        assert_eq!(calls.head().name, "evaluate");
        match &calls.head().arguments {
            ToolArguments::Bag(bag) => assert_eq!(bag.get("depth"), Some(&json!("12"))),
            other => panic!("unexpected arguments: {other:?}"),
        }
    }

    #[test]
    fn last_error_object_and_string() {
        let detail: LastError =
            serde_json::from_value(json!({"code": "rate_limit_exceeded", "message": "slow down"}))
                .unwrap();
        assert_eq!(detail.describe(), "rate_limit_exceeded: slow down");

        let text: LastError = serde_json::from_value(json!("boom")).unwrap();
        assert_eq!(text.describe(), "boom");
    }

    #[test]
    fn message_text_parts_are_joined() {
        let message: MessageObject = serde_json::from_value(json!({
            "id": "msg_1",
            "role": "assistant",
            "created_at": 1_700_000_000,
            "run_id": "run_1",
            "content": [
                {"type": "text", "text": {"value": "{\"a\":", "annotations": []}},
                {"type": "image_file", "image_file": {"file_id": "file_1"}},
                {"type": "text", "text": {"value": "1}", "annotations": []}}
            ]
        }))
        .unwrap();

        let message = ThreadMessage::try_from(message).unwrap();
        assert_eq!(message.text, "{\"a\":\n1}");
        assert_eq!(message.run_id.unwrap().as_str(), "run_1");
    }

    #[test]
    fn submit_request_is_not_streamed() {
        let batch = ToolOutputBatch::new(vec![runloop_core::ToolOutput::new(
            CallId::new_unchecked("call_1"),
            "42",
        )]);
        let body = serde_json::to_value(SubmitToolOutputsRequest::new(&batch)).unwrap();
        assert_eq!(
            body,
            json!({"tool_outputs": [{"tool_call_id": "call_1", "output": "42"}], "stream": false})
        );
    }

    #[test]
    fn invalid_remote_ids_are_protocol_errors() {
        let run: RunObject = serde_json::from_value(json!({
            "id": "run 1", "thread_id": "thread_1", "status": "queued"
        }))
        .unwrap();
        assert!(matches!(
            RunHandle::try_from(run),
            Err(TransportError::Protocol { .. })
        ));
    }
}

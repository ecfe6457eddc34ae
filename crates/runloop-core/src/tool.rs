//! Tool-call requests surfaced by a run and the outputs submitted back.

use crate::collections::NonEmptyVec;
use crate::error::OutputCoverageError;
use crate::identifiers::CallId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};

/// Raw, weakly-typed arguments of one tool call, keyed by parameter name.
///
/// Values are whatever the remote produced: usually JSON scalars, but
/// arrays and objects are frequently sent as JSON-encoded strings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ArgumentBag(Map<String, Value>);

impl ArgumentBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the JSON-encoded argument string the remote attaches to a call.
    ///
    /// An empty or whitespace-only string is an empty bag; anything that is
    /// not a JSON object is rejected.
    pub fn from_json_str(raw: &str) -> Result<Self, MalformedArguments> {
        if raw.trim().is_empty() {
            return Ok(Self::new());
        }
        let value: Value = serde_json::from_str(raw).map_err(|e| MalformedArguments {
            raw: raw.to_string(),
            reason: e.to_string(),
        })?;
        Self::try_from(value).map_err(|mut err| {
            err.raw = raw.to_string();
            err
        })
    }

    /// Add an argument using the builder pattern.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for ArgumentBag {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for ArgumentBag {
    type Error = MalformedArguments;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::new()),
            other => Err(MalformedArguments {
                reason: format!("expected a JSON object, found {}", json_kind(&other)),
                raw: other.to_string(),
            }),
        }
    }
}

/// Arguments that could not be decoded into an [`ArgumentBag`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed tool arguments {raw:?}: {reason}")]
pub struct MalformedArguments {
    pub raw: String,
    pub reason: String,
}

/// Arguments attached to a tool call, as received.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolArguments {
    /// Arguments decoded into a name/value bag
    Bag(ArgumentBag),
    /// The remote sent something that is not an argument object
    Malformed(MalformedArguments),
}

impl ToolArguments {
    /// Decode a JSON-encoded argument string, keeping the failure instead of
    /// dropping the call.
    pub fn from_json_str(raw: &str) -> Self {
        match ArgumentBag::from_json_str(raw) {
            Ok(bag) => ToolArguments::Bag(bag),
            Err(err) => ToolArguments::Malformed(err),
        }
    }
}

impl From<ArgumentBag> for ToolArguments {
    fn from(bag: ArgumentBag) -> Self {
        ToolArguments::Bag(bag)
    }
}

/// One invocation requested by a run in `requires_action`.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolCallRequest {
    pub call_id: CallId,
    /// Logical tool name as sent by the remote (not validated; unknown
    /// names are answered with a `tool_not_found` payload).
    pub name: String,
    pub arguments: ToolArguments,
}

impl ToolCallRequest {
    pub fn new(call_id: CallId, name: impl Into<String>, arguments: impl Into<ToolArguments>) -> Self {
        Self {
            call_id,
            name: name.into(),
            arguments: arguments.into(),
        }
    }
}

/// Result of executing one [`ToolCallRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    pub call_id: CallId,
    pub output: String,
}

impl ToolOutput {
    pub fn new(call_id: CallId, output: impl Into<String>) -> Self {
        Self {
            call_id,
            output: output.into(),
        }
    }
}

/// All outputs produced for one dispatch batch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutputBatch {
    outputs: Vec<ToolOutput>,
}

impl ToolOutputBatch {
    pub fn new(outputs: Vec<ToolOutput>) -> Self {
        Self { outputs }
    }

    pub fn outputs(&self) -> &[ToolOutput] {
        &self.outputs
    }

    pub fn len(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }

    pub fn get(&self, call_id: &CallId) -> Option<&ToolOutput> {
        self.outputs.iter().find(|o| &o.call_id == call_id)
    }

    pub fn into_outputs(self) -> Vec<ToolOutput> {
        self.outputs
    }

    /// Check that this batch answers every request exactly once and nothing else.
    ///
    /// A run left waiting on an unanswered call id never resumes, so this is
    /// checked before every submission.
    pub fn ensure_covers(
        &self,
        requests: &NonEmptyVec<ToolCallRequest>,
    ) -> Result<(), OutputCoverageError> {
        let mut seen: HashMap<&CallId, usize> = HashMap::new();
        for output in &self.outputs {
            *seen.entry(&output.call_id).or_default() += 1;
        }

        let expected: BTreeSet<&CallId> = requests.iter().map(|r| &r.call_id).collect();

        let missing: Vec<CallId> = expected
            .iter()
            .filter(|id| !seen.contains_key(*id))
            .map(|id| (*id).clone())
            .collect();
        let duplicated: Vec<CallId> = seen
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(id, _)| (*id).clone())
            .collect();
        let unexpected: Vec<CallId> = seen
            .keys()
            .filter(|id| !expected.contains(*id))
            .map(|id| (*id).clone())
            .collect();

        if missing.is_empty() && duplicated.is_empty() && unexpected.is_empty() {
            Ok(())
        } else {
            Err(OutputCoverageError {
                missing,
                duplicated,
                unexpected,
            })
        }
    }
}

impl FromIterator<ToolOutput> for ToolOutputBatch {
    fn from_iter<I: IntoIterator<Item = ToolOutput>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(id: &str) -> ToolCallRequest {
        ToolCallRequest::new(CallId::new_unchecked(id), "echo", ArgumentBag::new())
    }

    #[test]
    fn decodes_argument_string() {
        let bag = ArgumentBag::from_json_str(r#"{"position":"8/5k2","depth":"12"}"#).unwrap();
        assert_eq!(bag.get("position"), Some(&json!("8/5k2")));
        assert_eq!(bag.len(), 2);
    }

    #[test]
    fn empty_argument_string_is_empty_bag() {
        assert!(ArgumentBag::from_json_str("  ").unwrap().is_empty());
    }

    #[test]
    fn non_object_arguments_are_malformed() {
        let err = ArgumentBag::from_json_str("[1,2]").unwrap_err();
        assert_eq!(err.raw, "[1,2]");
        assert!(err.reason.contains("an array"));

        assert!(matches!(
            ToolArguments::from_json_str("{not json"),
            ToolArguments::Malformed(_)
        ));
    }

    #[test]
    fn coverage_accepts_exact_answer_set() {
        let requests = NonEmptyVec::new(call("call_1"), vec![call("call_2")]);
        let batch: ToolOutputBatch = vec![
            ToolOutput::new(CallId::new_unchecked("call_2"), "b"),
            ToolOutput::new(CallId::new_unchecked("call_1"), "a"),
        ]
        .into_iter()
        .collect();

        assert!(batch.ensure_covers(&requests).is_ok());
    }

    #[test]
    fn coverage_reports_missing_duplicate_and_foreign_ids() {
        let requests = NonEmptyVec::new(call("call_1"), vec![call("call_2")]);
        let batch = ToolOutputBatch::new(vec![
            ToolOutput::new(CallId::new_unchecked("call_1"), "a"),
            ToolOutput::new(CallId::new_unchecked("call_1"), "again"),
            ToolOutput::new(CallId::new_unchecked("call_9"), "stray"),
        ]);

        let err = batch.ensure_covers(&requests).unwrap_err();
        assert_eq!(err.missing, vec![CallId::new_unchecked("call_2")]);
        assert_eq!(err.duplicated, vec![CallId::new_unchecked("call_1")]);
        assert_eq!(err.unexpected, vec![CallId::new_unchecked("call_9")]);
    }
}

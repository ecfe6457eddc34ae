use runloop_core::RegistryResult;
use runloop_tools::{RegistryBuilder, ToolProvider};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
enum Reply {
    Echo,
    Fixed(Value),
    Fail(String),
}

/// A one-parameter tool that records every argument it receives.
///
/// Register it through [`ToolProvider`]; clones share the recorded history,
/// so keep one clone in the test to inspect calls after the run.
#[derive(Debug, Clone)]
pub struct RecordingTool {
    name: String,
    parameter: String,
    reply: Reply,
    calls: Arc<Mutex<Vec<Value>>>,
}

impl RecordingTool {
    /// Tool that returns its argument unchanged
    pub fn echo(name: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameter: parameter.into(),
            reply: Reply::Echo,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Reply with `value` for every call
    pub fn returning(mut self, value: impl Into<Value>) -> Self {
        self.reply = Reply::Fixed(value.into());
        self
    }

    /// Fail every call with `message`
    pub fn failing(mut self, message: impl Into<String>) -> Self {
        self.reply = Reply::Fail(message.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn history(&self) -> MutexGuard<'_, Vec<Value>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn call_count(&self) -> usize {
        self.history().len()
    }

    /// Arguments received so far, oldest first
    pub fn calls(&self) -> Vec<Value> {
        self.history().clone()
    }

    pub fn was_called_with(&self, argument: &Value) -> bool {
        self.history().contains(argument)
    }

    pub fn reset(&self) {
        self.history().clear();
    }
}

impl ToolProvider for RecordingTool {
    fn register_tools(&self, builder: &mut RegistryBuilder) -> RegistryResult<()> {
        let recorder = self.clone();
        builder.register_sync(&self.name, &[self.parameter.as_str()], move |argument: Value| {
            recorder.history().push(argument.clone());
            match &recorder.reply {
                Reply::Echo => Ok(argument),
                Reply::Fixed(value) => Ok(value.clone()),
                Reply::Fail(message) => Err(message.clone()),
            }
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runloop_core::ArgumentBag;
    use runloop_tools::ToolRegistry;
    use serde_json::json;

    #[tokio::test]
    async fn records_and_echoes() {
        let tool = RecordingTool::echo("echo", "text");
        let registry = ToolRegistry::discover([&tool as &dyn ToolProvider]).unwrap();
        let descriptor = registry.lookup("echo").unwrap();

        let args = ArgumentBag::new().with("text", "hello");
        let output = descriptor.bind(&args).unwrap().await;

        assert_eq!(output, Ok(json!("hello")));
        assert_eq!(tool.call_count(), 1);
        assert!(tool.was_called_with(&json!("hello")));
    }

    #[tokio::test]
    async fn failing_tool_reports_message() {
        let tool = RecordingTool::echo("lookup", "key").failing("backend down");
        let registry = ToolRegistry::discover([&tool as &dyn ToolProvider]).unwrap();

        let args = ArgumentBag::new().with("key", "k1");
        let output = registry.lookup("lookup").unwrap().bind(&args).unwrap().await;

        assert_eq!(output, Err("backend down".to_string()));
        assert_eq!(tool.calls(), vec![json!("k1")]);
    }
}

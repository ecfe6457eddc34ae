use crate::handler::{
    AsyncAdapter, ErasedHandler, HandlerDescriptor, SyncAdapter, SyncToolHandler, ToolHandler,
};
use runloop_core::{RegistryError, RegistryResult, ToolName};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Something that contributes tools to a registry.
///
/// Host modules implement this instead of relying on runtime discovery;
/// [`ToolRegistry::discover`] collects every provider once at startup.
pub trait ToolProvider {
    /// Register this provider's tools on the builder.
    ///
    /// # Errors
    ///
    /// Returns the first `RegistryError` raised by a registration.
    fn register_tools(&self, builder: &mut RegistryBuilder) -> RegistryResult<()>;
}

impl<F> ToolProvider for F
where
    F: Fn(&mut RegistryBuilder) -> RegistryResult<()>,
{
    fn register_tools(&self, builder: &mut RegistryBuilder) -> RegistryResult<()> {
        self(builder)
    }
}

/// Builder collecting tool registrations.
///
/// Every problem with a registration (duplicate or invalid name, parameter
/// list not matching the handler's arity, repeated parameter names) is
/// reported here, before any run starts.
///
/// # Example
///
/// ```rust
/// use runloop_tools::RegistryBuilder;
///
/// async fn add(a: i64, b: i64) -> Result<i64, String> {
///     Ok(a + b)
/// }
///
/// let mut builder = RegistryBuilder::new();
/// builder.register("add", &["a", "b"], add).unwrap();
/// builder
///     .register_sync("shout", &["text"], |text: String| {
///         Ok::<_, String>(text.to_uppercase())
///     })
///     .unwrap();
///
/// let registry = builder.build();
/// assert_eq!(registry.tool_names(), vec!["add", "shout"]);
/// ```
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    tools: BTreeMap<ToolName, HandlerDescriptor>,
}

impl RegistryBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async handler.
    ///
    /// # Parameters
    ///
    /// * `name` - Logical tool name the remote will call
    /// * `parameters` - Argument names, in the order the handler takes them
    /// * `handler` - Async function or closure of up to six [`ToolArg`](crate::ToolArg) parameters
    ///
    /// # Returns
    ///
    /// The builder for chaining, or the `RegistryError` describing why the
    /// registration was rejected.
    pub fn register<H, Args>(
        &mut self,
        name: &str,
        parameters: &[&str],
        handler: H,
    ) -> RegistryResult<&mut Self>
    where
        H: ToolHandler<Args>,
        Args: 'static,
    {
        let expected = H::parameter_types().len();
        self.insert(name, parameters, expected, Arc::new(AsyncAdapter::new(handler)))
    }

    /// Register a synchronous handler.
    ///
    /// Same contract as [`register`](Self::register) for a plain function.
    pub fn register_sync<H, Args>(
        &mut self,
        name: &str,
        parameters: &[&str],
        handler: H,
    ) -> RegistryResult<&mut Self>
    where
        H: SyncToolHandler<Args>,
        Args: 'static,
    {
        let expected = H::parameter_types().len();
        self.insert(name, parameters, expected, Arc::new(SyncAdapter::new(handler)))
    }

    fn insert(
        &mut self,
        name: &str,
        parameters: &[&str],
        expected: usize,
        handler: Arc<dyn ErasedHandler>,
    ) -> RegistryResult<&mut Self> {
        let tool_name = ToolName::parse(name).map_err(|source| RegistryError::InvalidToolName {
            name: name.to_string(),
            source,
        })?;

        if self.tools.contains_key(&tool_name) {
            return Err(RegistryError::DuplicateTool {
                name: name.to_string(),
            });
        }

        if parameters.len() != expected {
            return Err(RegistryError::ArityMismatch {
                tool: name.to_string(),
                declared: parameters.len(),
                expected,
            });
        }

        let mut seen = HashSet::new();
        for parameter in parameters {
            if !seen.insert(*parameter) {
                return Err(RegistryError::DuplicateParameter {
                    tool: name.to_string(),
                    parameter: (*parameter).to_string(),
                });
            }
        }

        debug!(tool = %tool_name, parameters = ?parameters, "Registered tool");
        let names = parameters.iter().map(|p| (*p).to_string()).collect();
        self.tools.insert(
            tool_name.clone(),
            HandlerDescriptor::new(tool_name, names, handler),
        );
        Ok(self)
    }

    /// Merge another provider's tools into this builder.
    pub fn provide(&mut self, provider: &dyn ToolProvider) -> RegistryResult<&mut Self> {
        provider.register_tools(self)?;
        Ok(self)
    }

    /// Freeze the registrations into an immutable registry.
    pub fn build(self) -> ToolRegistry {
        ToolRegistry {
            tools: Arc::new(self.tools),
        }
    }
}

/// Immutable lookup table of registered tools.
///
/// Cheap to clone; all clones share the same table. Built once at startup
/// and read concurrently by every dispatch afterwards.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<BTreeMap<ToolName, HandlerDescriptor>>,
}

impl ToolRegistry {
    /// Start a new builder.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Run discovery over every provider once and return the resulting registry.
    ///
    /// # Errors
    ///
    /// Returns the first `RegistryError` any provider raises, including a
    /// tool name contributed by two different providers.
    pub fn discover<'a, I>(providers: I) -> RegistryResult<Self>
    where
        I: IntoIterator<Item = &'a dyn ToolProvider>,
    {
        let mut builder = RegistryBuilder::new();
        for provider in providers {
            builder.provide(provider)?;
        }
        let registry = builder.build();
        info!(tools = registry.len(), "Tool discovery finished");
        Ok(registry)
    }

    /// Find the handler registered under `name`.
    ///
    /// Names that are not valid tool names simply are not found.
    pub fn lookup(&self, name: &str) -> Option<&HandlerDescriptor> {
        let name = ToolName::parse(name).ok()?;
        self.tools.get(&name)
    }

    /// Registered tool names, sorted.
    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.keys().map(ToolName::as_str).collect()
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &HandlerDescriptor> {
        self.tools.values()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Json, ParamType};
    use runloop_core::ArgumentBag;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Position {
        fen: String,
    }

    async fn evaluate(position: Json<Position>, depth: u32) -> Result<String, String> {
        Ok(format!("{}@{}", position.fen, depth))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut builder = RegistryBuilder::new();
        builder
            .register("evaluate", &["position", "depth"], evaluate)
            .unwrap();
        let registry = builder.build();

        let descriptor = registry.lookup("evaluate").unwrap();
        assert_eq!(descriptor.name().as_str(), "evaluate");
        assert_eq!(descriptor.parameters()[1].name, "depth");
        assert_eq!(descriptor.parameters()[1].param_type, ParamType::Integer);
        assert!(registry.lookup("missing").is_none());
        assert!(registry.lookup("not a name").is_none());
    }

    #[test]
    fn test_duplicate_tool_rejected() {
        let mut builder = RegistryBuilder::new();
        builder
            .register("evaluate", &["position", "depth"], evaluate)
            .unwrap();
        let err = builder
            .register("evaluate", &["position", "depth"], evaluate)
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateTool {
                name: "evaluate".into()
            }
        );
    }

    #[test]
    fn test_arity_mismatch_rejected() {
        let err = RegistryBuilder::new()
            .register("evaluate", &["position"], evaluate)
            .map(|_| ())
            .unwrap_err();
        assert_eq!(
            err,
            RegistryError::ArityMismatch {
                tool: "evaluate".into(),
                declared: 1,
                expected: 2,
            }
        );
    }

    #[test]
    fn test_duplicate_parameter_rejected() {
        let err = RegistryBuilder::new()
            .register_sync("sum", &["x", "x"], |a: i64, b: i64| Ok::<_, String>(a + b))
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateParameter { parameter, .. } if parameter == "x"));
    }

    #[test]
    fn test_invalid_name_rejected() {
        let err = RegistryBuilder::new()
            .register_sync("math.add", &[], || Ok::<_, String>(()))
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, RegistryError::InvalidToolName { .. }));
    }

    #[test]
    fn test_discover_merges_providers() {
        let chess = |builder: &mut RegistryBuilder| -> RegistryResult<()> {
            builder.register("evaluate", &["position", "depth"], evaluate)?;
            Ok(())
        };
        let clock = |builder: &mut RegistryBuilder| -> RegistryResult<()> {
            builder.register_sync("now", &[], || Ok::<_, String>(0_i64))?;
            Ok(())
        };

        let registry = ToolRegistry::discover([
            &chess as &dyn ToolProvider,
            &clock as &dyn ToolProvider,
        ])
        .unwrap();
        assert_eq!(registry.tool_names(), vec!["evaluate", "now"]);

        let again = ToolRegistry::discover([&chess as &dyn ToolProvider, &chess]);
        assert!(matches!(again, Err(RegistryError::DuplicateTool { .. })));
    }

    #[test]
    fn test_parameters_schema() {
        let mut builder = RegistryBuilder::new();
        builder
            .register_sync("greet", &["name", "loud"], |name: String, loud: Option<bool>| {
                Ok::<_, String>(if loud.unwrap_or(false) {
                    name.to_uppercase()
                } else {
                    name
                })
            })
            .unwrap();
        let registry = builder.build();
        let schema = registry.lookup("greet").unwrap().parameters_schema();

        assert_eq!(schema["properties"]["name"], json!({"type": "string"}));
        assert_eq!(schema["required"], json!(["name"]));
    }

    #[tokio::test]
    async fn test_bound_call_runs_handler() {
        let mut builder = RegistryBuilder::new();
        builder
            .register("evaluate", &["position", "depth"], evaluate)
            .unwrap();
        let registry = builder.build();

        let args = ArgumentBag::new()
            .with("position", r#"{"fen":"8/8/8"}"#)
            .with("depth", "12");
        let call = registry.lookup("evaluate").unwrap().bind(&args).unwrap();

        assert_eq!(call.await, Ok(json!("8/8/8@12")));
    }
}

//! Typed tool handlers and their type-erased form.
//!
//! Async functions and closures of up to six [`ToolArg`] parameters implement
//! [`ToolHandler`]; plain functions implement [`SyncToolHandler`] and run on
//! the blocking thread pool. Both are erased behind [`ErasedHandler`] so a
//! registry can hold tools of any signature.

use crate::arg::{ParamType, ToolArg};
use runloop_core::{ArgumentBag, CoercionError, ToolName};
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt::{self, Display};
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

/// Outcome of one handler invocation: the serialized result or the handler's error text.
pub type ToolOutcome = Result<Value, String>;

/// A bound invocation, ready to be polled on any task.
pub type ToolFuture = Pin<Box<dyn Future<Output = ToolOutcome> + Send + 'static>>;

/// Async tool handler taking the arguments `Args` (a tuple of [`ToolArg`]s).
pub trait ToolHandler<Args>: Clone + Send + Sync + 'static {
    fn parameter_types() -> Vec<ParamType>;

    /// Coerce every argument, then start the call
    fn bind(&self, names: &[String], args: &ArgumentBag) -> Result<ToolFuture, CoercionError>;
}

/// Synchronous tool handler; each call runs under `spawn_blocking`.
pub trait SyncToolHandler<Args>: Clone + Send + Sync + 'static {
    fn parameter_types() -> Vec<ParamType>;

    fn bind(&self, names: &[String], args: &ArgumentBag) -> Result<ToolFuture, CoercionError>;
}

fn bind_arg<T: ToolArg>(name: Option<&String>, args: &ArgumentBag) -> Result<T, CoercionError> {
    let name = name.map(String::as_str).unwrap_or_default();
    match args.get(name) {
        Some(raw) => T::coerce(name, raw),
        None => T::absent(name),
    }
}

fn finish<R: Serialize, E: Display>(result: Result<R, E>) -> ToolOutcome {
    match result {
        Ok(value) => serde_json::to_value(value)
            .map_err(|e| format!("result could not be serialized: {e}")),
        Err(err) => Err(err.to_string()),
    }
}

/// Run a synchronous call on the blocking thread pool.
///
/// A panic inside `call` is resumed on the awaiting task, where the dispatch
/// executor reports it like a panicking async handler.
fn blocking<F>(call: F) -> ToolFuture
where
    F: FnOnce() -> ToolOutcome + Send + 'static,
{
    Box::pin(async move {
        match tokio::task::spawn_blocking(call).await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => Err(format!("blocking call did not complete: {err}")),
        }
    })
}

macro_rules! impl_handlers {
    ($($ty:ident),*) => {
        impl<F, Fut, R, E, $($ty,)*> ToolHandler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> Fut + Clone + Send + Sync + 'static,
            Fut: Future<Output = Result<R, E>> + Send + 'static,
            R: Serialize,
            E: Display,
            $($ty: ToolArg,)*
        {
            fn parameter_types() -> Vec<ParamType> {
                vec![$($ty::param_type()),*]
            }

            #[allow(non_snake_case, unused_variables, unused_mut)]
            fn bind(&self, names: &[String], args: &ArgumentBag) -> Result<ToolFuture, CoercionError> {
                let mut names = names.iter();
                $(let $ty = bind_arg::<$ty>(names.next(), args)?;)*
                let call = (self)($($ty),*);
                Ok(Box::pin(async move { finish(call.await) }))
            }
        }

        impl<F, R, E, $($ty,)*> SyncToolHandler<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> Result<R, E> + Clone + Send + Sync + 'static,
            R: Serialize,
            E: Display,
            $($ty: ToolArg,)*
        {
            fn parameter_types() -> Vec<ParamType> {
                vec![$($ty::param_type()),*]
            }

            #[allow(non_snake_case, unused_variables, unused_mut)]
            fn bind(&self, names: &[String], args: &ArgumentBag) -> Result<ToolFuture, CoercionError> {
                let mut names = names.iter();
                $(let $ty = bind_arg::<$ty>(names.next(), args)?;)*
                let handler = self.clone();
                Ok(blocking(move || finish(handler($($ty),*))))
            }
        }
    };
}

impl_handlers!();
impl_handlers!(T1);
impl_handlers!(T1, T2);
impl_handlers!(T1, T2, T3);
impl_handlers!(T1, T2, T3, T4);
impl_handlers!(T1, T2, T3, T4, T5);
impl_handlers!(T1, T2, T3, T4, T5, T6);

/// Object-safe handler stored in the registry.
pub trait ErasedHandler: Send + Sync {
    fn parameter_types(&self) -> Vec<ParamType>;

    fn bind(&self, names: &[String], args: &ArgumentBag) -> Result<ToolFuture, CoercionError>;
}

pub(crate) struct AsyncAdapter<H, Args> {
    handler: H,
    _args: PhantomData<fn() -> Args>,
}

impl<H, Args> AsyncAdapter<H, Args> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            _args: PhantomData,
        }
    }
}

impl<H, Args> ErasedHandler for AsyncAdapter<H, Args>
where
    H: ToolHandler<Args>,
    Args: 'static,
{
    fn parameter_types(&self) -> Vec<ParamType> {
        H::parameter_types()
    }

    fn bind(&self, names: &[String], args: &ArgumentBag) -> Result<ToolFuture, CoercionError> {
        self.handler.bind(names, args)
    }
}

pub(crate) struct SyncAdapter<H, Args> {
    handler: H,
    _args: PhantomData<fn() -> Args>,
}

impl<H, Args> SyncAdapter<H, Args> {
    pub(crate) fn new(handler: H) -> Self {
        Self {
            handler,
            _args: PhantomData,
        }
    }
}

impl<H, Args> ErasedHandler for SyncAdapter<H, Args>
where
    H: SyncToolHandler<Args>,
    Args: 'static,
{
    fn parameter_types(&self) -> Vec<ParamType> {
        H::parameter_types()
    }

    fn bind(&self, names: &[String], args: &ArgumentBag) -> Result<ToolFuture, CoercionError> {
        self.handler.bind(names, args)
    }
}

/// Name and declared type of one handler parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    pub param_type: ParamType,
}

/// A registered tool: its name, ordered parameters and handler.
#[derive(Clone)]
pub struct HandlerDescriptor {
    name: ToolName,
    parameters: Vec<ParameterSpec>,
    parameter_names: Vec<String>,
    handler: Arc<dyn ErasedHandler>,
}

impl HandlerDescriptor {
    pub(crate) fn new(
        name: ToolName,
        parameter_names: Vec<String>,
        handler: Arc<dyn ErasedHandler>,
    ) -> Self {
        let parameters = parameter_names
            .iter()
            .zip(handler.parameter_types())
            .map(|(name, param_type)| ParameterSpec {
                name: name.clone(),
                param_type,
            })
            .collect();
        Self {
            name,
            parameters,
            parameter_names,
            handler,
        }
    }

    pub fn name(&self) -> &ToolName {
        &self.name
    }

    pub fn parameters(&self) -> &[ParameterSpec] {
        &self.parameters
    }

    /// Coerce `args` against the declared parameters and start the call.
    ///
    /// Arguments not named by any parameter are ignored.
    pub fn bind(&self, args: &ArgumentBag) -> Result<ToolFuture, CoercionError> {
        self.handler.bind(&self.parameter_names, args)
    }

    /// JSON schema of the parameter object, as function tools declare it
    pub fn parameters_schema(&self) -> Value {
        let properties: serde_json::Map<String, Value> = self
            .parameters
            .iter()
            .map(|p| (p.name.clone(), p.param_type.json_schema()))
            .collect();
        let required: Vec<&str> = self
            .parameters
            .iter()
            .filter(|p| !p.param_type.is_optional())
            .map(|p| p.name.as_str())
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }
}

impl fmt::Debug for HandlerDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerDescriptor")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

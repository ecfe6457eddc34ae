//! # Runloop Tools
//!
//! Local tool handlers for assistant runs: a registry built once at startup,
//! typed argument coercion from the remote's weakly-typed JSON, and an
//! executor that runs a whole batch of tool calls concurrently.

pub mod arg;
pub mod coerce;
pub mod dispatch;
pub mod handler;
pub mod registry;

pub use arg::{ArgEnum, Json, ParamType, ToolArg};
pub use dispatch::DispatchExecutor;
pub use handler::{
    ErasedHandler, HandlerDescriptor, ParameterSpec, SyncToolHandler, ToolFuture, ToolHandler,
    ToolOutcome,
};
pub use registry::{RegistryBuilder, ToolProvider, ToolRegistry};

#[doc(hidden)]
pub mod __private {
    pub use runloop_core::CoercionError;
    pub use serde_json::Value;
}

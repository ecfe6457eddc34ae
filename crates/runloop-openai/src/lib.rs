//! # Runloop OpenAI
//!
//! [`RunTransport`](runloop_core::RunTransport) implementation for the
//! OpenAI Assistants v2 HTTP API, plus assistant creation with strict
//! JSON-schema response formats generated from Rust types.

pub mod client;
pub mod config;
pub mod model;
pub mod schema;
pub mod types;

pub use client::OpenAiClient;
pub use config::{ApiKey, OpenAiConfig, OpenAiSection};
pub use model::Model;
pub use schema::response_format_for;
pub use types::{AssistantRequest, AssistantTool, FunctionDefinition, ResponseFormat};

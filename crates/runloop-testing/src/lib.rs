//! # Runloop Testing
//!
//! Deterministic stand-ins for the remote assistant service.
//!
//! - **[`ScriptedTransport`]**: replays run snapshots and records every
//!   request it receives, ids included
//! - **[`RecordingTool`]**: a registrable tool that keeps every argument it
//!   was called with
//! - **[`fixtures`]**: terse constructors for runs, tool calls and messages
//!
//! ```rust
//! use runloop_core::{RunStatus, RunTransport};
//! use runloop_testing::{ScriptedTransport, fixtures};
//!
//! let transport = ScriptedTransport::new()
//!     .then_run(fixtures::run(RunStatus::InProgress))
//!     .then_run(fixtures::run(RunStatus::Completed));
//!
//! let status = tokio_test::block_on(async {
//!     transport.get_run(&fixtures::thread_id(), &fixtures::run_id()).await
//! })
//! .unwrap()
//! .status;
//! assert_eq!(status, RunStatus::InProgress);
//! ```

/// Constructors for run snapshots, tool calls and messages
pub mod fixtures;
/// Registrable tool with call recording
pub mod recording;
/// Scripted [`RunTransport`](runloop_core::RunTransport)
pub mod scripted;

pub use recording::RecordingTool;
pub use scripted::{ScriptedTransport, TransportCall};

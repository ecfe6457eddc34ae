//! Error taxonomy shared by every runloop crate.
//!
//! Each layer has its own enum: transport failures, argument coercion,
//! registry construction, per-call dispatch and whole-run failures.

mod coercion;
mod dispatch;
mod registry;
mod run;
mod transport;

pub use coercion::CoercionError;
pub use dispatch::DispatchError;
pub use registry::{RegistryError, RegistryResult};
pub use run::{OutputCoverageError, RunContext, RunError, RunResult};
pub use transport::{TransportError, TransportResult};

//! # Multiping Common
//!
//! Shared vocabulary of the workspace: the target model, the [`probing::Prober`]
//! port implemented by every protocol, run configuration, and the sealed
//! [`report::RunReport`] handed to rendering code.

pub mod config;
pub mod error;
pub mod inventory;
pub mod network;
pub mod probing;
pub mod report;

pub use config::{AttemptBudget, Backoff, RunConfig};
pub use error::{ConfigurationError, RegistryError};
pub use network::{host::Host, protocol::ProtocolId, protocol::ProtocolSpec, target::Target};
pub use probing::{FailureKind, ProbeOutcome, Prober};
pub use report::{AbortCause, Classification, Counters, RunReport, RunStatus, TargetResult};

//! Orchestrator library for distributed benchmark experiments
//!
//! Starts mailbox, server and client processes on remote hosts over ssh in
//! dependency order, runs the coordinator locally, and tears everything
//! down again however the run ends.

pub mod config;
pub mod core;
pub mod error;
pub mod orchestrator;
pub mod services;
pub mod traits;

// Re-export commonly used types
pub use config::{Args, RunConfig};
pub use crate::core::{ArtifactSet, AssignmentPolicy, ReadinessMode, RoleAssignment, RoleCounts, StageTiming, TeardownReport};
pub use error::{OrchestratorError, OrchestratorResult};
pub use orchestrator::{Orchestrator, RunReport, RunSummary};
pub use traits::{ConfigGenerator, CoordinatorRunner, ProcessHandle, ReadinessProbe, RemoteLauncher, SignalOutcome};

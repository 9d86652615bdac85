//! Trait definitions with mockall annotations for testing
//!
//! Every external collaborator of a run sits behind one of these traits:
//! the config generator binary, the remote shell used to start role
//! processes, the local coordinator, and the readiness probe. The
//! orchestrator is generic over them so runs can be driven end to end
//! against mocks.

use serde::Serialize;
use shared::{AdversarialFraction, Endpoint, Role};
use std::path::Path;
use std::time::Duration;

use crate::core::ArtifactSet;
use crate::error::{OrchestratorError, OrchestratorResult};

/// Local reference to a remotely launched role process
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProcessHandle {
    pub role: Role,
    pub endpoint: Endpoint,
    /// Pid of the local session process; absent when it never started
    pub pid: Option<u32>,
    pub launch_error: Option<String>,
}

impl ProcessHandle {
    pub fn started(role: Role, endpoint: Endpoint, pid: u32) -> Self {
        Self {
            role,
            endpoint,
            pid: Some(pid),
            launch_error: None,
        }
    }

    pub fn failed(role: Role, endpoint: Endpoint, reason: impl Into<String>) -> Self {
        Self {
            role,
            endpoint,
            pid: None,
            launch_error: Some(reason.into()),
        }
    }

    pub fn is_started(&self) -> bool {
        self.pid.is_some()
    }

    /// The launch failure as an error value, if there was one
    pub fn launch_failure(&self) -> Option<OrchestratorError> {
        self.launch_error.as_ref().map(|reason| OrchestratorError::LaunchError {
            role: self.role,
            endpoint: self.endpoint.clone(),
            reason: reason.clone(),
        })
    }
}

/// Result of asking a session to terminate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalOutcome {
    Signalled,
    AlreadyExited { code: Option<i32> },
    NotStarted,
}

/// External tool materializing per-role config files from the manifest
#[mockall::automock]
#[async_trait::async_trait]
pub trait ConfigGenerator: Send + Sync {
    /// Run the generator to completion.
    ///
    /// Fails with `GeneratorError` on a non-zero exit or when any config
    /// file named by `artifacts` is missing afterwards.
    async fn generate(
        &self,
        manifest: &Path,
        fraction: AdversarialFraction,
        artifacts: &ArtifactSet,
    ) -> OrchestratorResult<()>;
}

/// Remote execution of role binaries
#[mockall::automock]
#[async_trait::async_trait]
pub trait RemoteLauncher: Send + Sync {
    /// Start `role` on `endpoint.host` with `args` and return as soon as the
    /// session exists. Launch failures are recorded on the handle.
    async fn launch(&self, role: Role, endpoint: &Endpoint, args: &[String]) -> ProcessHandle;

    /// Interrupt leftover processes of `roles` on `host` and wait for it
    async fn purge(&self, host: &str, roles: &[Role]) -> OrchestratorResult<()>;

    /// Deliver an interrupt to the session without waiting for it to exit
    fn terminate(&self, handle: &ProcessHandle) -> OrchestratorResult<SignalOutcome>;
}

/// Foreground driver of the experiment
#[mockall::automock]
#[async_trait::async_trait]
pub trait CoordinatorRunner: Send + Sync {
    /// Run the coordinator until it exits; a non-zero exit is a `CoordinatorFailure`
    async fn run(&self, artifacts: &ArtifactSet) -> OrchestratorResult<()>;
}

/// Check that launched role instances accept connections
#[mockall::automock]
#[async_trait::async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Wait until every endpoint answers or `timeout` elapses.
    /// Returns the endpoints that never answered.
    async fn wait_ready(&self, endpoints: &[Endpoint], timeout: Duration) -> Vec<Endpoint>;
}

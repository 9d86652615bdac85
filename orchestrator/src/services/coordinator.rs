//! Real coordinator service
//!
//! Runs the local `coordinator` binary in the foreground. The child is
//! killed if the run future is dropped.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::core::ArtifactSet;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::services::command::exit_code;
use crate::traits::CoordinatorRunner;
use shared::{phase_debug, Phase, Role};

/// Runs the coordinator binary in the foreground
pub struct RealCoordinator {
    program: PathBuf,
}

impl RealCoordinator {
    pub fn new(bin_dir: &Path) -> Self {
        Self {
            program: bin_dir.join(Role::Coordinator.binary_name()),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }
}

#[async_trait]
impl CoordinatorRunner for RealCoordinator {
    async fn run(&self, artifacts: &ArtifactSet) -> OrchestratorResult<()> {
        let args = artifacts.role_flags(Role::Coordinator);
        phase_debug!(Phase::Coordinator, "{} {}", self.program.display(), args.join(" "));

        // inherits the terminal; no timeout
        let status = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| OrchestratorError::CoordinatorFailure {
                exit_code: None,
                reason: format!("cannot spawn {}: {e}", self.program.display()),
            })?;

        if status.success() {
            Ok(())
        } else {
            Err(OrchestratorError::CoordinatorFailure {
                exit_code: exit_code(&status),
                reason: format!("coordinator exited with {status}"),
            })
        }
    }
}

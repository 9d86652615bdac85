//! Real config generator service
//!
//! Runs the external `config` binary, which reads the manifest and writes
//! the four per-role config files.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;

use crate::core::ArtifactSet;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::services::command::CommandOutput;
use crate::traits::ConfigGenerator;
use shared::{phase_debug, AdversarialFraction, Phase};

pub const GENERATOR_BINARY: &str = "config";

pub struct RealConfigGenerator {
    program: PathBuf,
    work_dir: PathBuf,
}

impl RealConfigGenerator {
    /// Generator found as `<bin_dir>/config`, run inside `work_dir`
    pub fn new(bin_dir: &Path, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: bin_dir.join(GENERATOR_BINARY),
            work_dir: work_dir.into(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Arguments naming the manifest, the fraction and every output path
    pub fn generator_args(manifest: &Path, fraction: AdversarialFraction, artifacts: &ArtifactSet) -> Vec<String> {
        let mut args = vec![
            "--ips".to_string(),
            manifest.display().to_string(),
            "--f".to_string(),
            fraction.to_string(),
        ];
        args.extend(artifacts.role_flags(shared::Role::Coordinator));
        args
    }
}

#[async_trait]
impl ConfigGenerator for RealConfigGenerator {
    async fn generate(
        &self,
        manifest: &Path,
        fraction: AdversarialFraction,
        artifacts: &ArtifactSet,
    ) -> OrchestratorResult<()> {
        let args = Self::generator_args(manifest, fraction, artifacts);
        phase_debug!(Phase::Config, "{} {}", self.program.display(), args.join(" "));

        let output = Command::new(&self.program)
            .args(&args)
            .current_dir(&self.work_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| OrchestratorError::GeneratorError {
                exit_code: None,
                diagnostics: format!("cannot spawn {}: {e}", self.program.display()),
            })?;

        let output = CommandOutput::from(output);
        if !output.success() {
            return Err(OrchestratorError::GeneratorError {
                exit_code: output.exit_code,
                diagnostics: output.diagnostics(),
            });
        }

        let missing = artifacts.missing_configs();
        if !missing.is_empty() {
            let missing: Vec<String> = missing.iter().map(|path| path.display().to_string()).collect();
            return Err(OrchestratorError::GeneratorError {
                exit_code: output.exit_code,
                diagnostics: format!("generator succeeded but did not write {}", missing.join(", ")),
            });
        }

        Ok(())
    }
}

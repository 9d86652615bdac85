//! Staged startup: mailboxes, then servers, then clients.
//!
//! Later roles dial earlier ones as soon as they start and do not retry, so
//! a stage only begins once the pause after the previous stage has elapsed.
//! With `ReadinessMode::Tcp` the sequencer also waits for the stage's
//! endpoints to accept connections, bounded by the readiness timeout.

use serde::Serialize;
use shared::{phase_debug, phase_info, phase_warn, Endpoint, Phase, Role};
use std::time::Duration;

use super::artifacts::ArtifactSet;
use super::assignment::RoleAssignment;
use super::teardown::ExperimentRun;
use crate::traits::{ReadinessProbe, RemoteLauncher};

/// How the sequencer decides a stage is up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReadinessMode {
    /// Fixed pause only
    #[default]
    Fixed,
    /// Fixed pause, then poll each endpoint with a TCP connect
    Tcp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageTiming {
    /// Pause after the mailbox and server stages
    pub stage_pause: Duration,
    /// Pause after the client stage, before the coordinator starts
    pub settle_pause: Duration,
    pub readiness: ReadinessMode,
    pub readiness_timeout: Duration,
}

impl Default for StageTiming {
    fn default() -> Self {
        Self {
            stage_pause: Duration::from_millis(500),
            settle_pause: Duration::from_millis(1000),
            readiness: ReadinessMode::Fixed,
            readiness_timeout: Duration::from_secs(5),
        }
    }
}

impl StageTiming {
    /// Pause that follows the stage for `role`
    pub fn pause_after(&self, role: Role) -> Duration {
        if Some(&role) == Role::STARTUP_ORDER.last() {
            self.settle_pause
        } else {
            self.stage_pause
        }
    }
}

/// Command-line arguments for one role instance
pub fn launch_args(role: Role, endpoint: &Endpoint, artifacts: &ArtifactSet) -> Vec<String> {
    let mut args = vec!["--addr".to_string(), endpoint.to_string()];
    args.extend(artifacts.role_flags(role));
    args
}

pub struct StartupSequencer<'a, L, P>
where
    L: RemoteLauncher,
    P: ReadinessProbe,
{
    launcher: &'a L,
    probe: &'a P,
    timing: StageTiming,
}

impl<'a, L, P> StartupSequencer<'a, L, P>
where
    L: RemoteLauncher,
    P: ReadinessProbe,
{
    pub fn new(launcher: &'a L, probe: &'a P, timing: StageTiming) -> Self {
        Self {
            launcher,
            probe,
            timing,
        }
    }

    /// Launch every stage in order, recording each handle in `run`
    pub async fn launch_all(&self, assignment: &RoleAssignment, run: &mut ExperimentRun<'_, L>) {
        for role in Role::STARTUP_ORDER {
            self.launch_stage(role, assignment.endpoints(role), run).await;
            self.await_stage(role, run).await;
        }
    }

    async fn launch_stage(&self, role: Role, endpoints: &[Endpoint], run: &mut ExperimentRun<'_, L>) {
        let phase = Phase::Launch(role);
        phase_info!(phase, "🚀 Launching {} {} instance(s)", endpoints.len(), role);

        for endpoint in endpoints {
            let args = launch_args(role, endpoint, run.artifacts());
            let handle = self.launcher.launch(role, endpoint, &args).await;

            match &handle.launch_error {
                None => {
                    phase_debug!(phase, "Session for {} on {} started (pid {:?})", role, endpoint, handle.pid);
                }
                Some(reason) => {
                    phase_warn!(phase, "⚠️ Could not launch {} on {}: {}", role, endpoint, reason);
                }
            }
            run.record(handle);
        }
    }

    async fn await_stage(&self, role: Role, run: &ExperimentRun<'_, L>) {
        tokio::time::sleep(self.timing.pause_after(role)).await;

        if self.timing.readiness != ReadinessMode::Tcp {
            return;
        }

        let started: Vec<Endpoint> = run
            .handles_for(role)
            .filter(|handle| handle.is_started())
            .map(|handle| handle.endpoint.clone())
            .collect();
        if started.is_empty() {
            return;
        }

        let phase = Phase::Readiness(role);
        let pending = self.probe.wait_ready(&started, self.timing.readiness_timeout).await;
        if pending.is_empty() {
            phase_debug!(phase, "All {} {} instance(s) accepting connections", started.len(), role);
        } else {
            let pending: Vec<String> = pending.iter().map(Endpoint::to_string).collect();
            phase_warn!(
                phase,
                "⏱️ {} not ready after {:?}, continuing: {}",
                role,
                self.timing.readiness_timeout,
                pending.join(", ")
            );
        }
    }
}

//! Main orchestrator implementation
//!
//! Drives one experiment: inventory, assignment, manifest, config
//! generation, staged startup, coordinator, teardown. Every collaborator
//! that touches a process or a host is injected, so the whole sequence runs
//! against mocks in tests.

use serde::Serialize;
use shared::{logging, phase_error, phase_info, phase_warn, AdversarialFraction, Phase, Role};
use std::future::Future;
use std::path::Path;

use crate::config::RunConfig;
use crate::core::{
    assign_roles, write_manifest, AssignmentPolicy, ExperimentRun, HostInventory, RoleAssignment, RoleCounts,
    StartupSequencer, TeardownReport,
};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::traits::{ConfigGenerator, CoordinatorRunner, ProcessHandle, ReadinessProbe, RemoteLauncher};

/// Remote roles a stale-process purge looks for
const PURGED_ROLES: [Role; 3] = Role::STARTUP_ORDER;

/// Coordinates one experiment run
pub struct Orchestrator<G, L, C, P>
where
    G: ConfigGenerator,
    L: RemoteLauncher,
    C: CoordinatorRunner,
    P: ReadinessProbe,
{
    config: RunConfig,

    /// Injected services
    generator: G,
    launcher: L,
    coordinator: C,
    probe: P,
}

impl<G, L, C, P> Orchestrator<G, L, C, P>
where
    G: ConfigGenerator,
    L: RemoteLauncher,
    C: CoordinatorRunner,
    P: ReadinessProbe,
{
    /// Create new orchestrator with injected dependencies
    pub fn new(config: RunConfig, generator: G, launcher: L, coordinator: C, probe: P) -> Self {
        Self {
            config,
            generator,
            launcher,
            coordinator,
            probe,
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// Run the experiment until the coordinator exits or `shutdown` resolves.
    ///
    /// `shutdown` yields the name of the signal that ended the run. Errors
    /// before anything is written (inventory, capacity) are returned as
    /// `Err`. Once the run scope exists the result is always a `RunReport`,
    /// with the failure, if any, in `RunReport::outcome`.
    pub async fn run<S>(&self, shutdown: S) -> OrchestratorResult<RunReport>
    where
        S: Future<Output = String>,
    {
        logging::log_startup(&Phase::Setup, &format!("experiment with {}", describe_counts(self.config.counts)));

        let inventory = HostInventory::load(&self.config.inventory_path).await?;
        logging::log_progress(
            &Phase::Inventory,
            "Loaded inventory",
            &format!("{} host(s) from {}", inventory.len(), self.config.inventory_path.display()),
        );

        let assignment = assign_roles(&inventory, self.config.counts, self.config.policy)?;
        for role in Role::MANIFEST_ORDER {
            let endpoints: Vec<String> = assignment.endpoints(role).iter().map(ToString::to_string).collect();
            phase_info!(Phase::Inventory, "📍 {}: {}", role, endpoints.join(" "));
        }

        let mut run = ExperimentRun::new(&self.launcher, self.config.artifacts());
        let outcome = {
            let drive = self.drive(&assignment, &mut run);
            tokio::pin!(shutdown);
            tokio::select! {
                result = drive => result,
                signal = &mut shutdown => {
                    logging::log_shutdown(&Phase::Teardown, &format!("received {signal}"));
                    Err(OrchestratorError::Interrupted { signal })
                }
            }
        };

        let handles = run.handles().to_vec();
        let teardown = run.teardown();
        log_teardown(&handles, &teardown);

        let report = RunReport {
            counts: self.config.counts,
            fraction: self.config.fraction,
            policy: self.config.policy,
            assignment,
            handles,
            teardown,
            outcome,
        };
        match &report.outcome {
            Ok(()) => logging::log_success(&Phase::Coordinator, "Experiment finished"),
            Err(e) if e.is_fatal_before_launch() => {
                phase_error!(Phase::Config, "❌ Run aborted before launch: {}", e);
            }
            Err(e) => logging::log_error(&Phase::Coordinator, "Experiment", e),
        }

        if let Some(path) = &self.config.summary_path {
            if let Err(e) = report.write_summary(path).await {
                logging::log_error(&Phase::Teardown, "Writing run summary", &e);
            }
        }
        Ok(report)
    }

    /// Everything between acquiring the run scope and releasing it
    async fn drive(&self, assignment: &RoleAssignment, run: &mut ExperimentRun<'_, L>) -> OrchestratorResult<()> {
        let artifacts = run.artifacts().clone();

        run.claim(&[artifacts.manifest.as_path()]);
        write_manifest(assignment, &artifacts.manifest).await?;
        logging::log_progress(
            &Phase::Config,
            "Wrote manifest",
            &format!("{} instance(s) to {}", assignment.len(), artifacts.manifest.display()),
        );

        run.claim(&artifacts.config_files());
        self.generator
            .generate(&artifacts.manifest, self.config.fraction, &artifacts)
            .await?;
        logging::log_success(&Phase::Config, "Generated server, group, mailbox and client configs");

        if self.config.kill_stale {
            self.purge_stale(assignment).await;
        }

        StartupSequencer::new(&self.launcher, &self.probe, self.config.timing)
            .launch_all(assignment, run)
            .await;

        phase_info!(Phase::Coordinator, "🎯 Starting coordinator");
        self.coordinator.run(&artifacts).await
    }

    /// Interrupt leftover role processes on every assigned host
    async fn purge_stale(&self, assignment: &RoleAssignment) {
        for host in assignment.hosts() {
            if let Err(e) = self.launcher.purge(host, &PURGED_ROLES).await {
                logging::log_error(&Phase::Setup, &format!("Purging stale processes on {host}"), &e);
            }
        }
    }
}

fn describe_counts(counts: RoleCounts) -> String {
    format!(
        "{} server(s), {} mailbox(es), {} client(s)",
        counts.servers, counts.mailboxes, counts.clients
    )
}

fn log_teardown(handles: &[ProcessHandle], report: &TeardownReport) {
    logging::log_progress(
        &Phase::Teardown,
        "Teardown",
        &format!(
            "{} signalled, {} already exited, {} never started, {} file(s) removed",
            report.signalled,
            report.already_exited.len(),
            report.not_started,
            report.removed.len()
        ),
    );

    let failures: Vec<OrchestratorError> = handles.iter().filter_map(ProcessHandle::launch_failure).collect();
    if !failures.is_empty() {
        phase_warn!(Phase::Teardown, "⚠️ {} instance(s) failed to launch", failures.len());
        for failure in &failures {
            phase_warn!(Phase::Teardown, "  {}", failure);
        }
    }
    if !report.is_clean() {
        phase_warn!(
            Phase::Teardown,
            "⚠️ Cleanup incomplete: {} signal failure(s), {} removal failure(s)",
            report.signal_failures.len(),
            report.removal_failures.len()
        );
    }
}

/// Everything a finished run produced
#[derive(Debug)]
pub struct RunReport {
    pub counts: RoleCounts,
    pub fraction: AdversarialFraction,
    pub policy: AssignmentPolicy,
    pub assignment: RoleAssignment,
    pub handles: Vec<ProcessHandle>,
    pub teardown: TeardownReport,
    pub outcome: OrchestratorResult<()>,
}

/// Serializable form of a `RunReport`
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary<'a> {
    pub counts: RoleCounts,
    pub fraction: AdversarialFraction,
    pub policy: AssignmentPolicy,
    pub assignment: &'a RoleAssignment,
    pub handles: &'a [ProcessHandle],
    pub teardown: &'a TeardownReport,
    pub error: Option<String>,
    pub exit_code: u8,
}

impl RunReport {
    /// Process exit code for this run
    pub fn exit_code(&self) -> u8 {
        match &self.outcome {
            Ok(()) => 0,
            Err(e) => e.exit_code(),
        }
    }

    /// Handles whose launch failed
    pub fn launch_failures(&self) -> impl Iterator<Item = &ProcessHandle> {
        self.handles.iter().filter(|handle| !handle.is_started())
    }

    pub fn summary(&self) -> RunSummary<'_> {
        RunSummary {
            counts: self.counts,
            fraction: self.fraction,
            policy: self.policy,
            assignment: &self.assignment,
            handles: &self.handles,
            teardown: &self.teardown,
            error: self.outcome.as_ref().err().map(ToString::to_string),
            exit_code: self.exit_code(),
        }
    }

    /// Write the summary as pretty JSON
    pub async fn write_summary(&self, path: &Path) -> OrchestratorResult<()> {
        let json = serde_json::to_string_pretty(&self.summary())?;
        tokio::fs::write(path, json)
            .await
            .map_err(|e| OrchestratorError::config(format!("cannot write summary {}: {e}", path.display())))
    }
}

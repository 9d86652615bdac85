//! Run scope with guaranteed teardown.
//!
//! An `ExperimentRun` is acquired before the first artifact is written and
//! owns every handle the launcher hands back. Releasing it signals those
//! handles (clients, then servers, then mailboxes) and deletes the files
//! the run claimed. Files already in the work dir that the run never
//! claimed are left alone. Release happens through an explicit `teardown()` on the
//! normal path, or from `Drop` when the run future is cancelled or panics.

use serde::Serialize;
use shared::{logging, phase_debug, phase_error, phase_warn, Endpoint, Phase, Role};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::artifacts::ArtifactSet;
use crate::traits::{ProcessHandle, RemoteLauncher, SignalOutcome};

/// What teardown did, and what it could not do
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub signalled: usize,
    /// Sessions that were gone before the signal, with their exit code
    pub already_exited: Vec<(Role, Endpoint, Option<i32>)>,
    pub not_started: usize,
    pub signal_failures: Vec<String>,
    pub removed: Vec<PathBuf>,
    pub removal_failures: Vec<String>,
}

impl TeardownReport {
    /// True when every signal was delivered and every file removed
    pub fn is_clean(&self) -> bool {
        self.signal_failures.is_empty() && self.removal_failures.is_empty()
    }

    /// Number of handles teardown looked at
    pub fn handles_seen(&self) -> usize {
        self.signalled + self.already_exited.len() + self.not_started + self.signal_failures.len()
    }
}

/// One active experiment run
pub struct ExperimentRun<'a, L: RemoteLauncher> {
    launcher: &'a L,
    artifacts: ArtifactSet,
    /// Artifacts this run wrote or handed to a writer
    claimed: Vec<PathBuf>,
    handles: Vec<ProcessHandle>,
    report: Option<TeardownReport>,
}

impl<'a, L: RemoteLauncher> ExperimentRun<'a, L> {
    pub fn new(launcher: &'a L, artifacts: ArtifactSet) -> Self {
        Self {
            launcher,
            artifacts,
            claimed: Vec::new(),
            handles: Vec::new(),
            report: None,
        }
    }

    pub fn artifacts(&self) -> &ArtifactSet {
        &self.artifacts
    }

    /// Mark `paths` as owned by this run. Call before anything writes them.
    pub fn claim(&mut self, paths: &[&Path]) {
        for path in paths {
            if !self.claimed.iter().any(|claimed| claimed == path) {
                self.claimed.push(path.to_path_buf());
            }
        }
    }

    /// Claimed artifacts, in removal order
    pub fn claimed(&self) -> Vec<&Path> {
        self.artifacts
            .all()
            .into_iter()
            .filter(|path| self.claimed.iter().any(|claimed| claimed == path))
            .collect()
    }

    pub fn record(&mut self, handle: ProcessHandle) {
        self.handles.push(handle);
    }

    /// Every recorded handle, in launch order
    pub fn handles(&self) -> &[ProcessHandle] {
        &self.handles
    }

    pub fn handles_for(&self, role: Role) -> impl Iterator<Item = &ProcessHandle> {
        self.handles.iter().filter(move |handle| handle.role == role)
    }

    pub fn is_torn_down(&self) -> bool {
        self.report.is_some()
    }

    /// Signal every handle and remove every claimed artifact.
    ///
    /// Never fails and never stops early. Only the first call does work;
    /// later calls return the first report.
    pub fn teardown(&mut self) -> TeardownReport {
        if let Some(report) = &self.report {
            return report.clone();
        }

        let mut report = TeardownReport::default();
        for role in Role::TEARDOWN_ORDER {
            for handle in self.handles_for(role) {
                match self.launcher.terminate(handle) {
                    Ok(SignalOutcome::Signalled) => {
                        phase_debug!(Phase::Teardown, "📤 Interrupted {} on {}", handle.role, handle.endpoint);
                        report.signalled += 1;
                    }
                    Ok(SignalOutcome::AlreadyExited { code }) => {
                        phase_warn!(
                            Phase::Teardown,
                            "⚠️ {} on {} had already exited (code {:?})",
                            handle.role,
                            handle.endpoint,
                            code
                        );
                        report.already_exited.push((handle.role, handle.endpoint.clone(), code));
                    }
                    Ok(SignalOutcome::NotStarted) => report.not_started += 1,
                    Err(e) => {
                        logging::log_error(&Phase::Teardown, &format!("Signalling {} on {}", handle.role, handle.endpoint), &e);
                        report.signal_failures.push(format!("{} {}: {e}", handle.role, handle.endpoint));
                    }
                }
            }
        }

        let (removed, removal_failures) = remove_artifacts(self.claimed());
        report.removed = removed;
        report.removal_failures = removal_failures;

        self.report = Some(report.clone());
        report
    }
}

impl<L: RemoteLauncher> Drop for ExperimentRun<'_, L> {
    fn drop(&mut self) {
        if !self.is_torn_down() {
            phase_warn!(
                Phase::Teardown,
                "Run scope released without teardown, cleaning up {} handles",
                self.handles.len()
            );
            self.teardown();
        }
    }
}

/// Delete the given files. Files already absent count as neither removed
/// nor failed, so repeated calls are harmless.
pub fn remove_artifacts<'p>(paths: impl IntoIterator<Item = &'p Path>) -> (Vec<PathBuf>, Vec<String>) {
    let mut removed = Vec::new();
    let mut failures = Vec::new();

    for path in paths {
        match remove_file(path) {
            Ok(true) => removed.push(path.to_path_buf()),
            Ok(false) => {}
            Err(e) => {
                phase_error!(Phase::Teardown, "❌ Could not remove {}: {}", path.display(), e);
                failures.push(format!("{}: {e}", path.display()));
            }
        }
    }
    (removed, failures)
}

fn remove_file(path: &Path) -> std::io::Result<bool> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

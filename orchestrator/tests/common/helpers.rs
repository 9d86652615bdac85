//! Test helpers and builder patterns for orchestrator tests
//!
//! `OrchestratorBuilder` wires mockall mocks into an `Orchestrator` over a
//! temporary working directory. Mocks a test does not configure itself get
//! well-behaved defaults that log every call into a shared `Recorder`.

use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::sync::Notify;

use orchestrator::core::ArtifactSet;
use orchestrator::traits::{MockConfigGenerator, MockCoordinatorRunner, MockReadinessProbe, MockRemoteLauncher};
use orchestrator::{Orchestrator, ProcessHandle, RoleCounts, RunConfig, SignalOutcome};
use shared::{Endpoint, Role};

use super::fixtures::TestFixtures;

pub type MockOrchestrator =
    Orchestrator<MockConfigGenerator, MockRemoteLauncher, MockCoordinatorRunner, MockReadinessProbe>;

/// Calls observed by the default mocks
#[derive(Clone, Default)]
pub struct Recorder {
    manifests: Arc<Mutex<Vec<String>>>,
    launches: Arc<Mutex<Vec<(Role, Endpoint, Vec<String>)>>>,
    terminated: Arc<Mutex<Vec<Role>>>,
    purged: Arc<Mutex<Vec<(String, Vec<Role>)>>>,
    probed: Arc<Mutex<Vec<Vec<Endpoint>>>>,
    coordinator_runs: Arc<AtomicUsize>,
    /// Notified on every launch
    pub launched: Arc<Notify>,
}

impl Recorder {
    /// Manifest contents seen by each generator call
    pub fn manifests(&self) -> Vec<String> {
        self.manifests.lock().unwrap().clone()
    }

    pub fn launches(&self) -> Vec<(Role, Endpoint, Vec<String>)> {
        self.launches.lock().unwrap().clone()
    }

    pub fn launched_roles(&self) -> Vec<Role> {
        self.launches().into_iter().map(|(role, ..)| role).collect()
    }

    pub fn terminated(&self) -> Vec<Role> {
        self.terminated.lock().unwrap().clone()
    }

    pub fn purged(&self) -> Vec<(String, Vec<Role>)> {
        self.purged.lock().unwrap().clone()
    }

    pub fn probed(&self) -> Vec<Vec<Endpoint>> {
        self.probed.lock().unwrap().clone()
    }

    pub fn coordinator_runs(&self) -> usize {
        self.coordinator_runs.load(Ordering::SeqCst)
    }
}

/// Orchestrator under test plus the directory and recorder it uses
pub struct TestRun {
    pub orchestrator: MockOrchestrator,
    pub recorder: Recorder,
    pub dir: TempDir,
}

impl TestRun {
    pub fn artifacts(&self) -> ArtifactSet {
        self.orchestrator.config().artifacts()
    }

    /// True when no generated file is left in the working directory
    pub fn artifacts_removed(&self) -> bool {
        self.artifacts().all().iter().all(|path| !path.exists())
    }
}

/// Builder pattern for creating test orchestrators with sensible defaults
pub struct OrchestratorBuilder {
    dir: TempDir,
    config: RunConfig,
    recorder: Recorder,
    generator: Option<MockConfigGenerator>,
    launcher: Option<MockRemoteLauncher>,
    coordinator: Option<MockCoordinatorRunner>,
    probe: Option<MockReadinessProbe>,
}

impl OrchestratorBuilder {
    /// One instance per role over the three fixture hosts
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create work dir");
        let inventory = TestFixtures::write_inventory(dir.path(), &TestFixtures::HOSTS);
        let config = RunConfig::new(RoleCounts::new(1, 1, 1), dir.path())
            .with_inventory(inventory)
            .with_timing(TestFixtures::fast_timing());

        Self {
            dir,
            config,
            recorder: Recorder::default(),
            generator: None,
            launcher: None,
            coordinator: None,
            probe: None,
        }
    }

    pub fn with_counts(mut self, servers: usize, mailboxes: usize, clients: usize) -> Self {
        self.config.counts = RoleCounts::new(servers, mailboxes, clients);
        self
    }

    /// Replace the inventory with `hosts`
    pub fn with_hosts(self, hosts: &[&str]) -> Self {
        TestFixtures::write_inventory(self.dir.path(), hosts);
        self
    }

    /// Adjust the run configuration
    pub fn with_config<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(RunConfig, &std::path::Path) -> RunConfig,
    {
        self.config = setup(self.config, self.dir.path());
        self
    }

    /// Configure the generator mock instead of using the default
    pub fn with_generator<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockConfigGenerator),
    {
        let mut generator = MockConfigGenerator::new();
        setup(&mut generator);
        self.generator = Some(generator);
        self
    }

    /// Configure the launcher mock instead of using the default
    pub fn with_launcher<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockRemoteLauncher),
    {
        let mut launcher = MockRemoteLauncher::new();
        setup(&mut launcher);
        self.launcher = Some(launcher);
        self
    }

    /// Configure the coordinator mock instead of using the default
    pub fn with_coordinator<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockCoordinatorRunner),
    {
        let mut coordinator = MockCoordinatorRunner::new();
        setup(&mut coordinator);
        self.coordinator = Some(coordinator);
        self
    }

    /// Configure the readiness probe mock instead of using the default
    pub fn with_probe<F>(mut self, setup: F) -> Self
    where
        F: FnOnce(&mut MockReadinessProbe),
    {
        let mut probe = MockReadinessProbe::new();
        setup(&mut probe);
        self.probe = Some(probe);
        self
    }

    pub fn build(self) -> TestRun {
        let recorder = self.recorder;
        let generator = self.generator.unwrap_or_else(|| default_generator(&recorder));
        let launcher = self.launcher.unwrap_or_else(|| default_launcher(&recorder));
        let coordinator = self.coordinator.unwrap_or_else(|| default_coordinator(&recorder));
        let probe = self.probe.unwrap_or_else(|| default_probe(&recorder));

        TestRun {
            orchestrator: Orchestrator::new(self.config, generator, launcher, coordinator, probe),
            recorder,
            dir: self.dir,
        }
    }
}

impl Default for OrchestratorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Records the manifest and writes empty config files
fn default_generator(recorder: &Recorder) -> MockConfigGenerator {
    let manifests = recorder.manifests.clone();
    let mut generator = MockConfigGenerator::new();
    generator.expect_generate().returning(move |manifest, _, artifacts| {
        manifests
            .lock()
            .unwrap()
            .push(std::fs::read_to_string(manifest).expect("manifest written before generation"));
        for path in artifacts.config_files() {
            std::fs::write(path, "").expect("write config");
        }
        Ok(())
    });
    generator
}

/// Starts every session and signals it on request
fn default_launcher(recorder: &Recorder) -> MockRemoteLauncher {
    let mut launcher = MockRemoteLauncher::new();

    let launches = recorder.launches.clone();
    let launched = recorder.launched.clone();
    let next_pid = Arc::new(AtomicU32::new(TestFixtures::FIRST_PID));
    launcher.expect_launch().returning(move |role, endpoint, args| {
        launches
            .lock()
            .unwrap()
            .push((role, endpoint.clone(), args.to_vec()));
        launched.notify_one();
        ProcessHandle::started(role, endpoint.clone(), next_pid.fetch_add(1, Ordering::SeqCst))
    });

    let terminated = recorder.terminated.clone();
    launcher.expect_terminate().returning(move |handle| {
        if !handle.is_started() {
            return Ok(SignalOutcome::NotStarted);
        }
        terminated.lock().unwrap().push(handle.role);
        Ok(SignalOutcome::Signalled)
    });

    let purged = recorder.purged.clone();
    launcher.expect_purge().returning(move |host, roles| {
        purged.lock().unwrap().push((host.to_string(), roles.to_vec()));
        Ok(())
    });
    launcher
}

fn default_coordinator(recorder: &Recorder) -> MockCoordinatorRunner {
    let runs = recorder.coordinator_runs.clone();
    let mut coordinator = MockCoordinatorRunner::new();
    coordinator.expect_run().returning(move |_| {
        runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    coordinator
}

fn default_probe(recorder: &Recorder) -> MockReadinessProbe {
    let probed = recorder.probed.clone();
    let mut probe = MockReadinessProbe::new();
    probe.expect_wait_ready().returning(move |endpoints, _| {
        probed.lock().unwrap().push(endpoints.to_vec());
        Vec::new()
    });
    probe
}

/// A shutdown future that never resolves
pub async fn no_shutdown() -> String {
    std::future::pending().await
}

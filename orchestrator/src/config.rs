//! Command-line arguments and the validated run configuration

use clap::Parser;
use shared::AdversarialFraction;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::{ArtifactSet, AssignmentPolicy, ReadinessMode, RoleCounts, StageTiming};
use crate::error::{OrchestratorError, OrchestratorResult};

pub const DEFAULT_INVENTORY: &str = "remote_ips";

/// Runs one benchmark experiment across the hosts listed in the inventory
#[derive(Parser, Debug, Clone)]
#[command(name = "run-experiment")]
#[command(about = "Launch mailboxes, servers and clients over ssh, run the coordinator, then clean up")]
pub struct Args {
    /// Number of servers
    pub servers: usize,

    /// Number of mailboxes
    pub mailboxes: usize,

    /// Number of clients
    pub clients: usize,

    /// Fraction of adversarial servers, in [0, 1]
    #[arg(default_value_t = AdversarialFraction::DEFAULT.value())]
    pub f: f64,

    /// Interrupt stale role processes on every assigned host first [0|1]
    #[arg(default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub kill: u8,

    /// Host inventory, one host per line
    #[arg(long, env = "EXPERIMENT_INVENTORY", default_value = DEFAULT_INVENTORY)]
    pub inventory: PathBuf,

    /// Directory holding the config and coordinator binaries (defaults to $GOPATH/bin)
    #[arg(long, env = "EXPERIMENT_BIN_DIR")]
    pub bin_dir: Option<PathBuf>,

    /// Directory holding the role binaries on remote hosts (defaults to --bin-dir)
    #[arg(long, env = "EXPERIMENT_REMOTE_BIN_DIR")]
    pub remote_bin_dir: Option<PathBuf>,

    /// SSH private key
    #[arg(long, env = "EXPERIMENT_IDENTITY")]
    pub identity: Option<PathBuf>,

    /// SSH login user
    #[arg(long, env = "EXPERIMENT_SSH_USER")]
    pub ssh_user: Option<String>,

    /// Directory for the manifest and config files (defaults to the current directory)
    #[arg(long, env = "EXPERIMENT_WORK_DIR")]
    pub work_dir: Option<PathBuf>,

    /// Pause after the mailbox and server stages, in milliseconds
    #[arg(long, env = "EXPERIMENT_STAGE_PAUSE_MS", default_value_t = 500)]
    pub stage_pause_ms: u64,

    /// Pause after the client stage, in milliseconds
    #[arg(long, env = "EXPERIMENT_SETTLE_PAUSE_MS", default_value_t = 1000)]
    pub settle_pause_ms: u64,

    /// How to decide a stage is up
    #[arg(long, env = "EXPERIMENT_READINESS", value_enum, default_value_t = ReadinessMode::Fixed)]
    pub readiness: ReadinessMode,

    /// Upper bound on the TCP readiness wait per stage, in milliseconds
    #[arg(long, env = "EXPERIMENT_READINESS_TIMEOUT_MS", default_value_t = 5000)]
    pub readiness_timeout_ms: u64,

    /// How role instances are spread over the inventory
    #[arg(long, env = "EXPERIMENT_POLICY", value_enum, default_value_t = AssignmentPolicy::Shared)]
    pub policy: AssignmentPolicy,

    /// Write a JSON run summary to this path
    #[arg(long, env = "EXPERIMENT_SUMMARY_JSON")]
    pub summary_json: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "EXPERIMENT_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Validated settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub counts: RoleCounts,
    pub fraction: AdversarialFraction,
    pub kill_stale: bool,
    pub inventory_path: PathBuf,
    pub bin_dir: PathBuf,
    pub remote_bin_dir: PathBuf,
    pub identity: Option<PathBuf>,
    pub ssh_user: Option<String>,
    /// Absolute directory for generated files
    pub work_dir: PathBuf,
    pub policy: AssignmentPolicy,
    pub timing: StageTiming,
    pub summary_path: Option<PathBuf>,
}

impl RunConfig {
    /// Defaults for everything except the role counts. Binaries and the
    /// inventory are looked up inside `work_dir`.
    pub fn new(counts: RoleCounts, work_dir: impl Into<PathBuf>) -> Self {
        let work_dir = work_dir.into();
        Self {
            counts,
            fraction: AdversarialFraction::default(),
            kill_stale: false,
            inventory_path: work_dir.join(DEFAULT_INVENTORY),
            bin_dir: work_dir.join("bin"),
            remote_bin_dir: work_dir.join("bin"),
            identity: None,
            ssh_user: None,
            work_dir,
            policy: AssignmentPolicy::default(),
            timing: StageTiming::default(),
            summary_path: None,
        }
    }

    /// Validate parsed arguments and resolve defaults from the environment
    pub fn from_args(args: &Args) -> OrchestratorResult<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| OrchestratorError::config(format!("cannot determine current directory: {e}")))?;
        Self::resolve(args, &cwd, std::env::var_os("GOPATH"))
    }

    fn resolve(args: &Args, cwd: &Path, gopath: Option<OsString>) -> OrchestratorResult<Self> {
        if args.servers == 0 {
            return Err(OrchestratorError::config("at least one server is required"));
        }
        if args.kill > 1 {
            return Err(OrchestratorError::config(format!("kill must be 0 or 1, got {}", args.kill)));
        }
        let fraction = AdversarialFraction::new(args.f)?;

        let bin_dir = resolve_bin_dir(args.bin_dir.clone(), gopath)?;
        let remote_bin_dir = args.remote_bin_dir.clone().unwrap_or_else(|| bin_dir.clone());
        let work_dir = match &args.work_dir {
            Some(dir) => cwd.join(dir),
            None => cwd.to_path_buf(),
        };

        Ok(Self {
            counts: RoleCounts::new(args.servers, args.mailboxes, args.clients),
            fraction,
            kill_stale: args.kill == 1,
            inventory_path: args.inventory.clone(),
            bin_dir,
            remote_bin_dir,
            identity: args.identity.clone(),
            ssh_user: args.ssh_user.clone(),
            work_dir,
            policy: args.policy,
            timing: StageTiming {
                stage_pause: Duration::from_millis(args.stage_pause_ms),
                settle_pause: Duration::from_millis(args.settle_pause_ms),
                readiness: args.readiness,
                readiness_timeout: Duration::from_millis(args.readiness_timeout_ms),
            },
            summary_path: args.summary_json.clone(),
        })
    }

    pub fn with_fraction(mut self, fraction: AdversarialFraction) -> Self {
        self.fraction = fraction;
        self
    }

    pub fn with_kill_stale(mut self, kill_stale: bool) -> Self {
        self.kill_stale = kill_stale;
        self
    }

    pub fn with_inventory(mut self, path: impl Into<PathBuf>) -> Self {
        self.inventory_path = path.into();
        self
    }

    pub fn with_policy(mut self, policy: AssignmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_timing(mut self, timing: StageTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_summary_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.summary_path = Some(path.into());
        self
    }

    /// Paths of the files this run generates
    pub fn artifacts(&self) -> ArtifactSet {
        ArtifactSet::in_dir(&self.work_dir)
    }
}

/// `explicit` when given, otherwise `$GOPATH/bin`
fn resolve_bin_dir(explicit: Option<PathBuf>, gopath: Option<OsString>) -> OrchestratorResult<PathBuf> {
    match (explicit, gopath) {
        (Some(dir), _) => Ok(dir),
        (None, Some(gopath)) if !gopath.is_empty() => Ok(PathBuf::from(gopath).join("bin")),
        _ => Err(OrchestratorError::config("GOPATH is not set; pass --bin-dir")),
    }
}

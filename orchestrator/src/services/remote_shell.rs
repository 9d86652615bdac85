//! Remote role sessions over ssh
//!
//! Each role instance runs inside its own local `ssh` session process. The
//! session's pid is what teardown signals: interrupting the local ssh
//! client closes the connection and the remote command goes with it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::process::{Child, Command};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::services::command::{exit_code, CommandOutput};
use crate::traits::{ProcessHandle, RemoteLauncher, SignalOutcome};
use shared::{phase_debug, phase_warn, Endpoint, Phase, Role};

/// pkill exits 1 when no process matched
const PKILL_NO_MATCH: i32 = 1;

/// Launches role binaries on remote hosts through the local `ssh` client
pub struct RealRemoteLauncher {
    ssh_program: PathBuf,
    identity: Option<PathBuf>,
    user: Option<String>,
    remote_bin_dir: PathBuf,
    /// Live session children keyed by pid
    sessions: Mutex<HashMap<u32, Child>>,
}

impl RealRemoteLauncher {
    pub fn new(remote_bin_dir: impl Into<PathBuf>) -> Self {
        Self {
            ssh_program: PathBuf::from("ssh"),
            identity: None,
            user: None,
            remote_bin_dir: remote_bin_dir.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Private key passed with `-i` (fluent API)
    pub fn with_identity(mut self, identity: Option<PathBuf>) -> Self {
        self.identity = identity;
        self
    }

    /// Remote login user (fluent API)
    pub fn with_user(mut self, user: Option<String>) -> Self {
        self.user = user;
        self
    }

    /// Replace the ssh client binary (fluent API)
    pub fn with_ssh_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.ssh_program = program.into();
        self
    }

    /// Number of sessions that have not been signalled yet
    pub fn active_sessions(&self) -> usize {
        self.sessions().len()
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<u32, Child>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn destination(&self, host: &str) -> String {
        match &self.user {
            Some(user) => format!("{user}@{host}"),
            None => host.to_string(),
        }
    }

    fn binary_path(&self, role: Role) -> PathBuf {
        self.remote_bin_dir.join(role.binary_name())
    }

    /// Full argument vector handed to the ssh client
    pub fn ssh_args(&self, host: &str, remote_command: &str) -> Vec<String> {
        let mut args = vec![
            "-o".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
        ];
        if let Some(identity) = &self.identity {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }
        args.push(self.destination(host));
        args.push(remote_command.to_string());
        args
    }

    /// Command line run on the remote host for one role instance
    pub fn remote_command(&self, role: Role, args: &[String]) -> String {
        let mut words = vec![shell_quote(&self.binary_path(role).display().to_string())];
        words.extend(args.iter().map(|arg| shell_quote(arg)));
        words.join(" ")
    }

    fn ssh(&self, host: &str, remote_command: &str) -> Command {
        let mut cmd = Command::new(&self.ssh_program);
        cmd.args(self.ssh_args(host, remote_command));
        cmd
    }
}

#[async_trait]
impl RemoteLauncher for RealRemoteLauncher {
    async fn launch(&self, role: Role, endpoint: &Endpoint, args: &[String]) -> ProcessHandle {
        let remote_command = self.remote_command(role, args);
        let mut cmd = self.ssh(&endpoint.host, &remote_command);
        // the coordinator owns the terminal; sessions get a pipe
        cmd.stdin(Stdio::piped()).stdout(Stdio::inherit()).stderr(Stdio::inherit());

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                return ProcessHandle::failed(
                    role,
                    endpoint.clone(),
                    format!("cannot spawn {}: {e}", self.ssh_program.display()),
                )
            }
        };

        match child.id() {
            Some(pid) => {
                phase_debug!(Phase::Launch(role), "ssh {} {}", self.destination(&endpoint.host), remote_command);
                self.sessions().insert(pid, child);
                ProcessHandle::started(role, endpoint.clone(), pid)
            }
            None => ProcessHandle::failed(role, endpoint.clone(), "session exited before it was recorded"),
        }
    }

    async fn purge(&self, host: &str, roles: &[Role]) -> OrchestratorResult<()> {
        for role in roles {
            let pattern = self.binary_path(*role).display().to_string();
            let remote_command = format!("pkill -INT -f {}", shell_quote(&pattern));

            let output = self
                .ssh(host, &remote_command)
                .stdin(Stdio::null())
                .kill_on_drop(true)
                .output()
                .await
                .map_err(|e| OrchestratorError::LaunchError {
                    role: *role,
                    endpoint: Endpoint::new(host, role.base_port().unwrap_or_default()),
                    reason: format!("cannot spawn {}: {e}", self.ssh_program.display()),
                })?;

            let output = CommandOutput::from(output);
            match output.exit_code {
                Some(0) => {
                    phase_debug!(Phase::Setup, "🧹 Interrupted stale {} on {}", role, host);
                }
                Some(PKILL_NO_MATCH) => {
                    phase_debug!(Phase::Setup, "No stale {} on {}", role, host);
                }
                code => {
                    phase_warn!(
                        Phase::Setup,
                        "⚠️ Purging {} on {} exited with {:?}: {}",
                        role,
                        host,
                        code,
                        output.diagnostics()
                    );
                }
            }
        }
        Ok(())
    }

    fn terminate(&self, handle: &ProcessHandle) -> OrchestratorResult<SignalOutcome> {
        let Some(pid) = handle.pid else {
            return Ok(SignalOutcome::NotStarted);
        };

        let mut sessions = self.sessions();
        let Some(mut child) = sessions.remove(&pid) else {
            // signalled already, or never launched through this launcher
            return Ok(SignalOutcome::AlreadyExited { code: None });
        };

        match child.try_wait() {
            Ok(Some(status)) => return Ok(SignalOutcome::AlreadyExited { code: exit_code(&status) }),
            Ok(None) => {}
            Err(e) => {
                return Err(OrchestratorError::SignalError {
                    pid,
                    reason: e.to_string(),
                })
            }
        }

        interrupt(pid, &mut child)
    }
}

#[cfg(unix)]
fn interrupt(pid: u32, _child: &mut Child) -> OrchestratorResult<SignalOutcome> {
    use nix::errno::Errno;
    use nix::sys::signal::{self, Signal};
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).map_err(|e| OrchestratorError::SignalError {
        pid,
        reason: e.to_string(),
    })?;

    match signal::kill(Pid::from_raw(raw), Signal::SIGINT) {
        Ok(()) => Ok(SignalOutcome::Signalled),
        Err(Errno::ESRCH) => Ok(SignalOutcome::AlreadyExited { code: None }),
        Err(e) => Err(OrchestratorError::SignalError {
            pid,
            reason: e.to_string(),
        }),
    }
}

#[cfg(not(unix))]
fn interrupt(pid: u32, child: &mut Child) -> OrchestratorResult<SignalOutcome> {
    child
        .start_kill()
        .map(|()| SignalOutcome::Signalled)
        .map_err(|e| OrchestratorError::SignalError {
            pid,
            reason: e.to_string(),
        })
}

/// Quote `word` for a POSIX shell unless it is made only of safe characters
pub fn shell_quote(word: &str) -> String {
    let safe = |c: char| c.is_ascii_alphanumeric() || "-_./:=,@%+".contains(c);
    if !word.is_empty() && word.chars().all(safe) {
        word.to_string()
    } else {
        format!("'{}'", word.replace('\'', r"'\''"))
    }
}

impl std::fmt::Debug for RealRemoteLauncher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealRemoteLauncher")
            .field("ssh_program", &self.ssh_program)
            .field("identity", &self.identity)
            .field("user", &self.user)
            .field("remote_bin_dir", &self.remote_bin_dir)
            .field("active_sessions", &self.active_sessions())
            .finish()
    }
}


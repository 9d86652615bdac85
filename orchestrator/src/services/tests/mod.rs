//! Service-specific tests
//!
//! The real services shell out to external programs, so these tests stand
//! in for ssh, the generator and the coordinator with small shell scripts
//! written into a temporary directory.

#[cfg(unix)]
mod config_generator;

// Common test utilities for services
#[cfg(unix)]
pub mod common {
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    /// Time given to a short-lived script to exit on its own
    pub const EXIT_GRACE: Duration = Duration::from_millis(1500);

    /// Write an executable `/bin/sh` script called `name` into `dir`
    pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod script");
        path
    }

    /// Poll until `path` has content or `EXIT_GRACE` elapses
    pub async fn wait_for_file(path: &Path) -> bool {
        let written = || std::fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
        let deadline = tokio::time::Instant::now() + EXIT_GRACE;
        while tokio::time::Instant::now() < deadline {
            if written() {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        written()
    }

    /// Script body appending its arguments, one invocation per line, to `log`
    pub fn record_args_to(log: &Path) -> String {
        format!("echo \"$@\" >> '{}'", log.display())
    }
}

//! Generated run artifacts: the manifest and the per-role config files

use serde::Serialize;
use shared::{Endpoint, Role};
use std::path::{Path, PathBuf};
use tokio::fs;

use super::assignment::RoleAssignment;
use crate::error::{OrchestratorError, OrchestratorResult};

pub const MANIFEST_FILE: &str = "ip.list";
pub const SERVER_CONFIG_FILE: &str = "server.config";
pub const GROUP_CONFIG_FILE: &str = "group.config";
pub const MAILBOX_CONFIG_FILE: &str = "mailbox.config";
pub const CLIENT_CONFIG_FILE: &str = "client.config";

/// Paths of every file a run generates. All paths share one directory and
/// are absolute whenever that directory is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSet {
    pub manifest: PathBuf,
    pub servers: PathBuf,
    pub groups: PathBuf,
    pub mailboxes: PathBuf,
    pub clients: PathBuf,
}

impl ArtifactSet {
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            manifest: dir.join(MANIFEST_FILE),
            servers: dir.join(SERVER_CONFIG_FILE),
            groups: dir.join(GROUP_CONFIG_FILE),
            mailboxes: dir.join(MAILBOX_CONFIG_FILE),
            clients: dir.join(CLIENT_CONFIG_FILE),
        }
    }

    /// Files produced by the config generator
    pub fn config_files(&self) -> [&Path; 4] {
        [&self.servers, &self.groups, &self.mailboxes, &self.clients]
    }

    /// Every generated file, manifest last
    pub fn all(&self) -> [&Path; 5] {
        [&self.servers, &self.groups, &self.mailboxes, &self.clients, &self.manifest]
    }

    /// Config files the generator should have produced but did not
    pub fn missing_configs(&self) -> Vec<PathBuf> {
        self.config_files()
            .into_iter()
            .filter(|path| !path.exists())
            .map(Path::to_path_buf)
            .collect()
    }

    /// Config-path flags a role binary is started with
    pub fn role_flags(&self, role: Role) -> Vec<String> {
        let flag = |name: &str, path: &Path| [name.to_string(), path.display().to_string()];

        let flags: Vec<[String; 2]> = match role {
            Role::Mailbox => vec![flag("--mailboxes", &self.mailboxes)],
            Role::Server => vec![
                flag("--servers", &self.servers),
                flag("--groups", &self.groups),
                flag("--mailboxes", &self.mailboxes),
            ],
            Role::Client | Role::Coordinator => vec![
                flag("--servers", &self.servers),
                flag("--groups", &self.groups),
                flag("--mailboxes", &self.mailboxes),
                flag("--clients", &self.clients),
            ],
        };
        flags.into_iter().flatten().collect()
    }
}

/// Manifest text: `role,host:port` per instance, grouped server, mailbox, client
pub fn render_manifest(assignment: &RoleAssignment) -> String {
    let mut manifest = String::new();
    for role in Role::MANIFEST_ORDER {
        for endpoint in assignment.endpoints(role) {
            manifest.push_str(&format!("{role},{endpoint}\n"));
        }
    }
    manifest
}

/// Write the manifest for `assignment` to `path`
pub async fn write_manifest(assignment: &RoleAssignment, path: &Path) -> OrchestratorResult<()> {
    fs::write(path, render_manifest(assignment))
        .await
        .map_err(|e| OrchestratorError::config(format!("cannot write manifest {}: {e}", path.display())))
}

/// Read manifest text back into `(role, endpoint)` entries
pub fn parse_manifest(contents: &str) -> OrchestratorResult<Vec<(Role, Endpoint)>> {
    contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| -> OrchestratorResult<(Role, Endpoint)> {
            let (role, endpoint) = line
                .split_once(',')
                .ok_or_else(|| OrchestratorError::config(format!("malformed manifest line: {line}")))?;
            Ok((role.parse()?, endpoint.parse()?))
        })
        .collect()
}

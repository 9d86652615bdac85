//! Role assignment over the host inventory

use serde::Serialize;
use shared::{Endpoint, Role};

use super::inventory::HostInventory;
use crate::error::{OrchestratorError, OrchestratorResult};

/// How role instances are spread over the inventory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AssignmentPolicy {
    /// Every role takes a prefix of the same host list; one host may run
    /// several roles on their distinct ports
    #[default]
    Shared,
    /// Servers, then mailboxes, then clients take consecutive slices
    Disjoint,
}

/// Requested number of instances per remote role
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoleCounts {
    pub servers: usize,
    pub mailboxes: usize,
    pub clients: usize,
}

impl RoleCounts {
    pub fn new(servers: usize, mailboxes: usize, clients: usize) -> Self {
        Self {
            servers,
            mailboxes,
            clients,
        }
    }

    pub fn get(&self, role: Role) -> usize {
        match role {
            Role::Server => self.servers,
            Role::Mailbox => self.mailboxes,
            Role::Client => self.clients,
            Role::Coordinator => 0,
        }
    }

    /// Instances across all roles; saturates instead of overflowing
    pub fn total(&self) -> usize {
        self.servers.saturating_add(self.mailboxes).saturating_add(self.clients)
    }

    /// Number of hosts the inventory must hold under `policy`
    pub fn required_hosts(&self, policy: AssignmentPolicy) -> usize {
        match policy {
            AssignmentPolicy::Shared => self.servers.max(self.mailboxes).max(self.clients),
            AssignmentPolicy::Disjoint => self.total(),
        }
    }
}

/// Endpoints per remote role, in inventory order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleAssignment {
    servers: Vec<Endpoint>,
    mailboxes: Vec<Endpoint>,
    clients: Vec<Endpoint>,
}

impl RoleAssignment {
    pub fn endpoints(&self, role: Role) -> &[Endpoint] {
        match role {
            Role::Server => &self.servers,
            Role::Mailbox => &self.mailboxes,
            Role::Client => &self.clients,
            Role::Coordinator => &[],
        }
    }

    /// Number of remote instances across all roles
    pub fn len(&self) -> usize {
        self.servers.len() + self.mailboxes.len() + self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct hosts holding at least one instance, in first-seen order
    pub fn hosts(&self) -> Vec<&str> {
        let mut hosts: Vec<&str> = Vec::new();
        for role in Role::MANIFEST_ORDER {
            for endpoint in self.endpoints(role) {
                if !hosts.contains(&endpoint.host.as_str()) {
                    hosts.push(&endpoint.host);
                }
            }
        }
        hosts
    }
}

/// Assign hosts and ports to every requested role instance.
///
/// Fails with `CapacityError` when the inventory is too short for `counts`
/// under `policy`.
pub fn assign_roles(
    inventory: &HostInventory,
    counts: RoleCounts,
    policy: AssignmentPolicy,
) -> OrchestratorResult<RoleAssignment> {
    let requested = counts.required_hosts(policy);
    if requested > inventory.len() {
        return Err(OrchestratorError::CapacityError {
            requested,
            available: inventory.len(),
        });
    }

    let hosts = inventory.hosts();
    let mut offset = 0;
    let mut take = |role: Role| -> Vec<Endpoint> {
        let count = counts.get(role);
        let port = role.base_port().unwrap_or_default();
        let start = match policy {
            AssignmentPolicy::Shared => 0,
            AssignmentPolicy::Disjoint => offset,
        };
        // bounded by the capacity check above
        offset += count;
        hosts[start..][..count]
            .iter()
            .map(|host| Endpoint::new(host.clone(), port))
            .collect()
    };

    Ok(RoleAssignment {
        servers: take(Role::Server),
        mailboxes: take(Role::Mailbox),
        clients: take(Role::Client),
    })
}

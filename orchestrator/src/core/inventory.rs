//! Host inventory loading

use std::path::Path;
use tokio::fs;

use crate::error::{OrchestratorError, OrchestratorResult};

/// Ordered list of candidate hosts. Order matters: roles take prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostInventory {
    hosts: Vec<String>,
}

impl HostInventory {
    pub fn new(hosts: Vec<String>) -> Self {
        Self { hosts }
    }

    /// Parse one host per line; surrounding whitespace and blank lines are dropped
    pub fn parse(contents: &str) -> Self {
        let hosts = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Self { hosts }
    }

    /// Load the inventory file at `path`
    pub async fn load(path: &Path) -> OrchestratorResult<Self> {
        let contents = fs::read_to_string(path).await.map_err(|e| {
            OrchestratorError::config(format!("cannot read inventory {}: {e}", path.display()))
        })?;
        Ok(Self::parse(&contents))
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

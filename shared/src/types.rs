//! Core types used throughout the orchestrator

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::{SharedError, SharedResult};

/// Class of process taking part in a benchmark run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Server,
    Mailbox,
    Client,
    Coordinator,
}

impl Role {
    /// Remote roles in the order they are started
    pub const STARTUP_ORDER: [Role; 3] = [Role::Mailbox, Role::Server, Role::Client];

    /// Remote roles in the order they are stopped (reverse of startup)
    pub const TEARDOWN_ORDER: [Role; 3] = [Role::Client, Role::Server, Role::Mailbox];

    /// Remote roles in the order they are listed in the manifest
    pub const MANIFEST_ORDER: [Role; 3] = [Role::Server, Role::Mailbox, Role::Client];

    /// Listening port shared by every instance of the role.
    /// The coordinator runs locally and has none.
    pub fn base_port(&self) -> Option<u16> {
        match self {
            Role::Server => Some(8000),
            Role::Mailbox => Some(9000),
            Role::Client => Some(10000),
            Role::Coordinator => None,
        }
    }

    /// Name of the binary implementing the role
    pub fn binary_name(&self) -> &'static str {
        self.as_str()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Server => "server",
            Role::Mailbox => "mailbox",
            Role::Client => "client",
            Role::Coordinator => "coordinator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "server" => Ok(Role::Server),
            "mailbox" => Ok(Role::Mailbox),
            "client" => Ok(Role::Client),
            "coordinator" => Ok(Role::Coordinator),
            _ => Err(SharedError::UnknownRole { input: s.to_string() }),
        }
    }
}

/// Address a role instance binds to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for Endpoint {
    type Err = SharedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || SharedError::InvalidEndpoint { input: s.to_string() };

        let (host, port) = s.trim().rsplit_once(':').ok_or_else(invalid)?;
        if host.is_empty() {
            return Err(invalid());
        }
        let port = port.parse::<u16>().map_err(|_| invalid())?;

        Ok(Endpoint::new(host, port))
    }
}

/// Fraction of malicious servers the config generator plans for, in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct AdversarialFraction(f64);

impl AdversarialFraction {
    pub const DEFAULT: AdversarialFraction = AdversarialFraction(0.2);

    pub fn new(value: f64) -> SharedResult<Self> {
        if value.is_finite() && (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(SharedError::InvalidConfig {
                field: "f".to_string(),
                value: value.to_string(),
            })
        }
    }

    pub const fn value(&self) -> f64 {
        self.0
    }
}

impl Default for AdversarialFraction {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for AdversarialFraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Step of a run, stamped on every log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Setup,
    Inventory,
    Config,
    Launch(Role),
    Readiness(Role),
    Coordinator,
    Teardown,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Setup => write!(f, "setup"),
            Phase::Inventory => write!(f, "inventory"),
            Phase::Config => write!(f, "config"),
            Phase::Launch(role) => write!(f, "launch:{role}"),
            Phase::Readiness(role) => write!(f, "readiness:{role}"),
            Phase::Coordinator => write!(f, "coordinator"),
            Phase::Teardown => write!(f, "teardown"),
        }
    }
}

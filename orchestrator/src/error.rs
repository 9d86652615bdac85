//! Orchestrator-specific error types

use shared::{Endpoint, Role, SharedError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Insufficient hosts: {requested} required, inventory holds {available}")]
    CapacityError { requested: usize, available: usize },

    #[error("Config generator failed (exit={exit_code:?}): {diagnostics}")]
    GeneratorError {
        exit_code: Option<i32>,
        diagnostics: String,
    },

    #[error("Failed to launch {role} on {endpoint}: {reason}")]
    LaunchError {
        role: Role,
        endpoint: Endpoint,
        reason: String,
    },

    #[error("Failed to signal pid {pid}: {reason}")]
    SignalError { pid: u32, reason: String },

    #[error("Coordinator failed (exit={exit_code:?}): {reason}")]
    CoordinatorFailure { exit_code: Option<i32>, reason: String },

    #[error("Run interrupted by {signal}")]
    Interrupted { signal: String },

    #[error("Shared component error: {0}")]
    SharedError(#[from] SharedError),

    #[error("JSON serialization error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl OrchestratorError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Process exit code reported for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ConfigError { .. } | Self::SharedError(_) | Self::JsonError(_) => 2,
            Self::CapacityError { .. } => 3,
            Self::GeneratorError { .. } => 4,
            Self::CoordinatorFailure {
                exit_code: Some(code),
                ..
            } => match u8::try_from(*code) {
                Ok(0) | Err(_) => 1,
                Ok(code) => code,
            },
            Self::Interrupted { .. } => 130,
            Self::CoordinatorFailure { exit_code: None, .. } | Self::LaunchError { .. } | Self::SignalError { .. } => 1,
        }
    }

    /// Whether the error stops the run before any remote launch
    pub fn is_fatal_before_launch(&self) -> bool {
        matches!(
            self,
            Self::ConfigError { .. } | Self::CapacityError { .. } | Self::GeneratorError { .. } | Self::SharedError(_)
        )
    }
}

pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

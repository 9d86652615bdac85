//! Shared error types for the experiment orchestrator

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SharedError {
    #[error("Unknown role: {input}")]
    UnknownRole { input: String },

    #[error("Invalid endpoint: {input}")]
    InvalidEndpoint { input: String },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },
}

pub type SharedResult<T> = Result<T, SharedError>;

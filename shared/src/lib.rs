//! Shared types for the experiment orchestrator
//!
//! Holds the vocabulary every part of a run agrees on: roles and their port
//! conventions, endpoints, the adversarial fraction handed to the config
//! generator, and phase-aware logging.

pub mod errors;
pub mod logging;
pub mod types;

pub use errors::*;
pub use types::*;

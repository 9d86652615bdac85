//! Service implementations
//!
//! Real implementations of the collaborator traits. These spawn the ssh
//! client, the config generator and the coordinator, and open TCP
//! connections for readiness checks.

pub mod command;
pub mod config_generator;
pub mod coordinator;
pub mod readiness;
pub mod remote_shell;

#[cfg(test)]
mod tests;

pub use command::CommandOutput;
pub use config_generator::RealConfigGenerator;
pub use coordinator::RealCoordinator;
pub use readiness::TcpReadinessProbe;
pub use remote_shell::RealRemoteLauncher;

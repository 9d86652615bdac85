//! Core run logic
//!
//! Host assignment, artifact bookkeeping, staged startup and teardown.
//! Nothing here talks to a process or a host directly; that goes through
//! the traits in `crate::traits`.

pub mod artifacts;
pub mod assignment;
pub mod inventory;
pub mod sequencer;
pub mod teardown;

pub use artifacts::{parse_manifest, render_manifest, write_manifest, ArtifactSet, MANIFEST_FILE};
pub use assignment::{assign_roles, AssignmentPolicy, RoleAssignment, RoleCounts};
pub use inventory::HostInventory;
pub use sequencer::{launch_args, ReadinessMode, StageTiming, StartupSequencer};
pub use teardown::{ExperimentRun, TeardownReport};

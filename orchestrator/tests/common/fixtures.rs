//! Test fixtures and data for orchestrator tests

use orchestrator::{ReadinessMode, StageTiming};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Standard test data and fixtures
pub struct TestFixtures;

impl TestFixtures {
    /// Inventory used unless a test writes its own
    pub const HOSTS: [&'static str; 3] = ["10.0.0.1", "10.0.0.2", "10.0.0.3"];

    /// First pid handed out by the mock launcher
    pub const FIRST_PID: u32 = 4000;

    /// Pauses short enough to keep tests fast
    pub fn fast_timing() -> StageTiming {
        StageTiming {
            stage_pause: Duration::from_millis(1),
            settle_pause: Duration::from_millis(1),
            readiness: ReadinessMode::Fixed,
            readiness_timeout: Duration::from_millis(100),
        }
    }

    /// Write an inventory file listing `hosts` and return its path
    pub fn write_inventory(dir: &Path, hosts: &[&str]) -> PathBuf {
        let path = dir.join("remote_ips");
        let mut contents = hosts.join("\n");
        contents.push('\n');
        std::fs::write(&path, contents).expect("write inventory");
        path
    }

    /// Manifest expected for one instance per role on the first host
    pub fn single_host_manifest() -> Vec<String> {
        vec![
            "server,10.0.0.1:8000".to_string(),
            "mailbox,10.0.0.1:9000".to_string(),
            "client,10.0.0.1:10000".to_string(),
        ]
    }
}

//! Tests for RealConfigGenerator against a scripted `config` binary

use super::common::{record_args_to, write_script, EXIT_GRACE};
use std::time::Duration;
use crate::core::ArtifactSet;
use crate::error::OrchestratorError;
use crate::services::config_generator::RealConfigGenerator;
use crate::traits::ConfigGenerator;
use shared::AdversarialFraction;

/// Touches every path passed after an output flag, like the real generator
const WRITES_OUTPUTS: &str = r#"
while [ $# -gt 0 ]; do
  case "$1" in
    --servers|--groups|--mailboxes|--clients) : > "$2" ;;
  esac
  shift 2
done"#;

fn fraction() -> AdversarialFraction {
    AdversarialFraction::new(0.2).unwrap()
}

#[test]
fn test_generator_args_name_manifest_fraction_and_outputs() {
    let artifacts = ArtifactSet::in_dir(std::path::Path::new("/run"));
    let args = RealConfigGenerator::generator_args(&artifacts.manifest, fraction(), &artifacts);

    assert_eq!(&args[..4], ["--ips", "/run/ip.list", "--f", "0.2"]);
    assert_eq!(&args[4..], artifacts.role_flags(shared::Role::Coordinator).as_slice());
}

#[tokio::test]
async fn test_successful_generation() {
    let bin = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    let log = work.path().join("config.log");
    write_script(
        bin.path(),
        "config",
        &format!("{}\n{WRITES_OUTPUTS}", record_args_to(&log)),
    );

    let artifacts = ArtifactSet::in_dir(work.path());
    let generator = RealConfigGenerator::new(bin.path(), work.path());
    generator
        .generate(&artifacts.manifest, fraction(), &artifacts)
        .await
        .unwrap();

    assert!(artifacts.missing_configs().is_empty());
    let recorded = std::fs::read_to_string(&log).unwrap();
    assert!(recorded.starts_with(&format!("--ips {} --f 0.2", artifacts.manifest.display())));
}

#[tokio::test]
async fn test_non_zero_exit_carries_code_and_stderr() {
    let bin = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_script(bin.path(), "config", "echo 'bad manifest line 3' >&2\nexit 7");

    let artifacts = ArtifactSet::in_dir(work.path());
    let err = RealConfigGenerator::new(bin.path(), work.path())
        .generate(&artifacts.manifest, fraction(), &artifacts)
        .await
        .unwrap_err();

    match err {
        OrchestratorError::GeneratorError { exit_code, diagnostics } => {
            assert_eq!(exit_code, Some(7));
            assert_eq!(diagnostics, "bad manifest line 3");
        }
        other => panic!("expected generator error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_success_without_outputs_is_an_error() {
    let bin = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_script(bin.path(), "config", "exit 0");

    let artifacts = ArtifactSet::in_dir(work.path());
    let err = RealConfigGenerator::new(bin.path(), work.path())
        .generate(&artifacts.manifest, fraction(), &artifacts)
        .await
        .unwrap_err();

    match err {
        OrchestratorError::GeneratorError { exit_code, diagnostics } => {
            assert_eq!(exit_code, Some(0));
            assert!(diagnostics.contains("client.config"));
        }
        other => panic!("expected generator error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_binary_is_a_generator_error() {
    let bin = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();

    let artifacts = ArtifactSet::in_dir(work.path());
    let generator = RealConfigGenerator::new(bin.path(), work.path());
    let err = generator
        .generate(&artifacts.manifest, fraction(), &artifacts)
        .await
        .unwrap_err();

    assert!(matches!(err, OrchestratorError::GeneratorError { exit_code: None, .. }));
    assert_eq!(err.exit_code(), 4);
    assert!(generator.program().ends_with("config"));
}

#[tokio::test]
async fn test_dropped_generation_writes_nothing_afterwards() {
    let bin = tempfile::tempdir().unwrap();
    let work = tempfile::tempdir().unwrap();
    write_script(bin.path(), "config", &format!("sleep 1\n{WRITES_OUTPUTS}"));

    let artifacts = ArtifactSet::in_dir(work.path());
    let generator = RealConfigGenerator::new(bin.path(), work.path());
    let generation = generator.generate(&artifacts.manifest, fraction(), &artifacts);

    // interrupted while the generator is still running
    assert!(tokio::time::timeout(Duration::from_millis(200), generation)
        .await
        .is_err());

    tokio::time::sleep(EXIT_GRACE).await;
    assert_eq!(artifacts.missing_configs().len(), 4);
    assert_eq!(std::fs::read_dir(work.path()).unwrap().count(), 0);
}

//! Entry point for the `run-experiment` binary
//!
//! Wires the real ssh, generator, coordinator and readiness services into
//! the orchestrator and maps the outcome to the process exit code.

use clap::Parser;
use std::process::ExitCode;

use orchestrator::{
    services::{RealConfigGenerator, RealCoordinator, RealRemoteLauncher, TcpReadinessProbe},
    Args, Orchestrator, RunConfig,
};
use shared::{logging, phase_debug, Phase};

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional
    let _ = dotenv::dotenv();

    let args = Args::parse();
    logging::init_tracing_with_level(Some(&args.log_level));

    let config = match RunConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            logging::log_error(&Phase::Setup, "Validating arguments", &e);
            return ExitCode::from(e.exit_code());
        }
    };
    phase_debug!(
        Phase::Setup,
        "bin dir {}, remote bin dir {}, work dir {}",
        config.bin_dir.display(),
        config.remote_bin_dir.display(),
        config.work_dir.display()
    );

    let generator = RealConfigGenerator::new(&config.bin_dir, config.work_dir.clone());
    let launcher = RealRemoteLauncher::new(config.remote_bin_dir.clone())
        .with_identity(config.identity.clone())
        .with_user(config.ssh_user.clone());
    let coordinator = RealCoordinator::new(&config.bin_dir);
    let probe = TcpReadinessProbe::new();

    let orchestrator = Orchestrator::new(config, generator, launcher, coordinator, probe);

    match orchestrator.run(wait_for_shutdown()).await {
        Ok(report) => ExitCode::from(report.exit_code()),
        Err(e) => {
            logging::log_error(&Phase::Setup, "Experiment", &e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Resolves with the name of the first termination signal received
async fn wait_for_shutdown() -> String {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    signal = wait_for_ctrl_c() => signal,
                    _ = sigterm.recv() => "SIGTERM".to_string(),
                }
            }
            Err(e) => {
                logging::log_error(&Phase::Setup, "Installing SIGTERM handler", &e);
                wait_for_ctrl_c().await
            }
        }
    }
    #[cfg(not(unix))]
    {
        wait_for_ctrl_c().await
    }
}

async fn wait_for_ctrl_c() -> String {
    if let Err(e) = tokio::signal::ctrl_c().await {
        logging::log_error(&Phase::Setup, "Installing Ctrl-C handler", &e);
        // without a handler the run can only end on its own
        std::future::pending::<()>().await;
    }
    "SIGINT".to_string()
}

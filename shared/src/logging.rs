//! Shared logging utilities for consistent tracing across a run

use crate::types::Phase;
use chrono::{DateTime, Utc};
use tracing::{error, info};

/// Crates whose events are shown at the requested level
const TRACED_CRATES: &[&str] = &["orchestrator", "run_experiment", "shared"];

/// Build the filter directive for the given base level
pub fn filter_directive(log_level: Option<&str>) -> String {
    let base_level = log_level.unwrap_or("info");
    TRACED_CRATES
        .iter()
        .map(|krate| format!("{krate}={base_level}"))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize the stdout tracing subscriber.
///
/// `RUST_LOG` takes precedence over `log_level` when set.
pub fn init_tracing_with_level(log_level: Option<&str>) {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_directive(log_level)));

    let _ = fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init();
}

/// Get formatted timestamp for consistent logging
pub fn format_timestamp() -> String {
    let now: DateTime<Utc> = Utc::now();
    now.format("%H:%M:%S%.3f").to_string()
}

/// Macro for phase-aware info logging
#[macro_export]
macro_rules! phase_info {
    ($phase:expr, $($arg:tt)*) => {
        tracing::info!(
            phase = %$phase,
            timestamp = shared::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for phase-aware warning logging
#[macro_export]
macro_rules! phase_warn {
    ($phase:expr, $($arg:tt)*) => {
        tracing::warn!(
            phase = %$phase,
            timestamp = shared::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for phase-aware error logging
#[macro_export]
macro_rules! phase_error {
    ($phase:expr, $($arg:tt)*) => {
        tracing::error!(
            phase = %$phase,
            timestamp = shared::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Macro for phase-aware debug logging
#[macro_export]
macro_rules! phase_debug {
    ($phase:expr, $($arg:tt)*) => {
        tracing::debug!(
            phase = %$phase,
            timestamp = shared::logging::format_timestamp(),
            $($arg)*
        );
    };
}

/// Contextual logging helper for startup messages
pub fn log_startup(phase: &Phase, details: &str) {
    info!(
        phase = %phase,
        timestamp = format_timestamp(),
        "🚀 Starting {}",
        details
    );
}

/// Contextual logging helper for shutdown messages
pub fn log_shutdown(phase: &Phase, reason: &str) {
    info!(
        phase = %phase,
        timestamp = format_timestamp(),
        "🛑 Shutting down: {}",
        reason
    );
}

/// Contextual logging helper for error conditions
pub fn log_error(phase: &Phase, context: &str, error: &dyn std::fmt::Display) {
    error!(
        phase = %phase,
        timestamp = format_timestamp(),
        error = %error,
        "❌ {} failed: {}",
        context,
        error
    );
}

/// Contextual logging helper for success conditions
pub fn log_success(phase: &Phase, message: &str) {
    info!(
        phase = %phase,
        timestamp = format_timestamp(),
        "✅ {}",
        message
    );
}

/// Contextual logging helper for progress updates
pub fn log_progress(phase: &Phase, action: &str, details: &str) {
    info!(
        phase = %phase,
        timestamp = format_timestamp(),
        "📋 {}: {}",
        action,
        details
    );
}

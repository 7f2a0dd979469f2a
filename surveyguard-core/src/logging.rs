//! Logging setup for SurveyGuard.
//!
//! What gets logged, and at which level:
//! - `info`: one summary per pipeline stage (columns kept, columns bucketed,
//!   feedback censored) and cache loads
//! - `debug`: per-column decisions such as bucket widths, coerced columns and
//!   assigned answer lists
//! - `warn`: capability failures and data quality diagnostics
//!
//! Records carry question ids, group codes and counts. Respondent answers
//! and feedback text are never logged, censored or not.

use tracing_subscriber::EnvFilter;

use crate::Result;

/// Crates whose records follow the verbosity flags; everything else is
/// held at `warn`.
const SURVEYGUARD_TARGETS: [&str; 2] = ["surveyguard", "surveyguard_core"];

/// Maps CLI verbosity flags to a tracing level.
fn level_for(verbose: u8, quiet: bool) -> tracing::Level {
    match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    }
}

/// Filter directives for the given level.
fn directives(level: tracing::Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    let floor = if level == "error" { "error" } else { "warn" };
    SURVEYGUARD_TARGETS
        .iter()
        .fold(floor.to_string(), |acc, target| format!("{acc},{target}={level}"))
}

/// Initializes logging to stderr based on verbosity level.
///
/// # Arguments
/// * `verbose` - Verbosity level (0=INFO, 1=DEBUG, 2+=TRACE)
/// * `quiet` - If true, only show ERROR level logs
///
/// # Example
/// ```rust,no_run
/// use surveyguard_core::logging::init_logging;
///
/// init_logging(1, false).expect("Failed to initialize logging");
/// ```
pub fn init_logging(verbose: u8, quiet: bool) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives(level_for(verbose, quiet))))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| {
            crate::error::SurveyError::configuration(format!(
                "Failed to initialize logging: {}",
                e
            ))
        })?;

    Ok(())
}

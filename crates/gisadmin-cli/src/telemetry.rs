//! Structured telemetry for a `gisadmin` run.
//!
//! Diagnostics go to stderr so stdout stays reserved for the run's output
//! value. Run events use `gisadmin::*` targets; the HTTP stack is held at
//! `warn` unless the filter names it explicitly, which keeps `debug` runs
//! readable.

use std::io::{self, IsTerminal};

use gisadmin_config::{Config, LogFormat};
use once_cell::sync::OnceCell;
use tracing::{Subscriber, subscriber::SetGlobalDefaultError};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::fmt;

static TELEMETRY_GUARD: OnceCell<()> = OnceCell::new();

/// Library targets quietened unless the filter mentions them.
const HTTP_STACK_TARGETS: &[&str] = &["hyper", "reqwest", "rustls"];

/// Handle returned when telemetry has been initialised.
#[derive(Debug, Default, Clone, Copy)]
pub struct TelemetryHandle;

/// Errors encountered while configuring telemetry.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    /// Failed to parse the configured log filter expression.
    #[error("invalid log filter: {0}")]
    Filter(String),
    /// Failed to install the tracing subscriber.
    #[error("failed to install telemetry subscriber: {0}")]
    Subscriber(SetGlobalDefaultError),
}

/// Installs the process-wide subscriber for this run.
///
/// Only the first call installs anything; later calls return a fresh
/// [`TelemetryHandle`].
///
/// # Examples
///
/// ```rust
/// use gisadmin_cli::telemetry;
/// use gisadmin_config::Config;
///
/// # fn main() -> Result<(), gisadmin_cli::telemetry::TelemetryError> {
/// let config = Config::default();
/// let first = telemetry::initialise(&config)?;
/// let second = telemetry::initialise(&config)?;
/// drop(first);
/// drop(second);
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns [`TelemetryError`] when the filter is invalid or another
/// subscriber is already installed.
pub fn initialise(config: &Config) -> Result<TelemetryHandle, TelemetryError> {
    TELEMETRY_GUARD
        .get_or_try_init(|| install_subscriber(config))
        .map(|_| TelemetryHandle)
}

/// Parses `expression` and caps the HTTP stack at `warn` where it is not named.
fn build_filter(expression: &str) -> Result<EnvFilter, TelemetryError> {
    let mut filter =
        EnvFilter::try_new(expression).map_err(|error| TelemetryError::Filter(error.to_string()))?;
    for target in HTTP_STACK_TARGETS {
        if mentions_target(expression, target) {
            continue;
        }
        let directive: Directive = format!("{target}=warn")
            .parse()
            .map_err(|error: tracing_subscriber::filter::ParseError| {
                TelemetryError::Filter(error.to_string())
            })?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}

fn mentions_target(expression: &str, target: &str) -> bool {
    expression.split(',').any(|directive| {
        let name = directive.split(['=', '[']).next().unwrap_or_default().trim();
        name == target || name.starts_with(&format!("{target}::"))
    })
}

fn install_subscriber(config: &Config) -> Result<(), TelemetryError> {
    let filter = build_filter(config.log_filter())?;
    let format = config.log_format();

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(io::stderr)
        .with_ansi(format.allows_colour() && io::stderr().is_terminal())
        .with_timer(fmt::time::UtcTime::rfc_3339());

    let subscriber: Box<dyn Subscriber + Send + Sync> = match format {
        LogFormat::Json => Box::new(subscriber.json().flatten_event(true).finish()),
        LogFormat::Compact => Box::new(subscriber.compact().finish()),
    };

    tracing::subscriber::set_global_default(subscriber).map_err(TelemetryError::Subscriber)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[test]
    fn invalid_filter_is_reported() {
        let error = install_subscriber(&Config::default().with_log_filter("gisadmin=loud"))
            .expect_err("filter should be rejected");
        assert!(matches!(error, TelemetryError::Filter(_)));
    }

    #[test]
    fn default_filter_quietens_the_http_stack() {
        let filter = build_filter(Config::default().log_filter())
            .expect("default filter")
            .to_string()
            .to_lowercase();
        for target in HTTP_STACK_TARGETS {
            assert!(filter.contains(&format!("{target}=warn")), "{filter}");
        }
        assert!(filter.contains("gisadmin=info"), "{filter}");
    }

    #[rstest]
    #[case::named("debug,hyper=trace", "hyper", true)]
    #[case::module("reqwest::connect=debug", "reqwest", true)]
    #[case::span("rustls[handshake]=debug", "rustls", true)]
    #[case::prefix_only("hyperion=debug", "hyper", false)]
    #[case::level_only("debug", "hyper", false)]
    fn explicit_targets_are_left_alone(
        #[case] expression: &str,
        #[case] target: &str,
        #[case] expected: bool,
    ) {
        assert_eq!(mentions_target(expression, target), expected);
    }
}

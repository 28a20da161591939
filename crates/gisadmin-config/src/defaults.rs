use crate::logging::LogFormat;

/// Default log filter expression: run events at `info`, libraries at `warn`.
pub const DEFAULT_LOG_FILTER: &str = "warn,gisadmin=info";

/// Program that receives failure alerts on stdin.
pub const DEFAULT_ALERT_COMMAND: &str = "sendmail -t";

/// Subject line used for failure alerts.
pub const DEFAULT_ALERT_SUBJECT: &str = "Site administration failure";

/// Default log filter expression used by the binary.
#[must_use]
pub fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binary.
#[must_use]
pub fn default_log_format() -> LogFormat {
    LogFormat::Compact
}

/// Owned alert command used by the configuration loader.
#[must_use]
pub fn default_alert_command() -> String {
    DEFAULT_ALERT_COMMAND.to_owned()
}

/// Owned alert subject used by the configuration loader.
#[must_use]
pub fn default_alert_subject() -> String {
    DEFAULT_ALERT_SUBJECT.to_owned()
}

//! Shared configuration for the `gisadmin` site administration tool.
//!
//! Configuration is layered with `ortho_config`: built-in defaults, then a
//! configuration file (`--config-path`, `GISADMIN_CONFIG_PATH`, or
//! `.gisadmin.toml`), then `GISADMIN_*` environment variables, then CLI flags.
//! The resulting [`Config`] is loaded once per run and handed explicitly to
//! the components that need it; nothing here is process-global.
//!
//! The crate also owns [`SiteEndpoint`], the parsed form of the site URL the
//! operator supplies on the command line.

mod defaults;
mod endpoint;
mod logging;

use camino::{Utf8Path, Utf8PathBuf};
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

pub use defaults::{
    DEFAULT_ALERT_COMMAND, DEFAULT_ALERT_SUBJECT, DEFAULT_LOG_FILTER, default_alert_command,
    default_alert_subject, default_log_filter, default_log_filter_string, default_log_format,
};
pub use endpoint::{
    ADMIN_SEGMENT, DEFAULT_CONTEXT_PATH, EndpointParseError, Port, Protocol, SiteEndpoint,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Resolved configuration for a single administration run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "GISADMIN_")]
pub struct Config {
    /// `tracing_subscriber::EnvFilter` expression.
    #[ortho_config(default = default_log_filter_string())]
    log_filter: String,
    /// Rendering used for telemetry on stderr.
    #[ortho_config(default = default_log_format())]
    log_format: LogFormat,
    /// Append-only audit log recording run boundaries and failures.
    audit_log: Option<Utf8PathBuf>,
    /// Sends an alert through `alert_command` when a run fails.
    #[ortho_config(default = false)]
    send_alerts: bool,
    /// Program (with arguments) that receives the alert message on stdin.
    #[ortho_config(default = default_alert_command())]
    alert_command: String,
    /// Recipient written into the alert's `To:` header.
    alert_recipient: Option<String>,
    /// Mailbox written into the alert's `From:` header.
    alert_sender: Option<String>,
    /// Subject written into the alert's `Subject:` header.
    #[ortho_config(default = default_alert_subject())]
    alert_subject: String,
    /// Free text placed before the failure details in an alert.
    #[ortho_config(default = String::new())]
    alert_preamble: String,
    /// Accepts TLS certificates that fail verification.
    #[ortho_config(default = false)]
    insecure_tls: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            audit_log: None,
            send_alerts: false,
            alert_command: default_alert_command(),
            alert_recipient: None,
            alert_sender: None,
            alert_subject: default_alert_subject(),
            alert_preamble: String::new(),
            insecure_tls: false,
        }
    }
}

impl Config {
    /// Log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Telemetry rendering format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Audit log destination, when audit logging is enabled.
    #[must_use]
    pub fn audit_log(&self) -> Option<&Utf8Path> {
        self.audit_log.as_deref()
    }

    /// Whether failures should raise an alert.
    #[must_use]
    pub const fn send_alerts(&self) -> bool {
        self.send_alerts
    }

    /// Alert program and its arguments as a single shell-style string.
    #[must_use]
    pub fn alert_command(&self) -> &str {
        &self.alert_command
    }

    /// Alert recipient, if configured.
    #[must_use]
    pub fn alert_recipient(&self) -> Option<&str> {
        self.alert_recipient.as_deref()
    }

    /// Alert sender, if configured.
    #[must_use]
    pub fn alert_sender(&self) -> Option<&str> {
        self.alert_sender.as_deref()
    }

    /// Alert subject line.
    #[must_use]
    pub fn alert_subject(&self) -> &str {
        &self.alert_subject
    }

    /// Text placed before the failure details.
    #[must_use]
    pub fn alert_preamble(&self) -> &str {
        &self.alert_preamble
    }

    /// Whether TLS certificate verification is disabled.
    #[must_use]
    pub const fn insecure_tls(&self) -> bool {
        self.insecure_tls
    }

    /// Returns a copy with the audit log redirected to `path`.
    #[must_use]
    pub fn with_audit_log(mut self, path: impl Into<Utf8PathBuf>) -> Self {
        self.audit_log = Some(path.into());
        self
    }

    /// Returns a copy with alerting switched on or off.
    #[must_use]
    pub fn with_send_alerts(mut self, enabled: bool) -> Self {
        self.send_alerts = enabled;
        self
    }

    /// Returns a copy using `command` to deliver alerts.
    #[must_use]
    pub fn with_alert_command(mut self, command: impl Into<String>) -> Self {
        self.alert_command = command.into();
        self
    }

    /// Returns a copy addressing alerts to `recipient`.
    #[must_use]
    pub fn with_alert_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.alert_recipient = Some(recipient.into());
        self
    }

    /// Returns a copy sending alerts from `sender`.
    #[must_use]
    pub fn with_alert_sender(mut self, sender: impl Into<String>) -> Self {
        self.alert_sender = Some(sender.into());
        self
    }

    /// Returns a copy using `filter` as the telemetry filter.
    #[must_use]
    pub fn with_log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }
}

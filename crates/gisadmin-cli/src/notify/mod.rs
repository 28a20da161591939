//! Run-boundary and failure notification.
//!
//! The controller reports through [`RunNotifier`] and never knows which sinks
//! are attached. [`NotifierSet::from_config`] assembles the sinks a run asks
//! for: structured telemetry always, plus the audit log and the alert command
//! when configured.

mod alert;
mod audit;

use gisadmin_config::Config;

pub use alert::{AlertCommand, AlertError};
pub use audit::{AuditLog, audit_timestamp};

/// Kind of entry recorded by a notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunEvent {
    /// The run began.
    Start,
    /// The run finished successfully.
    End,
    /// The run failed; the message is the failure text.
    Error,
    /// Something needs attention but the run continues.
    Warning,
    /// Informational note.
    Info,
}

/// Sink for run events and failure alerts.
pub trait RunNotifier {
    /// Records `event`; `message` is empty for run boundaries.
    fn log_event(&self, event: RunEvent, message: &str);

    /// Raises an out-of-band alert for a failed run.
    fn notify_on_failure(&self, message: &str);
}

impl<T> RunNotifier for Box<T>
where
    T: RunNotifier + ?Sized,
{
    fn log_event(&self, event: RunEvent, message: &str) {
        (**self).log_event(event, message);
    }

    fn notify_on_failure(&self, message: &str) {
        (**self).notify_on_failure(message);
    }
}

/// Notifier that records events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredNotifier;

impl RunNotifier for StructuredNotifier {
    fn log_event(&self, event: RunEvent, message: &str) {
        match event {
            RunEvent::Start => tracing::info!(
                target: "gisadmin::run",
                event = "run_started",
                "site administration run started"
            ),
            RunEvent::End => tracing::info!(
                target: "gisadmin::run",
                event = "run_finished",
                "site administration run finished"
            ),
            RunEvent::Error => tracing::error!(
                target: "gisadmin::run",
                event = "run_failed",
                error = %message,
                "site administration run failed"
            ),
            RunEvent::Warning => tracing::warn!(
                target: "gisadmin::run",
                event = "run_warning",
                "{message}"
            ),
            RunEvent::Info => tracing::info!(
                target: "gisadmin::run",
                event = "run_info",
                "{message}"
            ),
        }
    }

    fn notify_on_failure(&self, message: &str) {
        tracing::info!(
            target: "gisadmin::run",
            event = "alert_requested",
            error = %message,
            "raising failure alert"
        );
    }
}

/// Fans events out to every attached sink in order.
#[derive(Default)]
pub struct NotifierSet {
    sinks: Vec<Box<dyn RunNotifier>>,
}

impl NotifierSet {
    /// Creates a set with no sinks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches `sink`.
    #[must_use]
    pub fn with(mut self, sink: impl RunNotifier + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    /// Builds the sinks requested by `config`.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError`] when alerts are enabled but the alert command
    /// cannot be parsed.
    pub fn from_config(config: &Config) -> Result<Self, AlertError> {
        let mut set = Self::new().with(StructuredNotifier);
        if let Some(path) = config.audit_log() {
            set = set.with(AuditLog::new(path));
        }
        if config.send_alerts() {
            set = set.with(AlertCommand::from_config(config)?);
        }
        Ok(set)
    }

    /// Number of attached sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Returns `true` when no sinks are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl RunNotifier for NotifierSet {
    fn log_event(&self, event: RunEvent, message: &str) {
        for sink in &self.sinks {
            sink.log_event(event, message);
        }
    }

    fn notify_on_failure(&self, message: &str) {
        for sink in &self.sinks {
            sink.notify_on_failure(message);
        }
    }
}

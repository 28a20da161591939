//! Append-only audit log.

use std::fs::OpenOptions;
use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use time::OffsetDateTime;
use time::macros::format_description;

use super::{RunEvent, RunNotifier};

/// Formats `moment` the way audit entries are stamped.
#[must_use]
pub fn audit_timestamp(moment: OffsetDateTime) -> String {
    moment
        .format(format_description!(
            "[day]/[month]/[year] - [hour]:[minute]:[second]"
        ))
        .unwrap_or_else(|_| moment.unix_timestamp().to_string())
}

/// Writes run boundaries and failures to a text file.
#[derive(Debug, Clone)]
pub struct AuditLog {
    path: Utf8PathBuf,
    clock: fn() -> OffsetDateTime,
}

impl AuditLog {
    /// Appends to `path`, creating it on first use.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            clock: local_now,
        }
    }

    /// Replaces the wall clock used to stamp entries.
    #[must_use]
    pub fn with_clock(mut self, clock: fn() -> OffsetDateTime) -> Self {
        self.clock = clock;
        self
    }

    /// Destination file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    fn entry(&self, event: RunEvent, message: &str) -> String {
        let stamp = audit_timestamp((self.clock)());
        match event {
            RunEvent::Start => format!("---\nProcess started at {stamp}"),
            RunEvent::End => format!("\nProcess ended at {stamp}\n---\n"),
            RunEvent::Info => format!("\nInfo: {message}"),
            RunEvent::Warning => format!("\nWarning: {message}"),
            RunEvent::Error => format!("\nProcess ended at {stamp}\nError: {message}\n---\n"),
        }
    }

    fn append(&self, entry: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(entry.as_bytes())
    }
}

impl RunNotifier for AuditLog {
    fn log_event(&self, event: RunEvent, message: &str) {
        if let Err(error) = self.append(&self.entry(event, message)) {
            tracing::warn!(
                target: "gisadmin::audit",
                event = "audit_write_failed",
                path = %self.path,
                error = %error,
                "failed to append to audit log"
            );
        }
    }

    fn notify_on_failure(&self, _message: &str) {}
}

fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

//! Operator-facing progress channel.

use std::fmt;
use std::io::Write;

/// Wrapper around the CLI output streams used while a run is in progress.
///
/// Progress lines go to stdout and warnings to stderr. A closed stream does
/// not abort the run; the failed write is logged instead.
pub struct OperatorOutput<W, E> {
    stdout: W,
    stderr: E,
}

impl<W: Write, E: Write> OperatorOutput<W, E> {
    /// Wraps the two streams.
    pub fn new(stdout: W, stderr: E) -> Self {
        Self { stdout, stderr }
    }

    /// Writes a progress line to stdout.
    pub fn progress(&mut self, args: fmt::Arguments<'_>) {
        if let Err(error) = writeln!(self.stdout, "{args}") {
            tracing::warn!(
                target: "gisadmin::output",
                event = "stdout_write_failed",
                error = %error,
                "failed to write progress message"
            );
        }
    }

    /// Writes a warning line to stderr.
    pub fn warning(&mut self, args: fmt::Arguments<'_>) {
        if let Err(error) = writeln!(self.stderr, "{args}") {
            tracing::warn!(
                target: "gisadmin::output",
                event = "stderr_write_failed",
                error = %error,
                "failed to write warning message"
            );
        }
    }

    /// Releases the wrapped streams.
    pub fn into_inner(self) -> (W, E) {
        (self.stdout, self.stderr)
    }
}

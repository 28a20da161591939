//! CLI entrypoint for the `gisadmin` site administration tool.
//!
//! The binary delegates to [`gisadmin_cli::run`], which loads configuration,
//! parses the command line, and drives the backup or restore run.

use std::io::{self, StderrLock, StdoutLock};
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut stdout: StdoutLock<'_> = io::stdout().lock();
    let mut stderr: StderrLock<'_> = io::stderr().lock();
    gisadmin_cli::run(std::env::args_os(), &mut stdout, &mut stderr)
}

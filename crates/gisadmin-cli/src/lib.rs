//! Command-line runtime for the `gisadmin` site administration tool.
//!
//! The crate owns argument parsing, configuration bootstrapping, telemetry,
//! the notifier sinks, and the site lifecycle controller that drives the
//! administrative REST API. [`run`] is the binary's entry point; tests call
//! the same runner with substituted configuration and in-memory streams.

use std::ffi::OsString;
use std::io::Write;
use std::process::ExitCode;

use clap::Parser;
use gisadmin_config::Config;

mod cli;
mod config;
mod errors;
pub mod notify;
pub mod output;
pub mod report;
pub mod site;
pub mod telemetry;

use cli::Cli;
use config::{ConfigArgumentSplit, split_config_arguments};
pub(crate) use config::{ConfigLoader, OrthoConfigLoader};
pub(crate) use errors::AppError;
use notify::NotifierSet;
use output::OperatorOutput;
use site::{HttpTransport, RunRequest, SiteController};

/// CLI flags recognised by the configuration loader that take a value.
///
/// MAINTENANCE: keep this list and [`CONFIG_CLI_SWITCHES`] in sync with the
/// fields of `gisadmin_config::Config`.
const CONFIG_CLI_FLAGS: &[&str] = &[
    "--config-path",
    "--log-filter",
    "--log-format",
    "--audit-log",
    "--alert-command",
    "--alert-recipient",
    "--alert-sender",
    "--alert-subject",
    "--alert-preamble",
];

/// Boolean configuration flags; they never consume the next argument.
const CONFIG_CLI_SWITCHES: &[&str] = &["--send-alerts", "--insecure-tls"];

struct CliRunner<'a, W: Write, E: Write, L: ConfigLoader> {
    stdout: &'a mut W,
    stderr: &'a mut E,
    loader: &'a L,
}

impl<'a, W, E, L> CliRunner<'a, W, E, L>
where
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    fn new(stdout: &'a mut W, stderr: &'a mut E, loader: &'a L) -> Self {
        Self {
            stdout,
            stderr,
            loader,
        }
    }

    fn run<I>(&mut self, args: I) -> ExitCode
    where
        I: IntoIterator<Item = OsString>,
    {
        let args: Vec<OsString> = args.into_iter().collect();
        let split = split_config_arguments(&args);
        let cli_arguments = prepare_cli_arguments(&args, &split);

        let cli = match Cli::try_parse_from(cli_arguments) {
            Ok(cli) => cli,
            Err(error) if !error.use_stderr() => {
                let _ = write!(self.stdout, "{}", error.render());
                return ExitCode::SUCCESS;
            }
            Err(error) => return self.fail(&AppError::CliUsage(error)),
        };

        let result = self
            .loader
            .load(&split.config_arguments)
            .and_then(|config| self.execute(cli, &config));

        match result {
            Ok(exit_code) => exit_code,
            Err(error) => self.fail(&error),
        }
    }

    fn execute(&mut self, cli: Cli, config: &Config) -> Result<ExitCode, AppError> {
        telemetry::initialise(config)?;
        let notifier = NotifierSet::from_config(config)?;
        let transport = HttpTransport::from_config(config)?;
        let request = RunRequest::from(cli.command);

        let mut output = OperatorOutput::new(&mut *self.stdout, &mut *self.stderr);
        let mut controller = SiteController::new(&transport, &notifier, config);
        let summary = controller.run(&request, &mut output)?;

        if let Some(location) = summary.backup_location {
            let _ = writeln!(self.stdout, "{location}");
        }
        Ok(ExitCode::SUCCESS)
    }

    fn fail(&mut self, error: &AppError) -> ExitCode {
        let _ = writeln!(self.stderr, "{error}");
        ExitCode::FAILURE
    }
}

/// Runs the CLI using the provided arguments and IO handles.
#[must_use]
pub fn run<I, W, E>(args: I, stdout: &mut W, stderr: &mut E) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
{
    run_with_loader(args, stdout, stderr, &OrthoConfigLoader)
}

/// Runs the CLI with a custom configuration loader.
#[must_use]
pub(crate) fn run_with_loader<I, W, E, L>(
    args: I,
    stdout: &mut W,
    stderr: &mut E,
    loader: &L,
) -> ExitCode
where
    I: IntoIterator<Item = OsString>,
    W: Write,
    E: Write,
    L: ConfigLoader,
{
    CliRunner::new(stdout, stderr, loader).run(args)
}

fn prepare_cli_arguments(args: &[OsString], split: &ConfigArgumentSplit) -> Vec<OsString> {
    let mut cli_arguments: Vec<OsString> = Vec::new();
    if let Some(first) = args.first() {
        cli_arguments.push(first.clone());
    }
    cli_arguments.extend(args.iter().skip(split.command_start).cloned());
    cli_arguments
}

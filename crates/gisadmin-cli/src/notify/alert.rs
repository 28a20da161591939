//! Failure alerts delivered through an external mail command.

use std::io::{self, Write};
use std::process::{Command, ExitStatus, Stdio};

use gisadmin_config::Config;
use thiserror::Error;

use super::{RunEvent, RunNotifier};

/// Errors raised while preparing or sending an alert.
#[derive(Debug, Error)]
pub enum AlertError {
    /// The configured command line could not be tokenised.
    #[error("alert command is not valid shell syntax: {0}")]
    InvalidCommand(#[source] shell_words::ParseError),
    /// The configured command line is blank.
    #[error("alert command is empty")]
    EmptyCommand,
    /// The program could not be started.
    #[error("failed to start alert command '{program}': {source}")]
    Spawn {
        /// Program that was launched.
        program: String,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// The message could not be handed to the program.
    #[error("failed to write alert message: {0}")]
    Write(#[source] io::Error),
    /// The program reported failure.
    #[error("alert command '{program}' exited with {status}")]
    Exit {
        /// Program that was launched.
        program: String,
        /// Reported exit status.
        status: ExitStatus,
    },
}

/// Pipes a mail message to a sendmail-compatible program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertCommand {
    program: String,
    args: Vec<String>,
    recipient: Option<String>,
    sender: Option<String>,
    subject: String,
    preamble: String,
}

impl AlertCommand {
    /// Builds the alert sink from the `alert_*` settings.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError::InvalidCommand`] or [`AlertError::EmptyCommand`]
    /// when `alert_command` does not name a program.
    pub fn from_config(config: &Config) -> Result<Self, AlertError> {
        let mut words =
            shell_words::split(config.alert_command()).map_err(AlertError::InvalidCommand)?;
        if words.is_empty() {
            return Err(AlertError::EmptyCommand);
        }
        let program = words.remove(0);
        Ok(Self {
            program,
            args: words,
            recipient: config.alert_recipient().map(str::to_owned),
            sender: config.alert_sender().map(str::to_owned),
            subject: config.alert_subject().to_owned(),
            preamble: config.alert_preamble().to_owned(),
        })
    }

    /// Program that receives the message.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the program.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Renders the message written to the program's standard input.
    ///
    /// `From:` and `To:` headers are only written when configured.
    #[must_use]
    pub fn compose(&self, failure: &str) -> String {
        let mut message = String::new();
        if let Some(sender) = &self.sender {
            message.push_str(&format!("From: {sender}\n"));
        }
        if let Some(recipient) = &self.recipient {
            message.push_str(&format!("To: {recipient}\n"));
        }
        message.push_str(&format!(
            "Subject: {}\n\n{}\n\n{failure}\n",
            self.subject, self.preamble
        ));
        message
    }

    /// Runs the program with the composed message on its standard input.
    ///
    /// # Errors
    ///
    /// Returns [`AlertError`] when the program cannot be started, does not
    /// accept the message, or exits unsuccessfully.
    pub fn send(&self, failure: &str) -> Result<(), AlertError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| AlertError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(self.compose(failure).as_bytes())
                .map_err(AlertError::Write)?;
        }

        let status = child.wait().map_err(AlertError::Write)?;
        if status.success() {
            Ok(())
        } else {
            Err(AlertError::Exit {
                program: self.program.clone(),
                status,
            })
        }
    }
}

impl RunNotifier for AlertCommand {
    fn log_event(&self, _event: RunEvent, _message: &str) {}

    fn notify_on_failure(&self, message: &str) {
        match self.send(message) {
            Ok(()) => tracing::info!(
                target: "gisadmin::alert",
                event = "alert_sent",
                program = %self.program,
                "failure alert sent"
            ),
            Err(error) => tracing::warn!(
                target: "gisadmin::alert",
                event = "alert_failed",
                program = %self.program,
                error = %error,
                "failed to send failure alert"
            ),
        }
    }
}

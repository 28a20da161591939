//! Error taxonomy for site administration runs.

use std::fmt;

use camino::Utf8PathBuf;
use gisadmin_config::{EndpointParseError, SiteEndpoint};
use thiserror::Error;

use super::call::{ApplicationFailure, FailureKind};
use super::transport::TransportError;
use crate::report::ReportError;

/// Network-facing step of a run, used to phrase failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Token issuance.
    IssueToken,
    /// `createNewSite`.
    CreateSite,
    /// `exportSite`.
    Backup,
    /// `importSite`.
    Restore,
    /// `system/webadaptors/register`.
    RegisterWebAdaptor,
}

impl Phase {
    fn failure(self, host: &str) -> String {
        match self {
            Self::IssueToken => String::from("error while generating the token"),
            Self::CreateSite => String::from("error creating site"),
            Self::Backup => format!("unable to back up the site running at {host}"),
            Self::Restore => format!("the restore of the site {host} failed"),
            Self::RegisterWebAdaptor => String::from("error registering web adaptor"),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::IssueToken => "issue token",
            Self::CreateSite => "create site",
            Self::Backup => "back up site",
            Self::Restore => "restore site",
            Self::RegisterWebAdaptor => "register web adaptor",
        })
    }
}

/// Required argument for the selected mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredParameter {
    /// Destination folder for a backup.
    BackupFolder,
    /// Source file for a restore.
    BackupFile,
}

impl fmt::Display for RequiredParameter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::BackupFolder => "please define a folder for the backup to be exported to",
            Self::BackupFile => "please define a site backup file",
        })
    }
}

/// Failures that end a run, plus the non-fatal report write failure.
#[derive(Debug, Error)]
pub enum SiteError {
    /// The site URL could not be decomposed.
    #[error("the site URL should be in the format http(s)://<host>:<port>/arcgis: {0}")]
    MalformedEndpoint(#[from] EndpointParseError),
    /// No response was received.
    #[error("unable to connect to the site on {host} ({phase}); check that the server is running: {source}")]
    Transport {
        /// Step that was attempted.
        phase: Phase,
        /// Site host.
        host: String,
        /// Underlying failure.
        #[source]
        source: TransportError,
    },
    /// The server answered with a non-200 status.
    #[error("{failure}: HTTP {status}: {body}")]
    Http {
        /// Step that was attempted.
        phase: Phase,
        /// Human-readable failure summary.
        failure: String,
        /// Status code returned by the server.
        status: u16,
        /// Raw response body.
        body: String,
    },
    /// The server answered 200 but reported failure.
    #[error("{failure}: {}", join_messages(.messages))]
    Application {
        /// Step that was attempted.
        phase: Phase,
        /// Human-readable failure summary.
        failure: String,
        /// Classification of the failure.
        kind: FailureKind,
        /// Server messages verbatim.
        messages: Vec<String>,
    },
    /// A mode-specific argument was empty.
    #[error("{0}")]
    MissingParameter(RequiredParameter),
    /// The restore report could not be saved.
    #[error("unable to save the report file at {path}; verify this location is available: {source}")]
    ReportWrite {
        /// Requested report location.
        path: Utf8PathBuf,
        /// Underlying failure.
        #[source]
        source: ReportError,
    },
}

impl SiteError {
    /// Maps an application failure onto the matching variant.
    #[must_use]
    pub fn from_failure(phase: Phase, endpoint: &SiteEndpoint, failure: ApplicationFailure) -> Self {
        let summary = phase.failure(endpoint.host());
        let ApplicationFailure { kind, mut messages } = failure;
        match kind {
            FailureKind::Http { status } => Self::Http {
                phase,
                failure: summary,
                status,
                body: messages.pop().unwrap_or_default(),
            },
            kind => Self::Application {
                phase,
                failure: summary,
                kind,
                messages,
            },
        }
    }

    /// Phase the failure occurred in, when it came from the server.
    #[must_use]
    pub const fn phase(&self) -> Option<Phase> {
        match self {
            Self::Transport { phase, .. }
            | Self::Http { phase, .. }
            | Self::Application { phase, .. } => Some(*phase),
            Self::MalformedEndpoint(_) | Self::MissingParameter(_) | Self::ReportWrite { .. } => {
                None
            }
        }
    }
}

fn join_messages(messages: &[String]) -> String {
    if messages.is_empty() {
        String::from("no details returned")
    } else {
        messages.join("; ")
    }
}

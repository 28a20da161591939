//! Error types for the CLI runtime.

use std::sync::Arc;

use thiserror::Error;

use crate::notify::AlertError;
use crate::site::{SiteError, TransportError};
use crate::telemetry::TelemetryError;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load configuration: {0}")]
    LoadConfiguration(Arc<ortho_config::OrthoError>),
    #[error("{0}")]
    CliUsage(clap::Error),
    #[error("failed to initialise telemetry: {0}")]
    Telemetry(#[from] TelemetryError),
    #[error("failed to configure failure alerts: {0}")]
    Alert(#[from] AlertError),
    #[error("failed to prepare the HTTP transport: {0}")]
    Transport(#[from] TransportError),
    #[error("{0}")]
    Site(#[from] SiteError),
}

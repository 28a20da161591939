//! Site lifecycle orchestration.
//!
//! A run walks `Start → Probed → {Creating → Created | AlreadyExists} →
//! {BackingUp | Restoring → [RegisteringWebAdaptor]} → Done`, dropping to
//! `Failed` on the first fatal error. Nothing is rolled back.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use gisadmin_config::{Config, SiteEndpoint};
use serde_json::Value;
use strum::Display;

use super::call::{ApplicationFailure, FailureKind, OperationRequest, OperationResult, execute};
use super::error::{Phase, RequiredParameter, SiteError};
use super::restore::report_from_import;
use super::session::{Credentials, acquire_token, with_fresh_session};
use super::transport::Transport;
use crate::notify::{RunEvent, RunNotifier};
use crate::output::OperatorOutput;
use crate::report::RestoreReport;

const CREATE_SITE: &str = "createNewSite";
const EXPORT_SITE: &str = "exportSite";
const IMPORT_SITE: &str = "importSite";
const REGISTER_WEB_ADAPTOR: &str = "system/webadaptors/register";

/// States visited by a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum SiteState {
    /// Nothing has been attempted.
    Start,
    /// The existence probe answered.
    Probed,
    /// `createNewSite` is in flight.
    Creating,
    /// The site was created by this run.
    Created,
    /// The site was already running.
    AlreadyExists,
    /// `exportSite` is in flight.
    BackingUp,
    /// `importSite` is in flight.
    Restoring,
    /// Web adaptor registration is in flight.
    RegisteringWebAdaptor,
    /// The run succeeded.
    Done,
    /// The run stopped on a fatal error.
    Failed,
}

/// Options for a restore run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreOptions {
    /// Site backup file as seen by the server.
    pub file: String,
    /// Register a web adaptor once the import succeeds.
    pub register_web_adaptor: bool,
    /// Web adaptor URL; derived from the site URL when absent.
    pub web_adaptor_url: Option<String>,
    /// Where to save the restore report.
    pub report: Option<Utf8PathBuf>,
}

/// What the run should do once the site is known to exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteMode {
    /// Export the site to `folder` on the server.
    Backup {
        /// Destination folder as seen by the server.
        folder: String,
    },
    /// Import the site from a backup file.
    Restore(RestoreOptions),
}

/// Everything the operator supplied for one run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    /// Site URL as typed by the operator.
    pub site: String,
    /// Primary site administrator account.
    pub credentials: Credentials,
    /// Requested operation.
    pub mode: SiteMode,
}

/// Outcome of a successful run.
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Backup location reported by the server, verbatim.
    pub backup_location: Option<String>,
    /// Report produced by a restore.
    pub restore_report: Option<RestoreReport>,
    /// Non-fatal failure to save the restore report.
    pub report_warning: Option<SiteError>,
}

/// Drives one administration run against a single site.
pub struct SiteController<'a, T: ?Sized, N: ?Sized> {
    transport: &'a T,
    notifier: &'a N,
    config: &'a Config,
    trail: Vec<SiteState>,
}

impl<'a, T, N> SiteController<'a, T, N>
where
    T: Transport + ?Sized,
    N: RunNotifier + ?Sized,
{
    /// Builds a controller in the [`SiteState::Start`] state.
    #[must_use]
    pub fn new(transport: &'a T, notifier: &'a N, config: &'a Config) -> Self {
        Self {
            transport,
            notifier,
            config,
            trail: vec![SiteState::Start],
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SiteState {
        self.trail.last().copied().unwrap_or(SiteState::Start)
    }

    /// Every state visited so far, in order.
    #[must_use]
    pub fn trail(&self) -> &[SiteState] {
        &self.trail
    }

    /// Executes `request`, reporting progress on `output`.
    ///
    /// The notifier records the run boundaries and any fatal error; the
    /// failure alert is raised only when `send_alerts` is configured.
    ///
    /// # Errors
    ///
    /// Returns the first fatal [`SiteError`]. A report that cannot be saved is
    /// not fatal and is returned in [`RunSummary::report_warning`] instead.
    pub fn run<W: Write, E: Write>(
        &mut self,
        request: &RunRequest,
        output: &mut OperatorOutput<W, E>,
    ) -> Result<RunSummary, SiteError> {
        self.notifier.log_event(RunEvent::Start, "");
        let outcome = self.drive(request, output);
        match &outcome {
            Ok(_) => {
                self.enter(SiteState::Done);
                self.notifier.log_event(RunEvent::End, "");
            }
            Err(error) => {
                self.enter(SiteState::Failed);
                let message = error.to_string();
                self.notifier.log_event(RunEvent::Error, &message);
                if self.config.send_alerts() {
                    self.notifier.notify_on_failure(&message);
                }
            }
        }
        outcome
    }

    fn drive<W: Write, E: Write>(
        &mut self,
        request: &RunRequest,
        output: &mut OperatorOutput<W, E>,
    ) -> Result<RunSummary, SiteError> {
        let endpoint: SiteEndpoint = request.site.parse()?;
        validate(&request.mode)?;
        tracing::info!(
            target: "gisadmin::controller",
            event = "run_planned",
            site = %endpoint,
            "site endpoint resolved"
        );

        self.ensure_site(&endpoint, &request.credentials, output)?;

        let mut summary = RunSummary::default();
        match &request.mode {
            SiteMode::Backup { folder } => {
                let location = self.backup(&endpoint, &request.credentials, folder, output)?;
                summary.backup_location = Some(location);
            }
            SiteMode::Restore(options) => {
                let report = self.restore(&endpoint, &request.credentials, &options.file, output)?;
                if let Some(path) = &options.report {
                    summary.report_warning = self.save_report(&report, path, output);
                }
                summary.restore_report = Some(report);
                if options.register_web_adaptor {
                    let url = options
                        .web_adaptor_url
                        .clone()
                        .unwrap_or_else(|| default_web_adaptor_url(&endpoint));
                    self.register_web_adaptor(&endpoint, &request.credentials, &url, output)?;
                }
            }
        }
        Ok(summary)
    }

    /// Probes for a site and creates one when the probe is refused.
    ///
    /// The probe is a token request: an answer that is not a token is taken
    /// to mean no site exists yet. A server with a running site that rejects
    /// the credentials answers the same way, so wrong credentials lead to a
    /// `createNewSite` attempt, which then fails with the server's message.
    fn ensure_site<W: Write, E: Write>(
        &mut self,
        endpoint: &SiteEndpoint,
        credentials: &Credentials,
        output: &mut OperatorOutput<W, E>,
    ) -> Result<(), SiteError> {
        match acquire_token(self.transport, endpoint, credentials) {
            OperationResult::Success(_) => {
                self.enter(SiteState::Probed);
                self.enter(SiteState::AlreadyExists);
                output.progress(format_args!("Site already created..."));
                Ok(())
            }
            OperationResult::ApplicationError(failure) => {
                self.enter(SiteState::Probed);
                tracing::info!(
                    target: "gisadmin::controller",
                    event = "probe_refused",
                    messages = ?failure.messages,
                    "no token issued; treating the site as absent"
                );
                self.enter(SiteState::Creating);
                output.progress(format_args!("Creating site..."));
                self.create_site(endpoint, credentials)?;
                self.enter(SiteState::Created);
                output.progress(format_args!("Site created successfully..."));
                Ok(())
            }
            OperationResult::TransportError(source) => Err(SiteError::Transport {
                phase: Phase::IssueToken,
                host: endpoint.host().to_owned(),
                source,
            }),
        }
    }

    fn create_site(
        &self,
        endpoint: &SiteEndpoint,
        credentials: &Credentials,
    ) -> Result<(), SiteError> {
        let request = OperationRequest::admin(endpoint, CREATE_SITE)
            .param("username", credentials.username())
            .param("password", credentials.password())
            .param("configStoreConnection", "")
            .param("directories", "")
            .param("runAsync", "false");
        execute(self.transport, &request).into_payload(Phase::CreateSite, endpoint)?;
        Ok(())
    }

    fn backup<W: Write, E: Write>(
        &mut self,
        endpoint: &SiteEndpoint,
        credentials: &Credentials,
        folder: &str,
        output: &mut OperatorOutput<W, E>,
    ) -> Result<String, SiteError> {
        self.enter(SiteState::BackingUp);
        output.progress(format_args!(
            "Backing up the site running at {}...",
            endpoint.host()
        ));

        let transport = self.transport;
        let payload = with_fresh_session(transport, endpoint, credentials, |session| {
            let request = OperationRequest::admin(endpoint, EXPORT_SITE)
                .authorised(session)
                .param("location", folder);
            execute(transport, &request).into_payload(Phase::Backup, endpoint)
        })?;

        let location = payload
            .get("location")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| malformed(Phase::Backup, endpoint, &payload))?;
        output.progress(format_args!(
            "Site has been successfully backed up and is available at this location: {location}..."
        ));
        Ok(location)
    }

    fn restore<W: Write, E: Write>(
        &mut self,
        endpoint: &SiteEndpoint,
        credentials: &Credentials,
        file: &str,
        output: &mut OperatorOutput<W, E>,
    ) -> Result<RestoreReport, SiteError> {
        self.enter(SiteState::Restoring);
        output.progress(format_args!(
            "Beginning to restore the site running on {} using the site backup available at: {file}...",
            endpoint.host()
        ));
        output.progress(format_args!(
            "This operation can take some time. You will not receive any status messages \
             and will not be able to access the site until the operation is complete..."
        ));

        let transport = self.transport;
        let payload = with_fresh_session(transport, endpoint, credentials, |session| {
            let request = OperationRequest::admin(endpoint, IMPORT_SITE)
                .authorised(session)
                .param("location", file);
            execute(transport, &request).into_payload(Phase::Restore, endpoint)
        })?;

        let report =
            report_from_import(&payload).map_err(|_| malformed(Phase::Restore, endpoint, &payload))?;
        output.progress(format_args!("{}", report.summary_line()));
        for (index, message) in report.diagnostics().iter().enumerate() {
            output.progress(format_args!("{}.{message}", index + 1));
        }
        Ok(report)
    }

    fn save_report<W: Write, E: Write>(
        &self,
        report: &RestoreReport,
        path: &Utf8Path,
        output: &mut OperatorOutput<W, E>,
    ) -> Option<SiteError> {
        match report.write_to(path) {
            Ok(()) => {
                output.progress(format_args!(
                    "A file with the report from the restore utility has been saved at: {path}"
                ));
                None
            }
            Err(source) => {
                let warning = SiteError::ReportWrite {
                    path: path.to_path_buf(),
                    source,
                };
                let message = warning.to_string();
                output.warning(format_args!("{message}"));
                self.notifier.log_event(RunEvent::Warning, &message);
                Some(warning)
            }
        }
    }

    fn register_web_adaptor<W: Write, E: Write>(
        &mut self,
        endpoint: &SiteEndpoint,
        credentials: &Credentials,
        url: &str,
        output: &mut OperatorOutput<W, E>,
    ) -> Result<(), SiteError> {
        self.enter(SiteState::RegisteringWebAdaptor);
        output.progress(format_args!("Registering the web adaptor..."));

        let transport = self.transport;
        with_fresh_session(transport, endpoint, credentials, |session| {
            let request = OperationRequest::admin(endpoint, REGISTER_WEB_ADAPTOR)
                .authorised(session)
                .param("webAdaptorURL", url)
                .param("machineName", endpoint.host())
                .param("isAdminEnabled", "false");
            execute(transport, &request).into_payload(Phase::RegisterWebAdaptor, endpoint)
        })?;

        output.progress(format_args!("Web adaptor registered successfully..."));
        Ok(())
    }

    fn enter(&mut self, next: SiteState) {
        let previous = self.state();
        self.trail.push(next);
        tracing::info!(
            target: "gisadmin::controller",
            event = "state_transition",
            from = %previous,
            to = %next,
            "site state changed"
        );
    }
}

fn validate(mode: &SiteMode) -> Result<(), SiteError> {
    match mode {
        SiteMode::Backup { folder } if folder.trim().is_empty() => Err(
            SiteError::MissingParameter(RequiredParameter::BackupFolder),
        ),
        SiteMode::Restore(options) if options.file.trim().is_empty() => {
            Err(SiteError::MissingParameter(RequiredParameter::BackupFile))
        }
        SiteMode::Backup { .. } | SiteMode::Restore(_) => Ok(()),
    }
}

fn default_web_adaptor_url(endpoint: &SiteEndpoint) -> String {
    format!(
        "http://{}{}",
        endpoint.host(),
        endpoint.site_root().trim_end_matches('/')
    )
}

fn malformed(phase: Phase, endpoint: &SiteEndpoint, payload: &Value) -> SiteError {
    SiteError::from_failure(
        phase,
        endpoint,
        ApplicationFailure::new(FailureKind::MalformedBody, vec![payload.to_string()]),
    )
}

//! Test support for controller and CLI coverage.
//!
//! Supplies a scripted in-memory transport, a fake HTTP site server, a mock
//! notifier, and the world type shared by the behavioural steps.

mod fake_server;
mod scripted;

use std::cell::RefCell;
use std::ffi::OsString;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, ensure};
use camino::Utf8PathBuf;
use gisadmin_config::Config;
use mockall::mock;
use rstest::fixture;
use tempfile::TempDir;

use crate::notify::{RunEvent, RunNotifier};
use crate::{AppError, ConfigLoader, run_with_loader};

pub(crate) use fake_server::{CannedResponse, FakeSiteServer, ReceivedRequest};
pub(crate) use scripted::{RecordedCall, ScriptedTransport};

mock! {
    pub Notifier {}
    impl RunNotifier for Notifier {
        fn log_event(&self, event: RunEvent, message: &str);
        fn notify_on_failure(&self, message: &str);
    }
}

/// Token response accepted by the session manager.
pub(crate) const TOKEN_BODY: &str = r#"{"token":"tok-1","expires":1700000000000}"#;

/// Token response from a server that has no site yet.
pub(crate) const NO_SITE_BODY: &str =
    r#"{"error":{"code":498,"message":"Invalid token.","details":[]}}"#;

/// Configuration loader returning a fixed configuration.
pub(crate) struct StaticConfigLoader {
    config: Config,
}

impl StaticConfigLoader {
    pub(crate) fn new(config: Config) -> Self {
        Self { config }
    }
}

impl ConfigLoader for StaticConfigLoader {
    fn load(&self, _args: &[OsString]) -> Result<Config, AppError> {
        Ok(self.config.clone())
    }
}

/// State shared by the CLI behaviour steps.
pub(crate) struct TestWorld {
    workspace: TempDir,
    responses: Vec<CannedResponse>,
    server: Option<FakeSiteServer>,
    requests: Vec<ReceivedRequest>,
    arguments: Vec<String>,
    config: Config,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_code: Option<ExitCode>,
}

impl TestWorld {
    fn new() -> Result<Self> {
        Ok(Self {
            workspace: TempDir::new().context("create workspace")?,
            responses: Vec::new(),
            server: None,
            requests: Vec::new(),
            arguments: Vec::new(),
            config: Config::default(),
            stdout: Vec::new(),
            stderr: Vec::new(),
            exit_code: None,
        })
    }

    pub(crate) fn enqueue(&mut self, response: CannedResponse) {
        self.responses.push(response);
    }

    pub(crate) fn start_server(&mut self) -> Result<()> {
        let responses = std::mem::take(&mut self.responses);
        self.server = Some(FakeSiteServer::spawn(responses)?);
        Ok(())
    }

    pub(crate) fn site_url(&self, context: &str) -> Result<String> {
        self.server
            .as_ref()
            .map(|server| server.site_url(context))
            .ok_or_else(|| anyhow!("fake site server not started"))
    }

    pub(crate) fn workspace_path(&self, name: &str) -> Result<Utf8PathBuf> {
        Utf8PathBuf::from_path_buf(self.workspace.path().join(name))
            .map_err(|path| anyhow!("workspace path is not UTF-8: {}", path.display()))
    }

    pub(crate) fn set_arguments(&mut self, arguments: Vec<String>) {
        self.arguments = arguments;
    }

    pub(crate) fn run(&mut self) -> Result<()> {
        let loader = StaticConfigLoader::new(self.config.clone());
        let args = std::iter::once(OsString::from("gisadmin"))
            .chain(self.arguments.iter().map(OsString::from));
        let exit_code = run_with_loader(args, &mut self.stdout, &mut self.stderr, &loader);
        self.exit_code = Some(exit_code);
        if let Some(server) = self.server.as_mut() {
            self.requests = server.take_requests()?;
        }
        Ok(())
    }

    pub(crate) fn assert_exit_code(&self, expected: ExitCode) -> Result<()> {
        let actual = self.exit_code.context("command has not run")?;
        ensure!(
            actual == expected,
            "expected exit {expected:?}, got {actual:?}; stderr: {}",
            self.stderr_text()
        );
        Ok(())
    }

    pub(crate) fn stdout_text(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub(crate) fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub(crate) fn requests(&self) -> &[ReceivedRequest] {
        &self.requests
    }

    pub(crate) fn request_targets(&self) -> Vec<String> {
        self.requests
            .iter()
            .map(|request| request.target.clone())
            .collect()
    }
}

#[fixture]
pub(crate) fn world() -> RefCell<TestWorld> {
    RefCell::new(TestWorld::new().expect("create test world"))
}

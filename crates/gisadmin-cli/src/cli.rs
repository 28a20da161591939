//! CLI argument definitions for `gisadmin`.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

use crate::site::{Credentials, RestoreOptions, RunRequest, SiteMode};

/// Backs up or restores a geospatial server site.
#[derive(Parser, Debug)]
#[command(name = "gisadmin", disable_help_subcommand = true)]
pub(crate) struct Cli {
    /// Operation to perform.
    #[command(subcommand)]
    pub(crate) command: CliCommand,
}

/// Supported operations.
#[derive(Subcommand, Debug, Clone)]
pub(crate) enum CliCommand {
    /// Exports the site to a folder on the server.
    Backup(BackupArgs),
    /// Imports the site from a backup file on the server.
    Restore(RestoreArgs),
}

/// Site location and administrator account.
#[derive(Args, Debug, Clone)]
pub(crate) struct SiteArgs {
    /// Site URL, for example `https://gis.example.org:6443/arcgis`.
    #[arg(long, value_name = "URL")]
    pub(crate) site: String,
    /// Primary site administrator name.
    #[arg(long)]
    pub(crate) username: String,
    /// Primary site administrator password.
    #[arg(long, env = "GISADMIN_PASSWORD", hide_env_values = true)]
    pub(crate) password: String,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct BackupArgs {
    #[command(flatten)]
    pub(crate) site: SiteArgs,
    /// Folder on the server that receives the backup.
    #[arg(long, value_name = "DIR")]
    pub(crate) folder: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct RestoreArgs {
    #[command(flatten)]
    pub(crate) site: SiteArgs,
    /// Site backup file on the server.
    #[arg(long, value_name = "FILE")]
    pub(crate) file: Option<String>,
    /// Registers a web adaptor after the restore.
    #[arg(long)]
    pub(crate) register_web_adaptor: bool,
    /// Web adaptor URL; defaults to `http://<host>/<context>`.
    #[arg(long, value_name = "URL", requires = "register_web_adaptor")]
    pub(crate) web_adaptor_url: Option<String>,
    /// Where to save the restore report.
    #[arg(long, value_name = "PATH")]
    pub(crate) report: Option<Utf8PathBuf>,
}

impl From<CliCommand> for RunRequest {
    fn from(command: CliCommand) -> Self {
        match command {
            CliCommand::Backup(args) => Self {
                site: args.site.site,
                credentials: Credentials::new(args.site.username, args.site.password),
                mode: SiteMode::Backup {
                    folder: args.folder.unwrap_or_default(),
                },
            },
            CliCommand::Restore(args) => Self {
                site: args.site.site,
                credentials: Credentials::new(args.site.username, args.site.password),
                mode: SiteMode::Restore(RestoreOptions {
                    file: args.file.unwrap_or_default(),
                    register_web_adaptor: args.register_web_adaptor,
                    web_adaptor_url: args.web_adaptor_url,
                    report: args.report,
                }),
            },
        }
    }
}

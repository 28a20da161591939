//! Configuration loading helpers for the `gisadmin` CLI.
//!
//! Arguments destined for `ortho_config` are split off the front of the
//! command line so the loader only receives configuration flags while clap
//! parses the remaining command tokens.

use std::ffi::{OsStr, OsString};

use gisadmin_config::Config;
use ortho_config::OrthoConfig;

use crate::AppError;

pub(crate) trait ConfigLoader {
    /// Loads configuration for the CLI.
    ///
    /// # Flag Ordering
    ///
    /// Configuration flags (listed in `CONFIG_CLI_FLAGS` and
    /// `CONFIG_CLI_SWITCHES`) must appear before the subcommand. Flags after
    /// it are parsed as command arguments.
    fn load(&self, args: &[OsString]) -> Result<Config, AppError>;
}

pub(crate) struct OrthoConfigLoader;

#[derive(Debug, Clone, Copy)]
enum FlagAction {
    Include { needs_value: bool },
    Skip,
}

impl ConfigLoader for OrthoConfigLoader {
    fn load(&self, args: &[OsString]) -> Result<Config, AppError> {
        Config::load_from_iter(args.iter().cloned()).map_err(AppError::LoadConfiguration)
    }
}

impl OrthoConfigLoader {
    fn process_config_flag(argument: &OsStr) -> FlagAction {
        let argument_text = argument.to_string_lossy();
        if !argument_text.starts_with("--") {
            return FlagAction::Skip;
        }

        let (flag, has_inline_value) = match argument_text.split_once('=') {
            Some((flag, _)) => (flag, true),
            None => (argument_text.as_ref(), false),
        };

        if super::CONFIG_CLI_SWITCHES.contains(&flag) {
            return FlagAction::Include { needs_value: false };
        }
        if super::CONFIG_CLI_FLAGS.contains(&flag) {
            return FlagAction::Include {
                needs_value: !has_inline_value,
            };
        }

        FlagAction::Skip
    }
}

pub(crate) struct ConfigArgumentSplit {
    pub(crate) config_arguments: Vec<OsString>,
    pub(crate) command_start: usize,
}

pub(crate) fn split_config_arguments(args: &[OsString]) -> ConfigArgumentSplit {
    let Some(program) = args.first() else {
        return ConfigArgumentSplit {
            config_arguments: Vec::new(),
            command_start: 0,
        };
    };

    let mut filtered: Vec<OsString> = vec![program.clone()];
    let mut command_start = 1usize;
    let mut pending_value = false;

    for argument in args.iter().skip(1) {
        if pending_value {
            filtered.push(argument.clone());
            pending_value = false;
            command_start += 1;
            continue;
        }

        match OrthoConfigLoader::process_config_flag(argument.as_os_str()) {
            FlagAction::Include { needs_value } => {
                filtered.push(argument.clone());
                command_start += 1;
                pending_value = needs_value;
            }
            FlagAction::Skip => break,
        }
    }

    ConfigArgumentSplit {
        config_arguments: filtered,
        command_start,
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn os_args(args: &[&str]) -> Vec<OsString> {
        args.iter().map(OsString::from).collect()
    }

    #[rstest]
    #[case::inline("--log-filter=debug", false)]
    #[case::separate("--log-filter", true)]
    #[case::alert_sender("--alert-sender", true)]
    #[case::switch("--send-alerts", false)]
    #[case::switch_with_value("--insecure-tls=true", false)]
    fn known_flags_are_included(#[case] flag: &str, #[case] expected: bool) {
        match OrthoConfigLoader::process_config_flag(OsStr::new(flag)) {
            FlagAction::Include { needs_value } => assert_eq!(needs_value, expected),
            FlagAction::Skip => panic!("expected include for {flag}"),
        }
    }

    #[rstest]
    #[case::subcommand("backup")]
    #[case::command_flag("--site")]
    #[case::unknown("--unknown")]
    fn other_arguments_stop_the_scan(#[case] argument: &str) {
        assert!(matches!(
            OrthoConfigLoader::process_config_flag(OsStr::new(argument)),
            FlagAction::Skip
        ));
    }

    #[test]
    fn split_separates_configuration_from_command() {
        let args = os_args(&[
            "gisadmin",
            "--send-alerts",
            "--audit-log",
            "/var/log/gisadmin.log",
            "backup",
            "--site",
            "geo",
        ]);
        let split = split_config_arguments(&args);
        assert_eq!(
            split.config_arguments,
            os_args(&["gisadmin", "--send-alerts", "--audit-log", "/var/log/gisadmin.log"])
        );
        assert_eq!(split.command_start, 4);
    }

    #[test]
    fn empty_arguments_split_to_nothing() {
        let split = split_config_arguments(&[]);
        assert!(split.config_arguments.is_empty());
        assert_eq!(split.command_start, 0);
    }
}

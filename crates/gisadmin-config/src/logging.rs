use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// How telemetry lines are rendered on stderr.
///
/// Stdout carries the run's progress and output value, so both formats write
/// to stderr only.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum LogFormat {
    /// One line per event, coloured when stderr is a terminal.
    #[default]
    Compact,
    /// One JSON object per event with fields flattened, for cron and
    /// scheduler logs.
    Json,
}

impl LogFormat {
    /// Whether ANSI colour may be used when the sink is a terminal.
    #[must_use]
    pub const fn allows_colour(self) -> bool {
        matches!(self, Self::Compact)
    }
}

/// Errors encountered while parsing a [`LogFormat`] from text.
pub type LogFormatParseError = strum::ParseError;

//! Restore report rendering.
//!
//! The report is a plain UTF-8 text file: a headline, a blank line and, when
//! the import produced diagnostics, a banner, a dashed rule and a numbered
//! list. [`RestoreReport::parse`] reads the same layout back.

use std::fs;
use std::io;

use camino::Utf8Path;
use thiserror::Error;

/// Prefix of the headline written after a successful import.
pub const HEADLINE_PREFIX: &str = "Site has been successfully restored. ";

/// Line introducing the diagnostic list.
pub const REPORT_BANNER: &str = "Below are the messages returned from the restore operation. \
You should review these messages and update your site configuration as needed:";

const RULE_WIDTH: usize = 133;

/// Summary of an import operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreReport {
    summary_line: String,
    diagnostics: Vec<String>,
}

/// Errors raised while writing or reading a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Filesystem failure.
    #[error("{0}")]
    Io(#[from] io::Error),
    /// The text does not follow the report layout.
    #[error("report is malformed: {0}")]
    Malformed(&'static str),
}

impl RestoreReport {
    /// Builds a report from its headline and diagnostics.
    #[must_use]
    pub fn new(summary_line: impl Into<String>, diagnostics: Vec<String>) -> Self {
        Self {
            summary_line: summary_line.into(),
            diagnostics,
        }
    }

    /// Builds the report for an import that completed after `operation_time`.
    #[must_use]
    pub fn restored(operation_time: &str, diagnostics: Vec<String>) -> Self {
        Self::new(format!("{HEADLINE_PREFIX}{operation_time}"), diagnostics)
    }

    /// Headline line.
    #[must_use]
    pub fn summary_line(&self) -> &str {
        &self.summary_line
    }

    /// Messages the operator should review, in server order.
    #[must_use]
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Renders the report text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut text = String::new();
        text.push_str(&self.summary_line);
        text.push_str("\n\n");
        if self.diagnostics.is_empty() {
            return text;
        }

        text.push_str(REPORT_BANNER);
        text.push('\n');
        text.push_str(&rule());
        text.push('\n');
        for (index, message) in self.diagnostics.iter().enumerate() {
            text.push_str(&format!("{}.{message}\n\n", index + 1));
        }
        text
    }

    /// Writes the report to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] when the file cannot be written.
    pub fn write_to(&self, path: &Utf8Path) -> Result<(), ReportError> {
        fs::write(path, self.render())?;
        Ok(())
    }

    /// Parses report text produced by [`RestoreReport::render`].
    ///
    /// Entries are separated by a blank line followed by the next number, so
    /// a diagnostic whose text itself contains `"\n\n{n+1}."` renders the same
    /// as two entries and reads back as two. Every other diagnostic,
    /// including multi-line ones, reads back unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Malformed`] when the layout is not recognised.
    pub fn parse(text: &str) -> Result<Self, ReportError> {
        let (summary_line, rest) = text
            .split_once("\n\n")
            .ok_or(ReportError::Malformed("missing blank line after the headline"))?;
        if rest.is_empty() {
            return Ok(Self::new(summary_line, Vec::new()));
        }

        let rest = rest
            .strip_prefix(REPORT_BANNER)
            .and_then(|rest| rest.strip_prefix('\n'))
            .ok_or(ReportError::Malformed("missing diagnostics banner"))?;
        let rule = rule();
        let mut body = rest
            .strip_prefix(rule.as_str())
            .and_then(|rest| rest.strip_prefix('\n'))
            .ok_or(ReportError::Malformed("missing dashed rule"))?;

        let mut diagnostics = Vec::new();
        while !body.is_empty() {
            let number = diagnostics.len() + 1;
            let entry = body
                .strip_prefix(&format!("{number}."))
                .ok_or(ReportError::Malformed("diagnostics are not numbered in order"))?;
            let next_marker = format!("\n\n{}.", number + 1);
            match entry.find(&next_marker) {
                Some(end) => {
                    let (message, remainder) = entry.split_at(end);
                    diagnostics.push(message.to_owned());
                    body = remainder.strip_prefix("\n\n").unwrap_or(remainder);
                }
                None => {
                    let message = entry
                        .strip_suffix("\n\n")
                        .ok_or(ReportError::Malformed("last diagnostic is not terminated"))?;
                    diagnostics.push(message.to_owned());
                    body = "";
                }
            }
        }

        Ok(Self::new(summary_line, diagnostics))
    }

    /// Reads and parses the report stored at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError::Io`] or [`ReportError::Malformed`].
    pub fn read_from(path: &Utf8Path) -> Result<Self, ReportError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }
}

fn rule() -> String {
    "-".repeat(RULE_WIDTH)
}

#[cfg(test)]
mod tests {
    use camino::Utf8PathBuf;
    use tempfile::TempDir;

    use super::*;

    fn sample() -> RestoreReport {
        RestoreReport::restored(
            "Import operation completed in 5 seconds",
            vec![
                String::from("Review directory X"),
                String::from("Web adaptor at https://proxy.example.org must be re-registered."),
            ],
        )
    }

    #[test]
    fn render_matches_the_report_layout() {
        let text = sample().render();
        let expected = format!(
            "Site has been successfully restored. Import operation completed in 5 seconds\n\n\
             {REPORT_BANNER}\n{}\n1.Review directory X\n\n\
             2.Web adaptor at https://proxy.example.org must be re-registered.\n\n",
            "-".repeat(133)
        );
        assert_eq!(text, expected);
    }

    #[test]
    fn headline_only_report_omits_the_banner() {
        let report = RestoreReport::restored("Import operation completed in 2 seconds", Vec::new());
        assert_eq!(
            report.render(),
            "Site has been successfully restored. Import operation completed in 2 seconds\n\n"
        );
    }

    #[test]
    fn written_report_reads_back() {
        let dir = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("restore.txt")).expect("utf8 path");
        let report = sample();
        report.write_to(&path).expect("write report");

        let parsed = RestoreReport::read_from(&path).expect("read report");
        assert_eq!(parsed.summary_line(), report.summary_line());
        assert_eq!(parsed.diagnostics().len(), report.diagnostics().len());
        assert_eq!(parsed, report);
    }

    #[test]
    fn multi_line_diagnostics_survive_parsing() {
        let report = RestoreReport::restored(
            "Import operation completed in 9 seconds",
            vec![String::from("line one\nline two"), String::from("second")],
        );
        assert_eq!(RestoreReport::parse(&report.render()).expect("parse"), report);
    }

    #[test]
    fn embedded_entry_marker_reads_back_as_a_new_entry() {
        let report = RestoreReport::restored(
            "Import operation completed in 3 seconds",
            vec![String::from("see below\n\n2.stale cache")],
        );
        let parsed = RestoreReport::parse(&report.render()).expect("parse");
        assert_eq!(parsed.diagnostics(), ["see below", "stale cache"]);
    }

    #[test]
    fn truncated_reports_are_rejected() {
        let text = format!("headline\n\n{REPORT_BANNER}\n");
        assert!(matches!(
            RestoreReport::parse(&text),
            Err(ReportError::Malformed(_))
        ));
    }

    #[test]
    fn unwritable_location_is_an_io_error() {
        let dir = TempDir::new().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("missing").join("report.txt"))
            .expect("utf8 path");
        assert!(matches!(sample().write_to(&path), Err(ReportError::Io(_))));
    }
}

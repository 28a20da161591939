//! Interpretation of the `importSite` result payload.

use serde::Deserialize;
use serde_json::Value;

use crate::report::RestoreReport;

/// Text marking the message that reports how long the import took.
pub const COMPLETION_MARKER: &str = "Import operation completed in ";

const COMPLETION_SOURCE: &str = "SITE";
const COMPLETION_LEVEL: &str = "INFO";

#[derive(Debug, Default, Deserialize)]
struct ImportPayload {
    #[serde(default)]
    result: Vec<ImportSource>,
}

#[derive(Debug, Default, Deserialize)]
struct ImportSource {
    #[serde(default)]
    source: String,
    #[serde(default)]
    messages: Vec<ImportMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct ImportMessage {
    #[serde(default)]
    level: String,
    #[serde(default)]
    message: String,
}

impl ImportMessage {
    fn reports_completion(&self, source: &str) -> bool {
        source == COMPLETION_SOURCE
            && self.level == COMPLETION_LEVEL
            && self.message.contains(COMPLETION_MARKER)
    }
}

/// Splits the import result into the headline and the diagnostics.
///
/// The `SITE`/`INFO` completion message becomes the headline (the last one
/// wins if the server sends several); every other message is a diagnostic,
/// kept in server order.
///
/// # Errors
///
/// Returns the deserialisation error when `result` is not a list of
/// `{source, messages}` objects.
pub fn report_from_import(payload: &Value) -> Result<RestoreReport, serde_json::Error> {
    let payload = ImportPayload::deserialize(payload)?;
    let mut operation_time = String::new();
    let mut diagnostics = Vec::new();

    for source in payload.result {
        for message in source.messages {
            if message.reports_completion(&source.source) {
                operation_time = message.message;
            } else {
                diagnostics.push(message.message);
            }
        }
    }

    Ok(RestoreReport::restored(&operation_time, diagnostics))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn completion_message_becomes_the_headline() {
        let payload = json!({
            "status": "success",
            "result": [
                {
                    "source": "SITE",
                    "messages": [
                        {"level": "INFO", "message": "Import operation completed in 5 seconds"},
                        {"level": "WARNING", "message": "Review directory X"}
                    ]
                }
            ]
        });

        let report = report_from_import(&payload).expect("report");
        assert!(report.summary_line().contains("5 seconds"));
        assert_eq!(report.diagnostics(), ["Review directory X"]);
        assert!(report.render().contains("1.Review directory X\n\n"));
    }

    #[test]
    fn completion_text_from_other_sources_is_a_diagnostic() {
        let payload = json!({
            "result": [
                {
                    "source": "MACHINES",
                    "messages": [
                        {"level": "INFO", "message": "Import operation completed in 1 seconds"}
                    ]
                },
                {
                    "source": "SITE",
                    "messages": [
                        {"level": "SEVERE", "message": "Import operation completed in 2 seconds"}
                    ]
                }
            ]
        });

        let report = report_from_import(&payload).expect("report");
        assert_eq!(report.summary_line(), "Site has been successfully restored. ");
        assert_eq!(report.diagnostics().len(), 2);
    }

    #[test]
    fn missing_result_yields_an_empty_report() {
        let report = report_from_import(&json!({"status": "success"})).expect("report");
        assert!(report.diagnostics().is_empty());
    }

    #[test]
    fn ill_shaped_result_is_rejected() {
        assert!(report_from_import(&json!({"result": "done"})).is_err());
    }
}

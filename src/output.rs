//! Output formatting and control utilities.
//!
//! CHANGELOG:
//! - 10/19/2026 - Run summary rendering; dropped text truncation presets
//! - 01/10/2026 - Initial implementation

use serde::Serialize;
use serde_json::{json, Value};

use crate::dispatch::RunSummary;

/// Output control settings from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct OutputControls {
    pub json: bool,
    pub compact: bool,
    pub fields: Option<String>,
}

impl OutputControls {
    /// Emit data according to output controls.
    pub fn emit<T: Serialize>(&self, data: &T) -> String {
        let value = serde_json::to_value(data).unwrap_or(json!(null));

        // Apply field filtering if specified
        let filtered = if let Some(ref fields) = self.fields {
            filter_fields(&value, fields)
        } else {
            value
        };

        if self.compact {
            serde_json::to_string(&filtered).unwrap_or_else(|_| "{}".to_string())
        } else {
            serde_json::to_string_pretty(&filtered).unwrap_or_else(|_| "{}".to_string())
        }
    }

    /// Print data to stdout according to output controls.
    pub fn print<T: Serialize>(&self, data: &T) {
        println!("{}", self.emit(data));
    }

    /// Print the end-of-run summary, JSON or human readable.
    pub fn print_summary(&self, summary: &RunSummary) {
        if self.json {
            self.print(summary);
        } else {
            println!("{}", human_summary(summary));
        }
    }
}

/// Two-line plain-text summary of a run.
pub fn human_summary(s: &RunSummary) -> String {
    format!(
        "Done. Processed: {}/{}. iMessage sent: {}, unreachable: {}, undelivered: {}, failed: {}, \
         SMS sent: {}, SMS failed: {}, skipped: {}, dry-run: {}\nLog at: {} (run {})",
        s.processed,
        s.total,
        s.imessage_sent,
        s.imessage_unreachable,
        s.imessage_undelivered,
        s.imessage_failed,
        s.sms_sent,
        s.sms_failed,
        s.skipped,
        s.dry_run,
        s.log_file,
        s.run_id
    )
}

/// Filter JSON value to only include specified fields.
fn filter_fields(value: &Value, fields: &str) -> Value {
    let field_list: Vec<&str> = fields.split(',').map(|s| s.trim()).collect();

    match value {
        Value::Array(arr) => {
            Value::Array(arr.iter().map(|v| filter_fields(v, fields)).collect())
        }
        Value::Object(map) => {
            let mut filtered = serde_json::Map::new();
            for field in &field_list {
                if let Some(v) = map.get(*field) {
                    filtered.insert(field.to_string(), v.clone());
                }
            }
            Value::Object(filtered)
        }
        _ => value.clone(),
    }
}

/// Format error as JSON.
pub fn format_error(error: &str) -> String {
    serde_json::to_string(&json!({
        "error": error,
        "success": false
    })).unwrap_or_else(|_| format!(r#"{{"error":"{}"}}"#, error))
}

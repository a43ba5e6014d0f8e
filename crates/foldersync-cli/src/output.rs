//! Operator-facing output for startup problems and the final run summary
//!
//! Per-action notices are written by the `ConsoleSink`; this module only
//! covers what the binary itself has to say.

use foldersync_sync::RunSummary;

/// Trait for formatting CLI output
pub trait OutputFormatter {
    fn success(&self, message: &str);
    fn error(&self, message: &str);
    fn summary(&self, summary: &RunSummary);
}

/// Human-readable output formatter with checkmarks
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn success(&self, message: &str) {
        println!("\u{2713} {}", message);
    }
    fn error(&self, message: &str) {
        eprintln!("\u{2717} Error: {}", message);
    }
    fn summary(&self, summary: &RunSummary) {
        self.success(&format!(
            "Stopped after {} pass(es): {} action(s), {} error(s)",
            summary.passes, summary.actions, summary.errors
        ));
    }
}

/// JSON output formatter, one object per line
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn success(&self, message: &str) {
        println!(
            "{}",
            serde_json::json!({"success": true, "message": message})
        );
    }
    fn error(&self, message: &str) {
        eprintln!(
            "{}",
            serde_json::json!({"success": false, "error": message})
        );
    }
    fn summary(&self, summary: &RunSummary) {
        println!("{}", summary_json(summary));
    }
}

fn summary_json(summary: &RunSummary) -> serde_json::Value {
    serde_json::json!({
        "success": true,
        "passes": summary.passes,
        "actions": summary.actions,
        "errors": summary.errors,
    })
}

pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonFormatter)
    } else {
        Box::new(HumanFormatter)
    }
}

//! Results reporting and formatting.

use crate::metrics::RunSummary;
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Table};
use std::str::FromStr;
use thiserror::Error;

const CSV_COLUMNS: [&str; 9] = [
    "timestamp", "name", "target", "vus", "duration", "requests", "passed", "failed", "aborted",
];

/// Failure to serialize a summary.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),
}

/// Output format for a run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Csv,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Invalid output format '{}'. Use table, json, or csv.", s)),
        }
    }
}

/// Formats run summaries for output.
pub struct ResultsReport;

impl ResultsReport {
    /// Render in the requested format.
    pub fn render(summary: &RunSummary, format: OutputFormat) -> Result<String, ReportError> {
        Ok(match format {
            OutputFormat::Table => Self::format_table(summary),
            OutputFormat::Json => Self::format_json(summary)?,
            OutputFormat::Csv => format!("{}\n{}", Self::csv_header(), Self::format_csv(summary)?),
        })
    }

    /// Format results as a console table.
    pub fn format_table(summary: &RunSummary) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .apply_modifier(UTF8_ROUND_CORNERS)
            .set_header(vec![format!("Load Test Results: {}", summary.name)]);

        table.add_row(vec!["Target:", summary.target_url.as_str()]);
        table.add_row(vec![
            "Virtual Users:",
            &format!("{}", summary.virtual_users),
        ]);
        table.add_row(vec!["Duration:", &format!("{:.1}s", summary.elapsed_secs)]);
        if summary.aborted {
            table.add_row(vec!["Status:", "aborted"]);
        }

        table.add_row(vec!["", ""]);
        table.add_row(vec!["Check:", summary.check_name.as_str()]);
        table.add_row(vec![
            "Total Requests:",
            &format!("{}", summary.total_requests),
        ]);
        table.add_row(vec!["Passed:", &format!("{}", summary.total_passed)]);
        table.add_row(vec!["Failed:", &format!("{}", summary.total_failed)]);
        table.add_row(vec![
            "Pass Rate:",
            &summary
                .pass_rate()
                .map(|rate| format!("{:.1}%", rate))
                .unwrap_or_else(|| "n/a".to_string()),
        ]);

        table.to_string()
    }

    /// Format results as JSON.
    pub fn format_json(summary: &RunSummary) -> serde_json::Result<String> {
        serde_json::to_string_pretty(summary)
    }

    /// Format results as CSV row. Fields containing commas or quotes are quoted.
    pub fn format_csv(summary: &RunSummary) -> Result<String, ReportError> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record([
            summary.started_at.to_rfc3339(),
            summary.name.clone(),
            summary.target_url.clone(),
            summary.virtual_users.to_string(),
            format!("{:.1}", summary.elapsed_secs),
            summary.total_requests.to_string(),
            summary.total_passed.to_string(),
            summary.total_failed.to_string(),
            summary.aborted.to_string(),
        ])?;
        let bytes = writer
            .into_inner()
            .map_err(|e| csv::Error::from(e.into_error()))?;
        Ok(String::from_utf8_lossy(&bytes).trim_end_matches('\n').to_string())
    }

    /// CSV header row.
    pub fn csv_header() -> String {
        CSV_COLUMNS.join(",")
    }
}

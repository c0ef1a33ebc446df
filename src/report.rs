//! Batch summary output: a table on stdout and an optional JSON report.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::encoding::EncodeSpec;
use crate::error::Result;
use crate::pipeline::{BatchOutcome, BatchSummary, PipelineResult, Status};

/// Serialized form of a finished batch
#[derive(Debug, Serialize)]
pub struct BatchReport<'a> {
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub elapsed_secs: f64,
    pub encode_spec: &'a EncodeSpec,
    pub summary: &'a BatchSummary,
    pub results: &'a [PipelineResult],
}

impl<'a> BatchReport<'a> {
    pub fn new(outcome: &'a BatchOutcome, encode_spec: &'a EncodeSpec) -> Self {
        let elapsed = outcome.finished_at - outcome.started_at;
        Self {
            started_at: outcome.started_at,
            finished_at: outcome.finished_at,
            elapsed_secs: elapsed.num_milliseconds() as f64 / 1000.0,
            encode_spec,
            summary: &outcome.summary,
            results: &outcome.results,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub async fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, self.to_json()?).await?;
        info!("Report written to {}", path.display());
        Ok(())
    }
}

/// Path relative to `base` when that is shorter to read
pub fn display_path(path: &Path, base: &Path) -> String {
    match pathdiff::diff_paths(path, base) {
        Some(relative) if !relative.starts_with("..") => relative.display().to_string(),
        _ => path.display().to_string(),
    }
}

fn format_elapsed(secs: f64) -> String {
    let total = secs.round() as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// One line per item plus the totals, as printed after a run.
pub fn render_summary(outcome: &BatchOutcome, base: &Path) -> String {
    let mut lines = Vec::new();
    lines.push(String::new());
    lines.push(format!("{:<8} {:<10} {:<40} {}", "Status", "Time", "File", "Output"));
    lines.push("-".repeat(90));

    for result in &outcome.results {
        let output = match result.best_output() {
            Some(path) => display_path(path, base),
            None => result.error.clone().unwrap_or_default(),
        };
        lines.push(format!(
            "{:<8} {:<10} {:<40} {}",
            result.status.to_string(),
            format_elapsed(result.elapsed_secs),
            result.media_item.display_name(),
            output
        ));
        if result.status == Status::Partial {
            if let Some(error) = &result.error {
                lines.push(format!("{:<8} {:<10} {}", "", "", error));
            }
        }
    }

    let summary = &outcome.summary;
    lines.push(String::new());
    lines.push(format!(
        "Total: {}  Success: {}  Partial: {}  Failed: {}",
        summary.total, summary.succeeded, summary.partial, summary.failed
    ));
    if !summary.failed_items.is_empty() {
        lines.push(format!("Failed files: {}", summary.failed_items.join(", ")));
    }
    lines.join("\n")
}

pub fn print_summary(outcome: &BatchOutcome) {
    let base = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    println!("{}", render_summary(outcome, &base));
}

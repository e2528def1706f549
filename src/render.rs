//! Plain-text and JSON output of the fleet view.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use fleetwatch_types::{MetricSeries, StorageUsage};

use crate::data::duration::format_age;
use crate::error::Result;
use crate::service::ViewPayload;

const SPARKLINE_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const SPARKLINE_WIDTH: usize = 8;
const NAME_WIDTH: usize = 24;

/// Render the view as a fixed-width table.
///
/// Entities that reported within the last 30 seconds are marked with `●`.
pub fn render_table(payload: &ViewPayload, now: DateTime<Utc>) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "  {:<name$}  {:>4}  {:<8}  {:>19}  {:<8}  {:<24}  {}",
        "NAME",
        "CPU",
        "",
        "MEMORY",
        "",
        "STORAGE",
        "LAST SEEN",
        name = NAME_WIDTH
    );

    for record in payload.entities.iter() {
        let marker = if record.recently_reported { '●' } else { ' ' };
        let _ = writeln!(
            out,
            "{} {:<name$}  {:>3}%  {:<8}  {:>19}  {:<8}  {:<24}  {}",
            marker,
            truncate(&record.name, NAME_WIDTH),
            record.cpu_current,
            sparkline(&record.cpu, 100.0),
            format!(
                "{} / {}",
                format_megabytes(record.memory_current),
                format_megabytes(record.memory_total)
            ),
            sparkline(&record.memory, record.memory_total as f64),
            format_storage(&record.storage),
            format_age(record.age_secs(now.timestamp())),
            name = NAME_WIDTH
        );
    }

    if payload.entities.is_empty() {
        let _ = writeln!(out, "  (no servers reporting)");
    }

    let _ = writeln!(
        out,
        "\n{} servers, computed {} ago in {}ms, next refresh at {}",
        payload.entities.len(),
        format_age(payload.age_secs(now)),
        payload.took.as_millis(),
        payload.next_recompute_at.format("%H:%M:%S")
    );
    out
}

/// Write the view as pretty JSON.
pub async fn export_json(payload: &ViewPayload, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(payload)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

/// Last few points of a series scaled against `max`.
fn sparkline(series: &MetricSeries, max: f64) -> String {
    if series.is_empty() || max <= 0.0 {
        return " ".repeat(SPARKLINE_WIDTH);
    }

    let skip = series.len().saturating_sub(SPARKLINE_WIDTH);
    series
        .iter()
        .skip(skip)
        .map(|point| match point.value {
            Some(v) => {
                let level = ((v / max) * 7.0).round().clamp(0.0, 7.0) as usize;
                SPARKLINE_CHARS[level]
            }
            None => ' ',
        })
        .collect()
}

fn format_storage(storage: &[StorageUsage]) -> String {
    storage
        .iter()
        .map(|disk| format!("{} {:.0}%", disk.directory, disk.used_ratio() * 100.0))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Format a size in megabytes, switching to GB past 1024.
fn format_megabytes(mb: u64) -> String {
    if mb >= 1024 {
        format!("{:.1} GB", mb as f64 / 1024.0)
    } else {
        format!("{} MB", mb)
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", truncated)
    }
}

//! Output formatting: table, JSON, plain.
//!
//! Records are schemaless JSON objects, so the table is built column by
//! column from the keys seen across the page, in first-seen order.

use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use serde_json::Value;
use tabled::builder::Builder;
use tabled::settings::Style;

use adminkit_core::{JobStats, ListView, Notice, NoticeLevel, Record};

use crate::cli::{ColorMode, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

pub fn should_color(mode: ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// A one-line notice for stderr, e.g. `✓ Sync completed.`
pub fn format_notice(notice: &Notice, color: bool) -> String {
    let marker = match notice.level {
        NoticeLevel::Success => "✓",
        NoticeLevel::Info => "•",
        NoticeLevel::Warning => "!",
        NoticeLevel::Error => "✗",
    };
    if !color {
        return format!("{marker} {}", notice.message);
    }
    let marker = match notice.level {
        NoticeLevel::Success => marker.green().bold().to_string(),
        NoticeLevel::Info => marker.cyan().to_string(),
        NoticeLevel::Warning => marker.yellow().bold().to_string(),
        NoticeLevel::Error => marker.red().bold().to_string(),
    };
    format!("{marker} {}", notice.message)
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render one page of records in the chosen format.
///
/// `plain` emits each record's `id` on its own line.
pub fn render_records(format: OutputFormat, records: &[Record]) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Table => render_table(records),
        OutputFormat::Json => serde_json::to_string_pretty(records)?,
        OutputFormat::JsonCompact => serde_json::to_string(records)?,
        OutputFormat::Plain => records
            .iter()
            .map(|r| r.get("id").map(cell).unwrap_or_default())
            .collect::<Vec<_>>()
            .join("\n"),
    })
}

pub fn render_stats(format: OutputFormat, stats: &JobStats) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Table => {
            let mut lines = Vec::new();
            if let Some(n) = stats.total_fetched {
                lines.push(format!("Fetched:     {n}"));
            }
            if let Some(n) = stats.new_emails {
                lines.push(format!("New emails:  {n}"));
            }
            for (key, value) in &stats.extra {
                lines.push(format!("{key}: {}", cell(value)));
            }
            lines.join("\n")
        }
        OutputFormat::Json => serde_json::to_string_pretty(stats)?,
        OutputFormat::JsonCompact => serde_json::to_string(stats)?,
        OutputFormat::Plain => stats.new_emails.unwrap_or_default().to_string(),
    })
}

/// `Page 2 of 5 (47 total)`.
pub fn page_summary(view: &ListView) -> String {
    let per_page = u64::from(view.per_page.max(1));
    let pages = view.total_rows.div_ceil(per_page).max(1);
    format!(
        "Page {} of {pages} ({} total)",
        view.current_page, view.total_rows
    )
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Format-specific renderers ────────────────────────────────────────

fn cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn render_table(records: &[Record]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let mut columns: Vec<&str> = Vec::new();
    for key in records.iter().filter_map(Value::as_object).flat_map(|o| o.keys()) {
        if !columns.contains(&key.as_str()) {
            columns.push(key);
        }
    }

    let mut builder = Builder::default();
    if columns.is_empty() {
        builder.push_record(["value".to_owned()]);
        for record in records {
            builder.push_record([cell(record)]);
        }
    } else {
        builder.push_record(columns.iter().map(|c| (*c).to_owned()));
        for record in records {
            builder.push_record(
                columns
                    .iter()
                    .map(|c| record.get(*c).map(cell).unwrap_or_default()),
            );
        }
    }

    let mut table = builder.build();
    table.with(Style::rounded());
    table.to_string()
}

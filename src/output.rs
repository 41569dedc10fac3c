//! Output rendering
//!
//! Serializes the column/row structure produced by the formatter into the
//! user-selected representation: a table, CSV, JSON, or bare values.

use crate::format::TabularResult;
use comfy_table::presets::ASCII_MARKDOWN;
use comfy_table::Table;
use indexmap::IndexMap;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// Comma-separated values with a header row
    Csv,
    /// JSON array of row objects
    Json,
    /// Values only, one row per line
    Value,
}

/// Render a tabular result to a string
pub fn render(result: &TabularResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Table => render_table(result),
        OutputFormat::Csv => render_csv(result),
        OutputFormat::Json => render_json(result),
        OutputFormat::Value => render_value(result),
    }
}

/// Render and print to stdout
pub fn print(result: &TabularResult, format: OutputFormat) {
    let rendered = render(result, format);
    if !rendered.is_empty() {
        println!("{rendered}");
    }
}

fn render_table(result: &TabularResult) -> String {
    let mut table = Table::new();
    table.load_preset(ASCII_MARKDOWN);
    table.set_header(result.columns.clone());
    for row in &result.rows {
        table.add_row(row.clone());
    }
    table.to_string()
}

fn render_csv(result: &TabularResult) -> String {
    let mut lines = Vec::with_capacity(result.rows.len() + 1);
    lines.push(csv_line(&result.columns));
    for row in &result.rows {
        lines.push(csv_line(row));
    }
    lines.join("\n")
}

fn csv_line(cells: &[String]) -> String {
    cells
        .iter()
        .map(|cell| {
            if cell.contains(',') || cell.contains('"') || cell.contains('\n') {
                format!("\"{}\"", cell.replace('"', "\"\""))
            } else {
                cell.clone()
            }
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn render_json(result: &TabularResult) -> String {
    // IndexMap keeps the declared column order in each emitted object.
    let objects: Vec<IndexMap<&str, &str>> = result
        .rows
        .iter()
        .map(|row| {
            result
                .columns
                .iter()
                .map(String::as_str)
                .zip(row.iter().map(String::as_str))
                .collect()
        })
        .collect();
    serde_json::to_string_pretty(&objects).unwrap_or_default()
}

fn render_value(result: &TabularResult) -> String {
    result
        .rows
        .iter()
        .map(|row| row.join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

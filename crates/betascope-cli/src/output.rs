use std::io::{self, Write};

use serde_json::Value;

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Plain-text rendering of a command result: `label: value` lines followed
/// by an optional column-aligned table.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TableView {
    pub heading: Vec<(&'static str, String)>,
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<String>>,
}

impl TableView {
    pub fn with_field(mut self, label: &'static str, value: impl Into<String>) -> Self {
        self.heading.push((label, value.into()));
        self
    }

    pub fn with_columns(mut self, columns: Vec<&'static str>) -> Self {
        self.columns = columns;
        self
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }
}

pub fn render(
    data: &Value,
    table: &TableView,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(data)?
            } else {
                serde_json::to_string(data)?
            };
            writeln!(out, "{payload}")?;
        }
        OutputFormat::Table => write_table(&mut out, table)?,
    }
    Ok(())
}

pub fn write_table(out: &mut impl Write, table: &TableView) -> io::Result<()> {
    let label_width = table
        .heading
        .iter()
        .map(|(label, _)| label.len())
        .max()
        .unwrap_or(0);
    for (label, value) in &table.heading {
        writeln!(out, "{label:<label_width$} : {value}")?;
    }

    if table.columns.is_empty() {
        return Ok(());
    }
    if !table.heading.is_empty() {
        writeln!(out)?;
    }

    let mut widths: Vec<usize> = table.columns.iter().map(|column| column.len()).collect();
    for row in &table.rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    write_row(out, table.columns.iter().copied(), &widths)?;
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    write_row(out, rule.iter().map(String::as_str), &widths)?;
    for row in &table.rows {
        write_row(out, row.iter().map(String::as_str), &widths)?;
    }
    Ok(())
}

fn write_row<'a>(
    out: &mut impl Write,
    cells: impl Iterator<Item = &'a str>,
    widths: &[usize],
) -> io::Result<()> {
    let line = cells
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join("  ");
    writeln!(out, "{}", line.trim_end())
}

/// Fixed-precision cell, `-` when absent.
pub fn number_cell(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| String::from("-"), |value| format!("{value:.precision$}"))
}

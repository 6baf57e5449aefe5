use crate::config::{DataPaths, FILTERED_EXPORT_FILE, REGIONAL_EXPORT_FILE, SUMMARY_EXPORT_FILE};
use crate::dashboard::Dashboard;
use crate::error::ExportError;
use crate::types::{
    AgentKpiRow, FarmerTable, Metrics, RegionIssueCount, RegionalKpiRow, TableView, TOTAL_ISSUES_COLUMN,
};
use crate::util::{format_number, format_pct};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style, Table, Tabled};
use tracing::{info, warn};

/// Column order used when a table was built in code and has no source
/// header row.
const FARMER_COLUMNS: &[&str] = &[
    "farmer_id",
    "country",
    "region",
    "crop",
    "survey_date",
    "insured",
    "claim_triggered",
    "payout_amount_usd",
    TOTAL_ISSUES_COLUMN,
];

#[derive(Debug, Serialize)]
pub struct ExportSummary<'a> {
    pub metrics: &'a Metrics,
    pub flagged_regions: &'a [RegionIssueCount],
}

/// The filtered farmer table as CSV text, with every source column in its
/// original order. Built fresh on each call.
pub fn filtered_csv(table: &FarmerTable) -> Result<String, ExportError> {
    let headers: Vec<String> = if table.headers.is_empty() {
        FARMER_COLUMNS.iter().map(|c| c.to_string()).collect()
    } else {
        table.headers.clone()
    };

    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(&headers)?;
    for r in &table.records {
        let row: Vec<String> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                if r.fields.len() == headers.len() {
                    r.fields[i].clone()
                } else {
                    r.typed_field(h).unwrap_or_default()
                }
            })
            .collect();
        wtr.write_record(&row)?;
    }
    finish(wtr)
}

/// The regional KPI table as CSV text: the source header and cells as they
/// were read, whatever columns the file carries.
pub fn regional_csv(view: TableView<'_, RegionalKpiRow>) -> Result<String, ExportError> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(view.headers)?;
    for cells in view.cells {
        wtr.write_record(cells)?;
    }
    finish(wtr)
}

fn finish(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ExportError> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// Write both CSV exports and a JSON summary of the metrics into `dir`.
/// Returns the paths written.
///
/// Nothing is written if any export would land on one of the `sources`
/// files.
pub fn write_exports(
    dir: &Path,
    dashboard: &Dashboard<'_>,
    sources: &DataPaths,
) -> Result<Vec<PathBuf>, ExportError> {
    let filtered_path = dir.join(FILTERED_EXPORT_FILE);
    let regional_path = dir.join(REGIONAL_EXPORT_FILE);
    let summary_path = dir.join(SUMMARY_EXPORT_FILE);

    for target in [&filtered_path, &regional_path, &summary_path] {
        if sources.iter().any(|source| same_file(target, source)) {
            warn!(target = %target.display(), "export target is a source file");
            return Err(ExportError::WouldOverwrite(target.clone()));
        }
    }

    std::fs::create_dir_all(dir)?;
    std::fs::write(&filtered_path, filtered_csv(&dashboard.filtered)?)?;
    std::fs::write(&regional_path, regional_csv(dashboard.regional)?)?;
    write_json(
        &summary_path,
        &ExportSummary {
            metrics: &dashboard.metrics,
            flagged_regions: &dashboard.flagged_regions,
        },
    )?;

    info!(
        dir = %dir.display(),
        filtered_rows = dashboard.filtered.len(),
        regional_rows = dashboard.regional.len(),
        "exports written"
    );
    Ok(vec![filtered_path, regional_path, summary_path])
}

pub fn markdown_table<T>(rows: &[T], max_rows: usize) -> Option<String>
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        return None;
    }
    Some(Table::new(slice).with(Style::markdown()).to_string())
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    print_preview(markdown_table(rows, max_rows));
}

/// Markdown rendition of a header row and string cells, for tables whose
/// columns are only known at runtime.
pub fn markdown_cells(headers: &[String], rows: &[Vec<String>], max_rows: usize) -> Option<String> {
    if rows.is_empty() {
        return None;
    }
    let mut builder = Builder::default();
    builder.push_record(headers.iter().cloned());
    for row in rows.iter().take(max_rows) {
        builder.push_record(row.iter().cloned());
    }
    let mut table = builder.build();
    table.with(Style::markdown());
    Some(table.to_string())
}

pub fn preview_cells(headers: &[String], rows: &[Vec<String>], max_rows: usize) {
    print_preview(markdown_cells(headers, rows, max_rows));
}

fn print_preview(rendered: Option<String>) {
    match rendered {
        Some(table_str) => println!("{}\n", table_str),
        None => println!("(no rows)\n"),
    }
}

/// Source cells, except where `format` has a display value for the column.
fn formatted_cells<T>(
    view: TableView<'_, T>,
    format: impl Fn(&str, &T) -> Option<String>,
) -> Vec<Vec<String>> {
    view.iter()
        .map(|(row, cells)| {
            view.headers
                .iter()
                .zip(cells)
                .map(|(h, cell)| format(h.as_str(), row).unwrap_or_else(|| cell.clone()))
                .collect()
        })
        .collect()
}

/// Regional rows for display: rates as `41.5%`, payouts as `1,520.25`.
pub fn regional_display_cells(view: TableView<'_, RegionalKpiRow>) -> Vec<Vec<String>> {
    formatted_cells(view, |header, row| match header {
        "coverage_rate" => Some(format_pct(row.coverage_rate)),
        "claim_rate" => Some(format_pct(row.claim_rate)),
        "total_payout" => Some(format_number(row.total_payout, 2)),
        _ => None,
    })
}

/// Agent rows for display, percentages to one decimal.
pub fn agent_display_cells(view: TableView<'_, AgentKpiRow>) -> Vec<Vec<String>> {
    formatted_cells(view, |header, row| match header {
        "insured_pct" => Some(format_pct(row.insured_pct)),
        "claim_pct" => Some(format_pct(row.claim_pct)),
        _ => None,
    })
}

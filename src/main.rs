// Entry point and the console rendition of the dashboard.
//
// The three source tables are loaded once at startup; a load failure ends
// the run before any menu is shown. After that:
// - Option [1] walks through the cascading filters.
// - Option [2] prints KPI cards, regional KPIs, data quality alerts, the
//   top agents and a preview of the filtered rows.
// - Option [3] writes the CSV exports and a JSON summary.
use anyhow::{Context, Result};
use clap::Parser;
use farmer_dashboard::filter::apply_with_options;
use farmer_dashboard::config::DEFAULT_EXPORT_DIR;
use farmer_dashboard::output::{
    agent_display_cells, preview_cells, preview_table_rows, regional_display_cells, write_exports,
};
use farmer_dashboard::types::{FarmerPreviewRow, KpiCard};
use farmer_dashboard::util::{format_int, format_pct, format_usd};
use farmer_dashboard::{
    load_cached, Choice, Dashboard, DataPaths, Dataset, DateSelection, FilterSpec, InsuredFilter,
};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

const PREVIEW_ROWS: usize = 10;

#[derive(Parser)]
#[command(name = "farmer_dashboard")]
#[command(about = "Farmer survey data quality & insurance impact dashboard")]
#[command(version)]
struct Cli {
    /// Directory holding the farmer, regional and agent CSV files
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Directory the exports are written to. Exports never replace the
    /// source files.
    #[arg(long, default_value = DEFAULT_EXPORT_DIR)]
    export_dir: PathBuf,
}

/// Print `label` and read one trimmed line. `None` once stdin is closed.
fn prompt(label: &str) -> Option<String> {
    print!("{}", label);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Blank keeps every offered value, `none` clears the selection, anything
/// else is a comma separated list. Values that are not on offer are dropped.
fn read_choice(dimension: &str, offered: &[String]) -> Option<Choice> {
    println!("{} options: {}", dimension, offered.join(", "));
    let input = prompt(&format!("{} (comma separated, blank = all, `none` = nothing): ", dimension))?;
    if input.is_empty() {
        return Some(Choice::All);
    }
    if input.eq_ignore_ascii_case("none") {
        return Some(Choice::none());
    }
    let mut picked = BTreeSet::new();
    for value in input.split(',').map(str::trim).filter(|v| !v.is_empty()) {
        if offered.iter().any(|o| o == value) {
            picked.insert(value.to_string());
        } else {
            println!("Ignoring `{}`: not offered for {}.", value, dimension);
        }
    }
    Some(Choice::Only(picked))
}

fn read_dates(bounds: Option<(chrono::NaiveDate, chrono::NaiveDate)>) -> Option<DateSelection> {
    match bounds {
        Some((lo, hi)) => println!("Survey dates available: {} to {}", lo, hi),
        None => println!("Survey dates available: none"),
    }
    let input = prompt("Survey Date Range (YYYY-MM-DD YYYY-MM-DD, blank = full span): ")?;
    let (selection, rejected) = DateSelection::parse_input(&input);
    for token in rejected {
        println!("Ignoring `{}`: not a date (YYYY-MM-DD).", token);
    }
    if let DateSelection::Partial(_) = selection {
        println!("A range needs exactly two dates; keeping the full span.");
    }
    Some(selection)
}

/// Handle option [1]: rebuild the filter spec one dimension at a time so
/// each selector only offers what the previous ones left.
fn handle_filters(dataset: &Dataset) -> Option<FilterSpec> {
    let mut spec = FilterSpec::default();

    let options = apply_with_options(&dataset.farmers, &spec).1;
    spec.countries = read_choice("Country", &options.countries)?;

    let options = apply_with_options(&dataset.farmers, &spec).1;
    spec.regions = read_choice("Region", &options.regions)?;

    let options = apply_with_options(&dataset.farmers, &spec).1;
    spec.crops = read_choice("Crop", &options.crops)?;

    let options = apply_with_options(&dataset.farmers, &spec).1;
    spec.dates = read_dates(options.date_bounds)?;

    loop {
        let input = prompt(&format!("Insurance Status [{}]: ", InsuredFilter::OPTIONS.join("/")))?;
        match InsuredFilter::parse(&input) {
            Some(insured) => {
                spec.insured = insured;
                break;
            }
            None => println!("Invalid choice. Please enter All, Yes or No."),
        }
    }

    let filtered = apply_with_options(&dataset.farmers, &spec).0;
    println!("\nFiltered Records: {}\n", format_int(filtered.len() as u64));
    Some(spec)
}

/// Handle option [2]: recompute and print every dashboard section.
fn handle_show(dataset: &Dataset, spec: &FilterSpec) {
    let d = Dashboard::compute(dataset, spec);
    let m = &d.metrics;

    println!("Filtered Records: {}\n", format_int(m.filtered_records as u64));
    println!("Key Performance Indicators\n");
    let cards = vec![
        KpiCard {
            metric: "Total Unique Farmers".into(),
            value: format_int(m.total_farmers as u64),
            note: String::new(),
        },
        KpiCard {
            metric: "Insured Farmers".into(),
            value: format_int(m.insured_count as u64),
            note: format!("{} coverage", format_pct(m.coverage_rate)),
        },
        KpiCard {
            metric: "Total Payout (USD)".into(),
            value: format_usd(m.total_payout),
            note: String::new(),
        },
        KpiCard {
            metric: "Avg Payout per Claim (USD)".into(),
            value: format_usd(m.avg_payout_per_claim),
            note: String::new(),
        },
    ];
    preview_table_rows(&cards, cards.len());

    println!("Regional Insights\n");
    if d.has_data() {
        preview_cells(d.regional.headers, &regional_display_cells(d.regional), d.regional.len());
    } else {
        println!("No data after applying filters. Try adjusting selections.\n");
    }

    if dataset.farmers.tracks_issues() {
        println!("Data Quality Alerts\n");
        if d.flagged_regions.is_empty() {
            println!("Data quality looks good across all records!\n");
        } else {
            println!("High Issue Regions (records with more than 2 issues):");
            preview_table_rows(&d.flagged_regions, d.flagged_regions.len());
        }
    }

    println!("Field Agent Performance (Top 10 by Farmers Surveyed)\n");
    preview_cells(d.top_agents.headers, &agent_display_cells(d.top_agents), d.top_agents.len());

    println!("Filtered Records (first {})\n", PREVIEW_ROWS);
    let preview: Vec<FarmerPreviewRow> = d
        .filtered
        .records
        .iter()
        .take(PREVIEW_ROWS)
        .map(FarmerPreviewRow::from)
        .collect();
    preview_table_rows(&preview, PREVIEW_ROWS);
}

/// Handle option [3]: write both CSV exports plus the JSON summary.
fn handle_export(dataset: &Dataset, spec: &FilterSpec, dir: &Path, sources: &DataPaths) {
    let d = Dashboard::compute(dataset, spec);
    match write_exports(dir, &d, sources) {
        Ok(paths) => {
            for p in paths {
                println!("Exported {}", p.display());
            }
            println!();
        }
        Err(e) => eprintln!("Export failed: {}\n", e),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("farmer_dashboard=info".parse()?))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let paths = DataPaths::in_dir(&cli.data_dir);
    let dataset = load_cached(&paths)
        .with_context(|| format!("loading dashboard data from {}", cli.data_dir.display()))?;
    println!(
        "Loaded {} survey records, {} regions, {} agents.\n",
        format_int(dataset.report.farmer_rows as u64),
        format_int(dataset.report.regional_rows as u64),
        format_int(dataset.report.agent_rows as u64)
    );

    let mut spec = FilterSpec::default();
    loop {
        println!("Farmer Survey & Insurance Impact Dashboard");
        println!("[1] Set filters");
        println!("[2] Show dashboard");
        println!("[3] Export data");
        println!("[0] Exit\n");
        let Some(choice) = prompt("Enter choice: ") else {
            break;
        };
        match choice.as_str() {
            "1" => {
                println!();
                match handle_filters(dataset) {
                    Some(new_spec) => spec = new_spec,
                    None => break,
                }
            }
            "2" => {
                println!();
                handle_show(dataset, &spec);
            }
            "3" => handle_export(dataset, &spec, &cli.export_dir, &paths),
            "0" => break,
            _ => println!("Invalid choice. Please enter 0, 1, 2 or 3.\n"),
        }
    }

    info!("dashboard closed");
    println!("Exiting the program.");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_export_dir_is_not_the_data_dir() {
        let cli = Cli::parse_from(["farmer_dashboard"]);
        assert_eq!(cli.data_dir, Path::new("."));
        assert_eq!(cli.export_dir, Path::new("exports"));
    }
}

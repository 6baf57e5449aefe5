use crate::config::DataPaths;
use crate::error::LoadError;
use crate::types::{
    AgentKpiRow, FarmerRecord, FarmerTable, RawFarmerRow, ReferenceTable, RegionalKpiRow, YesNo,
};
use crate::util::{format_int, parse_count_safe, parse_date_safe, parse_f64_safe};
use csv::{ReaderBuilder, StringRecord, Trim};
use once_cell::sync::OnceCell;
use serde::de::DeserializeOwned;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// A required header, with any alternative spellings it may appear under.
struct Column {
    name: &'static str,
    aliases: &'static [&'static str],
}

const fn col(name: &'static str) -> Column {
    Column { name, aliases: &[] }
}

const FARMER_COLUMNS: &[Column] = &[
    col("farmer_id"),
    col("country"),
    col("region"),
    col("crop"),
    col("survey_date"),
    col("insured"),
    col("claim_triggered"),
    col("payout_amount_usd"),
];

const REGIONAL_COLUMNS: &[Column] = &[
    col("region"),
    col("coverage_rate"),
    col("claim_rate"),
    col("total_payout"),
];

// Only the columns formatted on screen are required; the agent name and
// survey count columns pass through under whatever header they have.
const AGENT_COLUMNS: &[Column] = &[col("insured_pct"), col("claim_pct")];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub farmer_rows: usize,
    pub regional_rows: usize,
    pub agent_rows: usize,
}

/// Everything the dashboard reads from disk. Held immutably for the rest of
/// the run once loaded.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub farmers: FarmerTable,
    pub regional: ReferenceTable<RegionalKpiRow>,
    pub agents: ReferenceTable<AgentKpiRow>,
    pub report: LoadReport,
}

// Written at most once; a failed load leaves it empty so the next attempt
// reads the files again.
static DATASET: OnceCell<Dataset> = OnceCell::new();

/// Load the three tables once per process and hand out the same copy on
/// every later call. `paths` is only consulted on the first successful load.
pub fn load_cached(paths: &DataPaths) -> Result<&'static Dataset, LoadError> {
    if let Some(ds) = DATASET.get() {
        debug!("serving dataset from process cache");
        return Ok(ds);
    }
    DATASET.get_or_try_init(|| load(paths))
}

/// The cached dataset, if a load has already succeeded.
pub fn cached() -> Option<&'static Dataset> {
    DATASET.get()
}

pub fn load(paths: &DataPaths) -> Result<Dataset, LoadError> {
    let farmers = load_farmers(&paths.farmers)?;
    let regional = load_regional(&paths.regional)?;
    let agents = load_agents(&paths.agents)?;

    let report = LoadReport {
        farmer_rows: farmers.len(),
        regional_rows: regional.len(),
        agent_rows: agents.len(),
    };
    info!(
        farmer_rows = report.farmer_rows,
        regional_rows = report.regional_rows,
        agent_rows = report.agent_rows,
        tracks_issues = farmers.tracks_issues(),
        "loaded dashboard tables"
    );
    Ok(Dataset {
        farmers,
        regional,
        agents,
        report,
    })
}

pub fn load_farmers(path: &Path) -> Result<FarmerTable, LoadError> {
    let (mut rdr, header_record) = open_reader(path)?;
    let headers: Vec<String> = header_record.iter().map(str::to_string).collect();
    check_columns(path, &headers, FARMER_COLUMNS)?;

    let mut records = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| row_error(path, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let raw: RawFarmerRow = record
            .deserialize(Some(&header_record))
            .map_err(|e| row_error(path, e))?;
        let farmer = to_farmer_record(raw, &record).map_err(|reason| LoadError::InvalidRow {
            path: path.to_path_buf(),
            line,
            reason,
        })?;
        records.push(farmer);
    }

    if records.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    debug!(path = %path.display(), rows = %format_int(records.len() as u64), "farmer table read");
    Ok(FarmerTable::new(headers, records))
}

pub fn load_regional(path: &Path) -> Result<ReferenceTable<RegionalKpiRow>, LoadError> {
    read_reference(path, REGIONAL_COLUMNS)
}

pub fn load_agents(path: &Path) -> Result<ReferenceTable<AgentKpiRow>, LoadError> {
    read_reference(path, AGENT_COLUMNS)
}

fn open_reader(path: &Path) -> Result<(csv::Reader<File>, StringRecord), LoadError> {
    let file = File::open(path).map_err(|source| LoadError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let mut rdr = ReaderBuilder::new().trim(Trim::Headers).from_reader(file);
    let headers = rdr
        .headers()
        .map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?
        .clone();
    Ok((rdr, headers))
}

fn check_columns(path: &Path, headers: &[String], required: &[Column]) -> Result<(), LoadError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|c| {
            !headers
                .iter()
                .any(|h| h == c.name || c.aliases.iter().any(|a| *a == h.as_str()))
        })
        .map(|c| c.name.to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(LoadError::MissingColumns {
            path: path.to_path_buf(),
            missing,
        })
    }
}

fn read_reference<T: DeserializeOwned>(
    path: &Path,
    required: &[Column],
) -> Result<ReferenceTable<T>, LoadError> {
    let (mut rdr, header_record) = open_reader(path)?;
    let headers: Vec<String> = header_record.iter().map(str::to_string).collect();
    check_columns(path, &headers, required)?;

    let mut cells = Vec::new();
    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| row_error(path, e))?;
        rows.push(
            record
                .deserialize::<T>(Some(&header_record))
                .map_err(|e| row_error(path, e))?,
        );
        cells.push(record.iter().map(str::to_string).collect());
    }
    if cells.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    debug!(path = %path.display(), rows = cells.len(), "reference table read");
    Ok(ReferenceTable {
        headers,
        cells,
        rows,
    })
}

fn row_error(path: &Path, err: csv::Error) -> LoadError {
    let line = err.position().map(|p| p.line());
    match line {
        Some(line) => LoadError::InvalidRow {
            path: path.to_path_buf(),
            line,
            reason: err.to_string(),
        },
        None => LoadError::Csv {
            path: path.to_path_buf(),
            source: err,
        },
    }
}

fn to_farmer_record(raw: RawFarmerRow, record: &StringRecord) -> Result<FarmerRecord, String> {
    let farmer_id = raw
        .farmer_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| "missing farmer_id".to_string())?;

    let survey_date = parse_date_safe(raw.survey_date.as_deref()).ok_or_else(|| {
        format!(
            "survey_date `{}` is not a calendar date",
            raw.survey_date.as_deref().unwrap_or("")
        )
    })?;

    let insured = yes_no("insured", raw.insured.as_deref())?;
    let claim_triggered = yes_no("claim_triggered", raw.claim_triggered.as_deref())?;

    let payout_amount_usd = match raw.payout_amount_usd.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => match parse_f64_safe(Some(s)) {
            Some(v) => Some(v),
            None if s.eq_ignore_ascii_case("nan") => None,
            None => return Err(format!("payout_amount_usd `{}` is not a number", s)),
        },
    };

    let total_issues = match raw.total_issues.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) => Some(
            parse_count_safe(Some(s))
                .ok_or_else(|| format!("total_issues `{}` is not a count", s))?,
        ),
    };

    Ok(FarmerRecord {
        farmer_id,
        country: text(raw.country),
        region: text(raw.region),
        crop: text(raw.crop),
        survey_date,
        insured,
        claim_triggered,
        payout_amount_usd,
        total_issues,
        fields: record.iter().map(str::to_string).collect(),
    })
}

fn text(v: Option<String>) -> String {
    v.map(|s| s.trim().to_string()).unwrap_or_default()
}

fn yes_no(column: &str, v: Option<&str>) -> Result<YesNo, String> {
    let s = v.unwrap_or("");
    YesNo::parse(s).ok_or_else(|| format!("{} must be Yes or No, got `{}`", column, s))
}

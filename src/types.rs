use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

use crate::util::format_number;

/// Column that carries the upstream data-quality issue count. Optional in
/// the farmer file.
pub const TOTAL_ISSUES_COLUMN: &str = "total_issues";

/// Farmer survey row as it comes out of the CSV reader. Every field is kept
/// as optional text; conversion happens in the loader.
#[derive(Debug, Deserialize)]
pub struct RawFarmerRow {
    pub farmer_id: Option<String>,
    pub country: Option<String>,
    pub region: Option<String>,
    pub crop: Option<String>,
    pub survey_date: Option<String>,
    pub insured: Option<String>,
    pub claim_triggered: Option<String>,
    pub payout_amount_usd: Option<String>,
    #[serde(default)]
    pub total_issues: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum YesNo {
    Yes,
    No,
}

impl YesNo {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Yes" => Some(YesNo::Yes),
            "No" => Some(YesNo::No),
            _ => None,
        }
    }

    pub fn is_yes(self) -> bool {
        self == YesNo::Yes
    }

    pub fn as_str(self) -> &'static str {
        match self {
            YesNo::Yes => "Yes",
            YesNo::No => "No",
        }
    }
}

impl fmt::Display for YesNo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One surveyed farmer visit.
///
/// `fields` holds the original CSV cells in header order so an export can
/// reproduce columns this crate does not interpret.
#[derive(Debug, Clone, PartialEq)]
pub struct FarmerRecord {
    pub farmer_id: String,
    pub country: String,
    pub region: String,
    pub crop: String,
    pub survey_date: NaiveDate,
    pub insured: YesNo,
    pub claim_triggered: YesNo,
    /// Only meaningful when `claim_triggered` is `Yes`. `None` for an empty cell.
    pub payout_amount_usd: Option<f64>,
    pub total_issues: Option<u32>,
    pub fields: Vec<String>,
}

impl FarmerRecord {
    /// Render a known column from the typed fields. Used when a record was
    /// built in code rather than read from a file.
    pub fn typed_field(&self, column: &str) -> Option<String> {
        let value = match column {
            "farmer_id" => self.farmer_id.clone(),
            "country" => self.country.clone(),
            "region" => self.region.clone(),
            "crop" => self.crop.clone(),
            "survey_date" => self.survey_date.format("%Y-%m-%d").to_string(),
            "insured" => self.insured.to_string(),
            "claim_triggered" => self.claim_triggered.to_string(),
            "payout_amount_usd" => self.payout_amount_usd.map(|p| p.to_string())?,
            TOTAL_ISSUES_COLUMN => self.total_issues.map(|n| n.to_string())?,
            _ => return None,
        };
        Some(value)
    }
}

/// The farmer-level table. Never mutated once loaded; filtering builds a
/// new table that shares the header row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FarmerTable {
    pub headers: Vec<String>,
    pub records: Vec<FarmerRecord>,
}

impl FarmerTable {
    pub fn new(headers: Vec<String>, records: Vec<FarmerRecord>) -> Self {
        Self { headers, records }
    }

    /// Same columns, different rows.
    pub fn with_records(&self, records: Vec<FarmerRecord>) -> Self {
        Self {
            headers: self.headers.clone(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }

    pub fn tracks_issues(&self) -> bool {
        self.has_column(TOTAL_ISSUES_COLUMN)
    }
}

/// A pre-aggregated table kept cell for cell, so it can be shown and
/// exported exactly as it was read. `rows` is a typed view of the columns
/// the dashboard formats, aligned with `cells`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceTable<T> {
    pub headers: Vec<String>,
    pub cells: Vec<Vec<String>>,
    pub rows: Vec<T>,
}

impl<T> ReferenceTable<T> {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn view(&self) -> TableView<'_, T> {
        self.head(self.len())
    }

    /// The first `n` rows in file order.
    pub fn head(&self, n: usize) -> TableView<'_, T> {
        let n = n.min(self.cells.len()).min(self.rows.len());
        TableView {
            headers: &self.headers,
            cells: &self.cells[..n],
            rows: &self.rows[..n],
        }
    }
}

/// Borrowed rows of a [`ReferenceTable`].
#[derive(Debug, PartialEq)]
pub struct TableView<'a, T> {
    pub headers: &'a [String],
    pub cells: &'a [Vec<String>],
    pub rows: &'a [T],
}

impl<T> Clone for TableView<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for TableView<'_, T> {}

impl<'a, T> TableView<'a, T> {
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Typed row and source cells, side by side.
    pub fn iter(self) -> impl Iterator<Item = (&'a T, &'a [String])> + 'a {
        let (rows, cells) = (self.rows, self.cells);
        rows.iter().zip(cells.iter().map(Vec::as_slice))
    }
}

/// Typed columns of one regional KPI row. Other columns stay in the
/// table's cells.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegionalKpiRow {
    pub region: String,
    pub coverage_rate: f64,
    pub claim_rate: f64,
    pub total_payout: f64,
}

/// Typed columns of one agent KPI row: the two percentages the dashboard
/// formats. Agent name and survey count are shown as read.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AgentKpiRow {
    pub insured_pct: f64,
    pub claim_pct: f64,
}

/// Summary numbers over a filtered farmer table.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Metrics {
    pub filtered_records: usize,
    pub total_farmers: usize,
    pub insured_count: usize,
    pub coverage_rate: f64,
    pub total_payout: f64,
    pub avg_payout_per_claim: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct RegionIssueCount {
    #[tabled(rename = "Region")]
    pub region: String,
    #[tabled(rename = "Records")]
    pub count: usize,
}

/// A single KPI card as printed on the console dashboard.
#[derive(Debug, Clone, Tabled)]
pub struct KpiCard {
    #[tabled(rename = "Metric")]
    pub metric: String,
    #[tabled(rename = "Value")]
    pub value: String,
    #[tabled(rename = "")]
    pub note: String,
}

#[derive(Debug, Clone, Tabled)]
pub struct FarmerPreviewRow {
    #[tabled(rename = "farmer_id")]
    pub farmer_id: String,
    #[tabled(rename = "country")]
    pub country: String,
    #[tabled(rename = "region")]
    pub region: String,
    #[tabled(rename = "crop")]
    pub crop: String,
    #[tabled(rename = "survey_date")]
    pub survey_date: String,
    #[tabled(rename = "insured")]
    pub insured: String,
    #[tabled(rename = "claim_triggered")]
    pub claim_triggered: String,
    #[tabled(rename = "payout_amount_usd")]
    pub payout_amount_usd: String,
}

impl From<&FarmerRecord> for FarmerPreviewRow {
    fn from(r: &FarmerRecord) -> Self {
        FarmerPreviewRow {
            farmer_id: r.farmer_id.clone(),
            country: r.country.clone(),
            region: r.region.clone(),
            crop: r.crop.clone(),
            survey_date: r.survey_date.format("%Y-%m-%d").to_string(),
            insured: r.insured.to_string(),
            claim_triggered: r.claim_triggered.to_string(),
            payout_amount_usd: r
                .payout_amount_usd
                .map(|p| format_number(p, 2))
                .unwrap_or_default(),
        }
    }
}

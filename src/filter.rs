// Cascading filter over the farmer table.
//
// Predicates run in a fixed order: country, region, crop, survey date,
// insured. The option list for each dimension is taken from the rows that
// survive the previous steps, which is what makes the selectors cascade.
use crate::types::{FarmerRecord, FarmerTable, YesNo};
use crate::util::parse_date_safe;
use chrono::NaiveDate;
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Selection for one categorical dimension.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Choice {
    /// Every option offered at this step. This is what a fresh selector
    /// starts with.
    #[default]
    All,
    /// Exactly these values. An empty set selects nothing.
    Only(BTreeSet<String>),
}

impl Choice {
    pub fn only<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Choice::Only(values.into_iter().map(Into::into).collect())
    }

    pub fn none() -> Self {
        Choice::Only(BTreeSet::new())
    }

    pub fn allows(&self, value: &str) -> bool {
        match self {
            Choice::All => true,
            Choice::Only(set) => set.contains(value),
        }
    }
}

/// Survey date selection as it comes from a range picker.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DateSelection {
    /// The full span of dates left after the crop step.
    #[default]
    Span,
    Range { start: NaiveDate, end: NaiveDate },
    /// Anything that is not a start and an end, e.g. a picker where only
    /// the first date has been clicked so far.
    Partial(Vec<NaiveDate>),
}

impl DateSelection {
    pub fn from_dates(dates: &[NaiveDate]) -> Self {
        match dates {
            [start, end] => DateSelection::Range {
                start: *start,
                end: *end,
            },
            other => DateSelection::Partial(other.to_vec()),
        }
    }

    /// Read a typed-in range such as `2026-01-01 2026-03-31` or
    /// `2026-01-01 .. 2026-03-31`. Blank input keeps the full span. Tokens
    /// that are not dates come back alongside the selection.
    pub fn parse_input(input: &str) -> (Self, Vec<String>) {
        let tokens: Vec<&str> = input
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|s| !s.is_empty() && *s != "..")
            .collect();
        if tokens.is_empty() {
            return (DateSelection::Span, Vec::new());
        }
        let mut dates = Vec::new();
        let mut rejected = Vec::new();
        for token in tokens {
            match parse_date_safe(Some(token)) {
                Some(d) => dates.push(d),
                None => rejected.push(token.to_string()),
            }
        }
        (DateSelection::from_dates(&dates), rejected)
    }

    /// Inclusive bounds to filter on, or `None` when the predicate is
    /// unconstrained.
    fn bounds(&self) -> Option<(NaiveDate, NaiveDate)> {
        match self {
            DateSelection::Span => None,
            DateSelection::Range { start, end } if start <= end => Some((*start, *end)),
            DateSelection::Range { start, end } => {
                warn!(%start, %end, "date range ends before it starts; ignoring it");
                None
            }
            DateSelection::Partial(dates) => {
                warn!(dates = dates.len(), "incomplete date range; ignoring it");
                None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InsuredFilter {
    #[default]
    All,
    Yes,
    No,
}

impl InsuredFilter {
    pub const OPTIONS: [&'static str; 3] = ["All", "Yes", "No"];

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "All" | "" => Some(InsuredFilter::All),
            "Yes" => Some(InsuredFilter::Yes),
            "No" => Some(InsuredFilter::No),
            _ => None,
        }
    }

    pub fn matches(self, insured: YesNo) -> bool {
        match self {
            InsuredFilter::All => true,
            InsuredFilter::Yes => insured == YesNo::Yes,
            InsuredFilter::No => insured == YesNo::No,
        }
    }
}

/// The predicate set for one recomputation. Rebuilt from user input on
/// every interaction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterSpec {
    pub countries: Choice,
    pub regions: Choice,
    pub crops: Choice,
    pub dates: DateSelection,
    pub insured: InsuredFilter,
}

/// What each selector may offer, given the selections made before it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterOptions {
    pub countries: Vec<String>,
    pub regions: Vec<String>,
    pub crops: Vec<String>,
    /// Earliest and latest survey date after the crop step; `None` when no
    /// rows are left by then.
    pub date_bounds: Option<(NaiveDate, NaiveDate)>,
}

/// Sorted distinct values of one column.
pub fn distinct_sorted<'a, I, F>(rows: I, key: F) -> Vec<String>
where
    I: IntoIterator<Item = &'a FarmerRecord>,
    F: Fn(&'a FarmerRecord) -> &'a str,
{
    rows.into_iter()
        .map(key)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

pub fn date_bounds<'a, I>(rows: I) -> Option<(NaiveDate, NaiveDate)>
where
    I: IntoIterator<Item = &'a FarmerRecord>,
{
    rows.into_iter().fold(None, |acc, r| {
        let d = r.survey_date;
        Some(match acc {
            None => (d, d),
            Some((lo, hi)) => (lo.min(d), hi.max(d)),
        })
    })
}

pub fn apply(table: &FarmerTable, spec: &FilterSpec) -> FarmerTable {
    apply_with_options(table, spec).0
}

/// Run every predicate in order and return the surviving rows along with
/// the options each selector would have offered. `table` is left untouched.
pub fn apply_with_options(table: &FarmerTable, spec: &FilterSpec) -> (FarmerTable, FilterOptions) {
    let mut options = FilterOptions {
        countries: distinct_sorted(&table.records, |r| r.country.as_str()),
        ..Default::default()
    };

    let rows: Vec<&FarmerRecord> = table
        .records
        .iter()
        .filter(|r| spec.countries.allows(&r.country))
        .collect();
    debug!(step = "country", rows = rows.len());

    options.regions = distinct_sorted(rows.iter().copied(), |r| r.region.as_str());
    let rows: Vec<&FarmerRecord> = rows
        .into_iter()
        .filter(|r| spec.regions.allows(&r.region))
        .collect();
    debug!(step = "region", rows = rows.len());

    options.crops = distinct_sorted(rows.iter().copied(), |r| r.crop.as_str());
    let rows: Vec<&FarmerRecord> = rows
        .into_iter()
        .filter(|r| spec.crops.allows(&r.crop))
        .collect();
    debug!(step = "crop", rows = rows.len());

    options.date_bounds = date_bounds(rows.iter().copied());
    let rows: Vec<&FarmerRecord> = match spec.dates.bounds() {
        Some((start, end)) => rows
            .into_iter()
            .filter(|r| r.survey_date >= start && r.survey_date <= end)
            .collect(),
        None => rows,
    };
    debug!(step = "date", rows = rows.len());

    let rows: Vec<FarmerRecord> = rows
        .into_iter()
        .filter(|r| spec.insured.matches(r.insured))
        .cloned()
        .collect();
    debug!(step = "insured", rows = rows.len());

    (table.with_records(rows), options)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn record(
        farmer_id: &str,
        country: &str,
        region: &str,
        crop: &str,
        survey_date: NaiveDate,
        insured: YesNo,
        claim: YesNo,
        payout: Option<f64>,
        issues: Option<u32>,
    ) -> FarmerRecord {
        FarmerRecord {
            farmer_id: farmer_id.to_string(),
            country: country.to_string(),
            region: region.to_string(),
            crop: crop.to_string(),
            survey_date,
            insured,
            claim_triggered: claim,
            payout_amount_usd: payout,
            total_issues: issues,
            fields: Vec::new(),
        }
    }

    pub(crate) fn sample_table() -> FarmerTable {
        use YesNo::{No, Yes};
        let headers = [
            "farmer_id",
            "country",
            "region",
            "crop",
            "survey_date",
            "insured",
            "claim_triggered",
            "payout_amount_usd",
            "total_issues",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        FarmerTable::new(
            headers,
            vec![
                record("F1", "Kenya", "Nakuru", "Maize", date(2026, 1, 5), Yes, Yes, Some(120.0), Some(0)),
                record("F2", "Kenya", "Kisumu", "Beans", date(2026, 1, 20), Yes, No, Some(0.0), Some(3)),
                record("F3", "Kenya", "Nakuru", "Maize", date(2026, 2, 1), No, No, None, Some(4)),
                record("F4", "Ethiopia", "Oromia", "Teff", date(2026, 2, 14), Yes, Yes, Some(80.0), Some(5)),
                record("F5", "Ethiopia", "Amhara", "Maize", date(2026, 3, 3), No, No, Some(0.0), Some(1)),
                record("F6", "Zambia", "Lusaka", "Maize", date(2026, 3, 30), Yes, No, Some(0.0), Some(3)),
            ],
        )
    }

    fn ids(table: &FarmerTable) -> Vec<&str> {
        table.records.iter().map(|r| r.farmer_id.as_str()).collect()
    }

    #[test]
    fn default_spec_keeps_everything() {
        let table = sample_table();
        let (out, options) = apply_with_options(&table, &FilterSpec::default());
        assert_eq!(out, table);
        assert_eq!(options.countries, vec!["Ethiopia", "Kenya", "Zambia"]);
        assert_eq!(options.date_bounds, Some((date(2026, 1, 5), date(2026, 3, 30))));
    }

    #[test]
    fn region_options_cascade_from_countries() {
        let table = sample_table();
        let spec = FilterSpec {
            countries: Choice::only(["Kenya"]),
            ..Default::default()
        };
        let (out, options) = apply_with_options(&table, &spec);
        assert_eq!(ids(&out), vec!["F1", "F2", "F3"]);
        assert_eq!(options.regions, vec!["Kisumu", "Nakuru"]);
        assert_eq!(options.crops, vec!["Beans", "Maize"]);

        let all_regions = apply_with_options(&table, &FilterSpec::default()).1.regions;
        assert!(options.regions.iter().all(|r| all_regions.contains(r)));
    }

    #[test]
    fn region_outside_selected_countries_matches_nothing() {
        let spec = FilterSpec {
            countries: Choice::only(["Kenya"]),
            regions: Choice::only(["Lusaka"]),
            ..Default::default()
        };
        assert!(apply(&sample_table(), &spec).is_empty());
    }

    #[test]
    fn empty_country_selection_empties_every_later_step() {
        let spec = FilterSpec {
            countries: Choice::none(),
            dates: DateSelection::Range {
                start: date(2026, 1, 1),
                end: date(2026, 12, 31),
            },
            insured: InsuredFilter::Yes,
            ..Default::default()
        };
        let (out, options) = apply_with_options(&sample_table(), &spec);
        assert!(out.is_empty());
        assert!(options.regions.is_empty());
        assert!(options.crops.is_empty());
        assert_eq!(options.date_bounds, None);
        assert_eq!(out.headers, sample_table().headers);
    }

    #[test]
    fn date_range_is_inclusive_on_both_ends() {
        let spec = FilterSpec {
            dates: DateSelection::Range {
                start: date(2026, 1, 20),
                end: date(2026, 2, 14),
            },
            ..Default::default()
        };
        assert_eq!(ids(&apply(&sample_table(), &spec)), vec!["F2", "F3", "F4"]);
    }

    #[test]
    fn typed_date_input_reports_what_it_could_not_read() {
        let (sel, rejected) = DateSelection::parse_input("2026-01-01 2026-13-45");
        assert_eq!(sel, DateSelection::Partial(vec![date(2026, 1, 1)]));
        assert_eq!(rejected, vec!["2026-13-45"]);

        let (sel, rejected) = DateSelection::parse_input("2026-01-01 .. 2026/02/01");
        assert_eq!(
            sel,
            DateSelection::Range {
                start: date(2026, 1, 1),
                end: date(2026, 2, 1)
            }
        );
        assert!(rejected.is_empty());

        assert_eq!(DateSelection::parse_input("  "), (DateSelection::Span, Vec::new()));
    }

    #[test]
    fn partial_or_inverted_dates_are_unconstrained() {
        let table = sample_table();
        for dates in [
            DateSelection::from_dates(&[date(2026, 2, 1)]),
            DateSelection::from_dates(&[]),
            DateSelection::Range {
                start: date(2026, 3, 1),
                end: date(2026, 1, 1),
            },
        ] {
            let spec = FilterSpec {
                dates,
                ..Default::default()
            };
            assert_eq!(apply(&table, &spec).len(), table.len());
        }
    }

    #[test]
    fn insured_filter_runs_last() {
        let spec = FilterSpec {
            crops: Choice::only(["Maize"]),
            insured: InsuredFilter::No,
            ..Default::default()
        };
        assert_eq!(ids(&apply(&sample_table(), &spec)), vec!["F3", "F5"]);
        assert_eq!(InsuredFilter::parse("Yes"), Some(InsuredFilter::Yes));
        assert_eq!(InsuredFilter::parse("maybe"), None);
    }

    #[test]
    fn apply_is_idempotent_and_leaves_input_alone() {
        let table = sample_table();
        let before = table.clone();
        let specs = [
            FilterSpec::default(),
            FilterSpec {
                countries: Choice::only(["Kenya", "Zambia"]),
                crops: Choice::only(["Maize"]),
                insured: InsuredFilter::Yes,
                ..Default::default()
            },
            FilterSpec {
                regions: Choice::only(["Nakuru", "Oromia"]),
                dates: DateSelection::Range {
                    start: date(2026, 1, 1),
                    end: date(2026, 2, 1),
                },
                ..Default::default()
            },
            FilterSpec {
                countries: Choice::none(),
                ..Default::default()
            },
        ];
        for spec in &specs {
            let once = apply(&table, spec);
            let twice = apply(&once, spec);
            assert_eq!(once, twice, "not idempotent for {spec:?}");
        }
        assert_eq!(table, before);
    }
}

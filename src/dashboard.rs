use crate::alerts::{flagged_regions, DEFAULT_ISSUE_THRESHOLD, DEFAULT_TOP_REGIONS};
use crate::filter::{apply_with_options, FilterOptions, FilterSpec};
use crate::loader::Dataset;
use crate::metrics::summarize;
use crate::reference::{regional_kpis, top_agents, TOP_AGENTS};
use crate::types::{AgentKpiRow, FarmerTable, Metrics, RegionIssueCount, RegionalKpiRow, TableView};
use tracing::info;

/// Everything one interaction produces, as plain values for whatever
/// renders them.
#[derive(Debug, Clone)]
pub struct Dashboard<'a> {
    pub filtered: FarmerTable,
    pub options: FilterOptions,
    pub metrics: Metrics,
    /// Computed over the whole farmer table, not the filtered view.
    pub flagged_regions: Vec<RegionIssueCount>,
    pub regional: TableView<'a, RegionalKpiRow>,
    pub top_agents: TableView<'a, AgentKpiRow>,
}

impl<'a> Dashboard<'a> {
    pub fn compute(dataset: &'a Dataset, spec: &FilterSpec) -> Self {
        let (filtered, options) = apply_with_options(&dataset.farmers, spec);
        let metrics = summarize(&filtered);
        let flagged = flagged_regions(&dataset.farmers, DEFAULT_ISSUE_THRESHOLD, DEFAULT_TOP_REGIONS);
        info!(
            filtered_records = metrics.filtered_records,
            total_farmers = metrics.total_farmers,
            flagged_regions = flagged.len(),
            "dashboard recomputed"
        );
        Dashboard {
            filtered,
            options,
            metrics,
            flagged_regions: flagged,
            regional: regional_kpis(dataset),
            top_agents: top_agents(&dataset.agents, TOP_AGENTS),
        }
    }

    /// `false` when the filters leave no rows; callers show a "no data"
    /// notice instead of charts in that case.
    pub fn has_data(&self) -> bool {
        !self.filtered.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::filter::tests::sample_table;
    use crate::filter::Choice;
    use crate::loader::LoadReport;
    use crate::types::ReferenceTable;

    pub(crate) fn dataset() -> Dataset {
        Dataset {
            farmers: sample_table(),
            regional: ReferenceTable {
                headers: vec![
                    "region".into(),
                    "coverage_rate".into(),
                    "claim_rate".into(),
                    "total_payout".into(),
                ],
                cells: vec![vec!["Nakuru".into(), "66.7".into(), "50.0".into(), "120.0".into()]],
                rows: vec![RegionalKpiRow {
                    region: "Nakuru".into(),
                    coverage_rate: 66.7,
                    claim_rate: 50.0,
                    total_payout: 120.0,
                }],
            },
            agents: ReferenceTable {
                headers: vec!["agent_id".into(), "insured_pct".into(), "claim_pct".into()],
                cells: Vec::new(),
                rows: Vec::new(),
            },
            report: LoadReport::default(),
        }
    }

    #[test]
    fn alert_ignores_the_active_filter() {
        let ds = dataset();
        let everything = Dashboard::compute(&ds, &FilterSpec::default());
        let zambia = Dashboard::compute(
            &ds,
            &FilterSpec {
                countries: Choice::only(["Zambia"]),
                ..Default::default()
            },
        );
        assert_eq!(zambia.filtered.len(), 1);
        assert_eq!(zambia.flagged_regions, everything.flagged_regions);
        assert_eq!(zambia.regional, everything.regional);
    }

    #[test]
    fn unknown_country_is_a_no_data_state() {
        let ds = dataset();
        let d = Dashboard::compute(
            &ds,
            &FilterSpec {
                countries: Choice::only(["Atlantis"]),
                ..Default::default()
            },
        );
        assert!(!d.has_data());
        assert_eq!(d.metrics, Metrics::default());
        assert_eq!(d.regional.len(), 1);
    }
}

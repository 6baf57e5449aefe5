// Pre-aggregated tables shown next to the computed metrics. Nothing here is
// recomputed or re-ranked.
use crate::loader::Dataset;
use crate::types::{AgentKpiRow, ReferenceTable, RegionalKpiRow, TableView};

pub const TOP_AGENTS: usize = 10;

/// Regional KPIs exactly as loaded. They are not narrowed by the active
/// filter and can disagree with the filtered farmer view.
pub fn regional_kpis(dataset: &Dataset) -> TableView<'_, RegionalKpiRow> {
    dataset.regional.view()
}

/// The first `n` agents in upstream rank order.
pub fn top_agents(agents: &ReferenceTable<AgentKpiRow>, n: usize) -> TableView<'_, AgentKpiRow> {
    agents.head(n)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agents(surveyed: impl IntoIterator<Item = u32>) -> ReferenceTable<AgentKpiRow> {
        let mut table = ReferenceTable {
            headers: vec!["agent_id".into(), "farmers_surveyed".into(), "insured_pct".into(), "claim_pct".into()],
            cells: Vec::new(),
            rows: Vec::new(),
        };
        for (i, n) in surveyed.into_iter().enumerate() {
            table.cells.push(vec![format!("A{i}"), n.to_string(), "50.0".into(), "10.0".into()]);
            table.rows.push(AgentKpiRow {
                insured_pct: 50.0,
                claim_pct: 10.0,
            });
        }
        table
    }

    #[test]
    fn takes_a_prefix_without_reranking() {
        // deliberately not sorted: upstream order wins
        let table = agents((0..12).map(|i| i % 4));
        let top = top_agents(&table, TOP_AGENTS);
        assert_eq!(top.len(), 10);
        assert_eq!(top.cells, &table.cells[..10]);
        assert_eq!(top.cells[3][1], "3");
        assert_eq!(top.cells[4][1], "0");
    }

    #[test]
    fn short_lists_come_back_whole() {
        let table = agents([3, 1]);
        assert_eq!(top_agents(&table, TOP_AGENTS), table.view());
        assert!(top_agents(&agents([]), TOP_AGENTS).is_empty());
    }
}

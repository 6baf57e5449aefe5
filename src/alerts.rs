use crate::types::{FarmerTable, RegionIssueCount};
use std::collections::HashMap;
use tracing::debug;

pub const DEFAULT_ISSUE_THRESHOLD: u32 = 2;
pub const DEFAULT_TOP_REGIONS: usize = 5;

/// Regions with the most records carrying more than `threshold` data
/// quality issues, busiest first.
///
/// Meant to run on the full, unfiltered table. Ties keep the order in which
/// regions were first seen. An empty result means there is nothing to flag,
/// including when the table has no `total_issues` column.
pub fn flagged_regions(table: &FarmerTable, threshold: u32, top_n: usize) -> Vec<RegionIssueCount> {
    if !table.tracks_issues() {
        debug!("no total_issues column; skipping data quality alert");
        return Vec::new();
    }

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for r in &table.records {
        if r.total_issues.is_some_and(|n| n > threshold) {
            let e = counts.entry(r.region.as_str()).or_insert_with(|| {
                order.push(r.region.as_str());
                0
            });
            *e += 1;
        }
    }

    let mut flagged: Vec<RegionIssueCount> = order
        .into_iter()
        .map(|region| RegionIssueCount {
            region: region.to_string(),
            count: counts[region],
        })
        .collect();
    // sort_by is stable, so equal counts stay in encounter order
    flagged.sort_by(|a, b| b.count.cmp(&a.count));
    flagged.truncate(top_n);
    flagged
}

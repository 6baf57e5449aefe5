use crate::types::{FarmerTable, Metrics};
use crate::util::average;
use std::collections::HashSet;

/// Headline numbers for an already filtered table.
///
/// Farmer counts are over distinct `farmer_id`s, not rows. `total_payout`
/// sums the payout column over every row and relies on non-claim rows
/// carrying zero; `avg_payout_per_claim` only looks at claim rows.
pub fn summarize(table: &FarmerTable) -> Metrics {
    let farmers: HashSet<&str> = table
        .records
        .iter()
        .map(|r| r.farmer_id.as_str())
        .collect();
    let insured: HashSet<&str> = table
        .records
        .iter()
        .filter(|r| r.insured.is_yes())
        .map(|r| r.farmer_id.as_str())
        .collect();

    let total_farmers = farmers.len();
    let insured_count = insured.len();
    let coverage_rate = if total_farmers > 0 {
        insured_count as f64 / total_farmers as f64 * 100.0
    } else {
        0.0
    };

    let total_payout: f64 = table
        .records
        .iter()
        .filter_map(|r| r.payout_amount_usd)
        .sum();

    // Empty payout cells on claim rows are skipped, not read as zero.
    let claim_payouts: Vec<f64> = table
        .records
        .iter()
        .filter(|r| r.claim_triggered.is_yes())
        .filter_map(|r| r.payout_amount_usd)
        .collect();

    Metrics {
        filtered_records: table.len(),
        total_farmers,
        insured_count,
        coverage_rate,
        total_payout,
        avg_payout_per_claim: average(&claim_payouts),
    }
}

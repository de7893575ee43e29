use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{ReconciledRecord, ReconciliationOutcome};

/// Record counts at each pipeline stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterStats {
    pub input_rows: usize,
    pub whitelist_ids: usize,
    pub unmapped_whitelist_ids: usize,
    pub after_whitelist: usize,
    pub duplicates_removed: usize,
    pub species_level_skipped: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    #[serde(flatten)]
    pub filter: FilterStats,
    pub reconciled: usize,
    pub lookups: usize,
    pub lookup_failures: usize,
    pub resolved: usize,
    pub inconsistent: usize,
    pub rank_invalid: usize,
    /// Resolved records per acceptance case, rank-invalid per reason.
    pub outcome_counts: BTreeMap<String, usize>,
}

/// Summarize reconciled records on top of the filtering counts.
pub fn compute_summary(filter: FilterStats, reconciled: &[ReconciledRecord]) -> ReconSummary {
    let mut summary = ReconSummary {
        filter,
        reconciled: reconciled.len(),
        ..ReconSummary::default()
    };

    for r in reconciled {
        if r.lookup.query.is_some() {
            summary.lookups += 1;
        }
        if r.lookup.result.error().is_some() {
            summary.lookup_failures += 1;
        }

        let key = match &r.outcome {
            ReconciliationOutcome::Resolved { case, .. } => {
                summary.resolved += 1;
                format!("{case:?}")
            }
            ReconciliationOutcome::Inconsistent => {
                summary.inconsistent += 1;
                "Inconsistent".to_string()
            }
            ReconciliationOutcome::RankInvalid { reason, .. } => {
                summary.rank_invalid += 1;
                format!("{reason:?}")
            }
        };
        *summary.outcome_counts.entry(key).or_insert(0) += 1;
    }

    summary
}

use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::classify::classify;
use crate::config::RunConfig;
use crate::error::ReconError;
use crate::ingest::Whitelist;
use crate::lookup::{lookup_proposed, BackboneLookup, LookupOptions};
use crate::merge::{merge, MergeOutput};
use crate::model::ReconciledRecord;
use crate::proposal::propose_name;
use crate::store::RecordStore;
use crate::summary::{compute_summary, FilterStats, ReconSummary};

/// Number of unmapped whitelist identifiers quoted in the warning.
const UNMAPPED_SAMPLE: usize = 5;

/// Pre-loaded sources for one run.
#[derive(Debug, Clone)]
pub struct ReconInput {
    pub store: RecordStore,
    pub whitelist: Whitelist,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub engine_version: String,
    pub run_at: String,
    pub backbone_url: String,
}

#[derive(Debug, Clone)]
pub struct ReconResult {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub output: MergeOutput,
    /// Working set after filtering, with merged descriptions applied.
    pub store: RecordStore,
    pub reconciled: Vec<ReconciledRecord>,
}

/// Run the reconciliation pipeline over pre-loaded sources.
///
/// Fails only when the whitelist leaves nothing to process. Lookup failures
/// and classification gaps are per-record and end up in the output streams.
pub fn run(
    config: &RunConfig,
    input: ReconInput,
    backbone: &dyn BackboneLookup,
) -> Result<ReconResult, ReconError> {
    let ReconInput { mut store, whitelist } = input;
    let mut stats = FilterStats {
        input_rows: store.len(),
        whitelist_ids: whitelist.len(),
        ..FilterStats::default()
    };

    store.retain(|r| whitelist.contains(&r.process_id));
    stats.after_whitelist = store.len();
    tracing::info!("Rows after filtering by whitelist: {}", stats.after_whitelist);
    if store.is_empty() {
        return Err(ReconError::EmptyWorkingSet);
    }

    stats.unmapped_whitelist_ids = warn_unmapped(&store, &whitelist);
    stats.duplicates_removed = drop_duplicates(&mut store);

    let (skipped, mut working) =
        store.partition(|r| r.matched_rank.trim().eq_ignore_ascii_case("species"));
    stats.species_level_skipped = skipped.len();
    tracing::info!(
        "Species-level records (skipped): {}, records to reconcile: {}",
        skipped.len(),
        working.len()
    );

    let options = LookupOptions::from(&config.backbone);
    let reconciled: Vec<ReconciledRecord> = working
        .iter()
        .map(|record| {
            let proposed = propose_name(record);
            let lookup = lookup_proposed(&proposed, record, &options, backbone);
            let outcome = classify(&proposed, &lookup, record, &config.acceptance);
            tracing::debug!("Row {} ({}): {:?}", record.row_id, record.process_id, outcome);
            ReconciledRecord {
                row_id: record.row_id,
                proposed,
                lookup,
                outcome,
            }
        })
        .collect();

    let output = merge(&mut working, &reconciled, config);
    let summary = compute_summary(stats, &reconciled);

    tracing::info!(
        "Reconciled {} records: {} resolved, {} inconsistent, {} rank-invalid",
        summary.reconciled,
        summary.resolved,
        summary.inconsistent,
        summary.rank_invalid
    );

    Ok(ReconResult {
        meta: ReconMeta {
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
            backbone_url: config.backbone.base_url.clone(),
        },
        summary,
        output,
        store: working,
        reconciled,
    })
}

/// Warn about whitelist identifiers with no metadata row. Returns their count.
fn warn_unmapped(store: &RecordStore, whitelist: &Whitelist) -> usize {
    let present: HashSet<&str> = store.iter().map(|r| r.process_id.as_str()).collect();
    let unmapped: Vec<&str> = whitelist
        .ids()
        .iter()
        .map(|id| id.as_str())
        .filter(|id| !present.contains(id))
        .collect();

    if !unmapped.is_empty() {
        let sample: Vec<&str> = unmapped.iter().take(UNMAPPED_SAMPLE).copied().collect();
        tracing::warn!(
            "{} whitelist IDs not found in metadata, e.g. {}",
            unmapped.len(),
            sample.join(", ")
        );
    }
    unmapped.len()
}

/// Keep the first row per process ID. Returns the number of rows dropped.
fn drop_duplicates(store: &mut RecordStore) -> usize {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for r in store.iter() {
        *counts.entry(r.process_id.clone()).or_insert(0) += 1;
    }

    let mut dupes: Vec<(&String, &usize)> = counts.iter().filter(|(_, n)| **n > 1).collect();
    if dupes.is_empty() {
        return 0;
    }
    dupes.sort();
    tracing::warn!("Found {} duplicate process IDs, keeping first occurrence", dupes.len());
    for (id, n) in &dupes {
        tracing::warn!("  {id}: {n} occurrences");
    }

    let before = store.len();
    let mut seen = HashSet::new();
    store.retain(|r| seen.insert(r.process_id.clone()));
    let removed = before - store.len();
    tracing::info!("Rows after removing duplicates: {}", store.len());
    removed
}

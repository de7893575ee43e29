use serde::Serialize;

use crate::config::RunConfig;
use crate::ingest::render_identifier;
use crate::model::{
    normalize_description, AcceptanceCase, ReconciledRecord, ReconciliationOutcome, RowId,
};
use crate::store::RecordStore;

/// Leading columns of the resolved stream, in the authority's request layout.
pub const REQUEST_COLUMNS: [&str; 5] = ["proposed_name", "name_type", "host", "project_id", "description"];

// ---------------------------------------------------------------------------
// Output rows
// ---------------------------------------------------------------------------

/// A resolved record: request columns plus the original schema.
#[derive(Debug, Clone)]
pub struct ResolvedRow {
    pub row_id: RowId,
    pub proposed_name: String,
    pub name_type: String,
    pub host: String,
    pub project_id: String,
    pub description: String,
    /// Original fields, aligned with [`MergeOutput::resolved_headers`] after
    /// the request columns.
    pub original: Vec<String>,
}

impl ResolvedRow {
    pub fn to_record(&self) -> Vec<String> {
        let mut out = vec![
            self.proposed_name.clone(),
            self.name_type.clone(),
            self.host.clone(),
            self.project_id.clone(),
            self.description.clone(),
        ];
        out.extend(self.original.iter().cloned());
        out
    }
}

/// Audit row for a lookup that failed or matched no acceptance case.
#[derive(Debug, Clone, Serialize)]
pub struct InconsistentRow {
    #[serde(skip)]
    pub row_id: RowId,
    pub process_id: String,
    pub proposed_name: String,
    pub name_type: String,
    pub query_name: String,
    pub query_rank: String,
    #[serde(rename = "scientificName")]
    pub scientific_name: Option<String>,
    pub status: Option<String>,
    pub confidence: Option<u8>,
    #[serde(rename = "matchType")]
    pub match_type: Option<String>,
    pub rank: Option<String>,
    pub order: Option<String>,
    pub class: Option<String>,
    #[serde(rename = "usageKey")]
    pub usage_key: Option<u64>,
    #[serde(rename = "genusKey")]
    pub genus_key: Option<u64>,
    #[serde(rename = "speciesKey")]
    pub species_key: Option<u64>,
    pub error: Option<String>,
}

/// Audit row for a match that failed order/class cross-validation.
#[derive(Debug, Clone, Serialize)]
pub struct RankInvalidRow {
    #[serde(skip)]
    pub row_id: RowId,
    #[serde(rename = "Process_ID")]
    pub process_id: String,
    pub phylum: String,
    pub class: String,
    pub order: String,
    pub family: String,
    pub genus: String,
    pub species: String,
    pub taxid: String,
    pub matched_rank: String,
    #[serde(rename = "GBIF_class")]
    pub backbone_class: Option<String>,
    #[serde(rename = "GBIF_order")]
    pub backbone_order: Option<String>,
    pub failure_reason: String,
}

impl InconsistentRow {
    pub const HEADERS: [&'static str; 16] = [
        "process_id",
        "proposed_name",
        "name_type",
        "query_name",
        "query_rank",
        "scientificName",
        "status",
        "confidence",
        "matchType",
        "rank",
        "order",
        "class",
        "usageKey",
        "genusKey",
        "speciesKey",
        "error",
    ];
}

impl RankInvalidRow {
    pub const HEADERS: [&'static str; 12] = [
        "Process_ID",
        "phylum",
        "class",
        "order",
        "family",
        "genus",
        "species",
        "taxid",
        "matched_rank",
        "GBIF_class",
        "GBIF_order",
        "failure_reason",
    ];
}

/// The three disjoint output streams, each in input order.
#[derive(Debug, Clone, Default)]
pub struct MergeOutput {
    pub resolved_headers: Vec<String>,
    pub resolved: Vec<ResolvedRow>,
    pub inconsistent: Vec<InconsistentRow>,
    pub rank_invalid: Vec<RankInvalidRow>,
}

impl MergeOutput {
    pub fn row_ids(&self) -> Vec<RowId> {
        self.resolved
            .iter()
            .map(|r| r.row_id)
            .chain(self.inconsistent.iter().map(|r| r.row_id))
            .chain(self.rank_invalid.iter().map(|r| r.row_id))
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Merge
// ---------------------------------------------------------------------------

/// Append `reference` to a description unless it is already there.
///
/// Missing-value spellings count as empty; the separator is one space.
pub fn append_reference(current: &str, reference: &str) -> String {
    let current = normalize_description(current);
    if current.split_whitespace().any(|token| token == reference) {
        return current;
    }
    if current.is_empty() {
        reference.to_string()
    } else {
        format!("{current} {reference}")
    }
}

/// Apply all outcomes to the store in one pass and partition the records.
///
/// Rows are emitted in `RowId` order regardless of the order of
/// `reconciled`. Only resolved records are written to; running the merge a
/// second time over the same outcomes leaves descriptions unchanged.
pub fn merge(store: &mut RecordStore, reconciled: &[ReconciledRecord], config: &RunConfig) -> MergeOutput {
    let description_column = config.columns.description.as_str();
    let kept: Vec<usize> = store
        .headers()
        .iter()
        .enumerate()
        .filter(|(_, h)| h.as_str() != description_column && !REQUEST_COLUMNS.contains(&h.as_str()))
        .map(|(i, _)| i)
        .collect();

    let mut out = MergeOutput {
        resolved_headers: REQUEST_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(kept.iter().map(|&i| store.headers()[i].clone()))
            .collect(),
        ..MergeOutput::default()
    };

    let mut ordered: Vec<&ReconciledRecord> = reconciled.iter().collect();
    ordered.sort_by_key(|r| r.row_id);

    for item in ordered {
        let Some(record) = store.get_mut(item.row_id) else {
            tracing::warn!("Row {} not found in record store - skipping", item.row_id);
            continue;
        };

        match &item.outcome {
            ReconciliationOutcome::Resolved { case, key } => {
                if *case != AcceptanceCase::NotCollected {
                    match key {
                        Some(key) => {
                            let reference = format!("{}{}", config.request.reference_base, key);
                            let updated = append_reference(record.description(), &reference);
                            tracing::info!(
                                "Updated description for {} with key {}",
                                record.process_id,
                                key
                            );
                            record.set_description(updated);
                        }
                        None => tracing::warn!(
                            "Accepted match for {} carries no key - description left unchanged",
                            record.process_id
                        ),
                    }
                }
                record.set_project_id(config.request.project_id.clone());

                out.resolved.push(ResolvedRow {
                    row_id: item.row_id,
                    proposed_name: item.proposed.text.clone(),
                    name_type: item.proposed.name_type.as_str().to_string(),
                    host: config.request.host.clone(),
                    project_id: record.project_id().to_string(),
                    description: record.description().to_string(),
                    original: kept
                        .iter()
                        .map(|&i| record.raw.get(i).cloned().unwrap_or_default())
                        .collect(),
                });
            }
            ReconciliationOutcome::Inconsistent => {
                let query = item.lookup.query.as_ref();
                let m = item.lookup.result.matched();
                out.inconsistent.push(InconsistentRow {
                    row_id: item.row_id,
                    process_id: record.process_id.clone(),
                    proposed_name: item.proposed.text.clone(),
                    name_type: item.proposed.name_type.as_str().to_string(),
                    query_name: query.map(|q| q.name.clone()).unwrap_or_default(),
                    query_rank: query
                        .and_then(|q| q.rank.as_ref())
                        .map(|r| r.as_str().to_string())
                        .unwrap_or_default(),
                    scientific_name: m.and_then(|m| m.scientific_name.clone()),
                    status: m.and_then(|m| m.status.as_ref()).map(|s| s.as_str().to_string()),
                    confidence: m.and_then(|m| m.confidence),
                    match_type: m
                        .and_then(|m| m.match_type.as_ref())
                        .map(|t| t.as_str().to_string()),
                    rank: m.and_then(|m| m.rank.as_ref()).map(|r| r.as_str().to_string()),
                    order: m.and_then(|m| m.order.clone()),
                    class: m.and_then(|m| m.class.clone()),
                    usage_key: m.and_then(|m| m.usage_key),
                    genus_key: m.and_then(|m| m.genus_key),
                    species_key: m.and_then(|m| m.species_key),
                    error: item.lookup.result.error().map(|e| e.to_string()),
                });
            }
            ReconciliationOutcome::RankInvalid {
                reason,
                returned_order,
                returned_class,
            } => {
                let t = &record.taxonomy;
                out.rank_invalid.push(RankInvalidRow {
                    row_id: item.row_id,
                    process_id: record.process_id.clone(),
                    phylum: t.phylum.clone(),
                    class: t.class.clone(),
                    order: t.order.clone(),
                    family: t.family.clone(),
                    genus: t.genus.clone(),
                    species: t.species.clone(),
                    taxid: render_identifier(&record.taxid),
                    matched_rank: record.matched_rank.clone(),
                    backbone_class: returned_class.clone(),
                    backbone_order: returned_order.clone(),
                    failure_reason: reason.to_string(),
                });
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        BackboneMatch, LookupError, LookupOutcome, MatchResult, NameQuery, NameType, ProposedName,
        Rank, RankFailure, SpecimenRecord, TaxonStatus, Taxonomy,
    };

    fn store() -> RecordStore {
        let mut store = RecordStore::new(vec![
            "Process ID".into(),
            "description".into(),
            "taxid".into(),
        ]);
        for (i, pid) in ["P0", "P1", "P2", "P3"].iter().enumerate() {
            store.insert(
                SpecimenRecord::new(
                    RowId(i),
                    *pid,
                    Taxonomy {
                        order: "Hymenoptera".into(),
                        class: "Insecta".into(),
                        genus: "Apis".into(),
                        ..Taxonomy::default()
                    },
                )
                .with_taxid("7459")
                .with_description(if i == 1 { "NaN" } else { "" })
                .with_raw(vec![pid.to_string(), String::new(), "7459".into()]),
            );
        }
        store
    }

    fn item(row: usize, text: &str, outcome: ReconciliationOutcome) -> ReconciledRecord {
        ReconciledRecord {
            row_id: RowId(row),
            proposed: ProposedName {
                text: text.into(),
                name_type: NameType::NovelSpecies,
                source_row_id: RowId(row),
            },
            lookup: LookupOutcome {
                query: Some(NameQuery {
                    name: "Apis".into(),
                    rank: Some(Rank::Genus),
                    kingdom: None,
                    family: None,
                }),
                result: MatchResult::Matched(BackboneMatch {
                    status: Some(TaxonStatus::Accepted),
                    confidence: Some(92),
                    rank: Some(Rank::Genus),
                    order: Some("Diptera".into()),
                    genus_key: Some(1334757),
                    ..BackboneMatch::default()
                }),
            },
            outcome,
        }
    }

    fn outcomes() -> Vec<ReconciledRecord> {
        vec![
            // Deliberately out of order.
            item(
                2,
                "Apis sp. P2",
                ReconciliationOutcome::RankInvalid {
                    reason: RankFailure::NoOrderOrClassMatch,
                    returned_order: Some("Diptera".into()),
                    returned_class: Some("Insecta".into()),
                },
            ),
            item(
                1,
                "Apis sp. P1",
                ReconciliationOutcome::Resolved {
                    case: AcceptanceCase::GenusLevel,
                    key: Some(1334757),
                },
            ),
            item(
                0,
                "not collected",
                ReconciliationOutcome::Resolved {
                    case: AcceptanceCase::NotCollected,
                    key: None,
                },
            ),
            item(3, "Apis sp. P3", ReconciliationOutcome::Inconsistent),
        ]
    }

    #[test]
    fn partitions_in_row_order() {
        let mut store = store();
        let out = merge(&mut store, &outcomes(), &RunConfig::default());

        assert_eq!(
            out.resolved.iter().map(|r| r.row_id).collect::<Vec<_>>(),
            vec![RowId(0), RowId(1)]
        );
        assert_eq!(out.inconsistent.len(), 1);
        assert_eq!(out.rank_invalid.len(), 1);

        let mut all = out.row_ids();
        all.sort();
        assert_eq!(all, vec![RowId(0), RowId(1), RowId(2), RowId(3)]);
    }

    #[test]
    fn genus_reference_appended_to_nan_description() {
        let mut store = store();
        let out = merge(&mut store, &outcomes(), &RunConfig::default());

        let resolved = &out.resolved[1];
        assert_eq!(resolved.description, "https://www.gbif.org/species/1334757");
        assert_eq!(resolved.project_id, "BGE");
        assert_eq!(
            store.get(RowId(1)).unwrap().description(),
            "https://www.gbif.org/species/1334757"
        );
    }

    #[test]
    fn not_collected_and_rejected_rows_untouched() {
        let mut store = store();
        let out = merge(&mut store, &outcomes(), &RunConfig::default());

        assert_eq!(out.resolved[0].description, "");
        assert_eq!(store.get(RowId(2)).unwrap().description(), "");
        assert_eq!(store.get(RowId(3)).unwrap().description(), "");
        assert_eq!(store.get(RowId(3)).unwrap().project_id(), "");
    }

    #[test]
    fn merge_twice_does_not_duplicate_reference() {
        let mut store = store();
        let config = RunConfig::default();
        merge(&mut store, &outcomes(), &config);
        let second = merge(&mut store, &outcomes(), &config);

        assert_eq!(second.resolved[1].description, "https://www.gbif.org/species/1334757");
    }

    #[test]
    fn resolved_headers_supersede_description_column() {
        let mut store = store();
        let out = merge(&mut store, &outcomes(), &RunConfig::default());

        assert_eq!(
            out.resolved_headers,
            vec!["proposed_name", "name_type", "host", "project_id", "description", "Process ID", "taxid"]
        );
        assert_eq!(
            out.resolved[1].to_record(),
            vec![
                "Apis sp. P1",
                "novel_species",
                "",
                "BGE",
                "https://www.gbif.org/species/1334757",
                "P1",
                "7459"
            ]
        );
    }

    #[test]
    fn rank_invalid_row_carries_both_taxonomies() {
        let mut store = store();
        let out = merge(&mut store, &outcomes(), &RunConfig::default());
        let row = &out.rank_invalid[0];
        assert_eq!(row.process_id, "P2");
        assert_eq!(row.order, "Hymenoptera");
        assert_eq!(row.backbone_order.as_deref(), Some("Diptera"));
        assert_eq!(row.failure_reason, "No match at order or class level");
    }

    #[test]
    fn inconsistent_row_carries_error() {
        let mut store = store();
        let mut items = outcomes();
        items[3].lookup.result = MatchResult::Failed(LookupError::Transport("timed out".into()));
        let out = merge(&mut store, &items, &RunConfig::default());
        let row = &out.inconsistent[0];
        assert_eq!(row.query_name, "Apis");
        assert_eq!(row.query_rank, "GENUS");
        assert_eq!(row.status, None);
        assert_eq!(row.error.as_deref(), Some("transport error: timed out"));
    }

    fn serialized_header<T: Serialize>(row: &T) -> Vec<String> {
        let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
        writer.serialize(row).unwrap();
        let bytes = writer.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let header = text.lines().next().unwrap().to_string();
        header.split(',').map(str::to_string).collect()
    }

    #[test]
    fn header_constants_match_serialized_fields() {
        let mut store = store();
        let out = merge(&mut store, &outcomes(), &RunConfig::default());
        assert_eq!(serialized_header(&out.inconsistent[0]), InconsistentRow::HEADERS);
        assert_eq!(serialized_header(&out.rank_invalid[0]), RankInvalidRow::HEADERS);
    }

    #[test]
    fn append_reference_cases() {
        assert_eq!(append_reference("", "ref"), "ref");
        assert_eq!(append_reference("nan", "ref"), "ref");
        assert_eq!(append_reference("note", "ref"), "note ref");
        assert_eq!(append_reference("note ref", "ref"), "note ref");
        assert_eq!(append_reference("note ref2", "ref"), "note ref2 ref");
    }
}

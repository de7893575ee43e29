use std::cell::RefCell;
use std::collections::HashMap;

use taxreq_recon::config::RunConfig;
use taxreq_recon::engine::{run, ReconInput, ReconResult};
use taxreq_recon::ingest::{load_specimens, load_whitelist};
use taxreq_recon::lookup::BackboneLookup;
use taxreq_recon::model::{
    BackboneMatch, LookupError, MatchType, NameQuery, Rank, RowId, TaxonStatus,
};

const METADATA: &str = "\
Process ID,phylum,class,order,family,genus,species,taxid,matched_rank,description
P001,Arthropoda,Insecta,Hymenoptera,Apidae,Apis,Apis mellifera,7460.0,genus,voucher A
P002,Arthropoda,Insecta,Hymenoptera,Apidae,Bombus,not collected,28641,genus,nan
P003,Arthropoda,Insecta,Diptera,not collected,not collected,not collected,7147,order,
P004,Arthropoda,Arachnida,Araneae,Muscidae,Musca,not collected,7370,genus,
P005,Arthropoda,Insecta,Hymenoptera,Vespidae,Vespa,Vespa crabro,7445,family,
P006,Arthropoda,Insecta,Hymenoptera,Apidae,Apis,Apis cerana,7461,Species,
P007,Arthropoda,Insecta,Hymenoptera,Apidae,Apis,Apis dorsata,7462,genus,
";

const SAMPLES: &str = "\
ID
P001
P002
P003
P004
P005
P006
P999
";

/// Canned backbone keyed by query name. Unknown names are a 404.
struct FakeBackbone {
    answers: HashMap<String, BackboneMatch>,
    calls: RefCell<Vec<NameQuery>>,
}

impl FakeBackbone {
    fn new() -> Self {
        let mut answers = HashMap::new();
        answers.insert(
            "Apis mellifera".to_string(),
            BackboneMatch {
                scientific_name: Some("Apis mellifera Linnaeus, 1758".into()),
                status: Some(TaxonStatus::Accepted),
                confidence: Some(98),
                match_type: Some(MatchType::Exact),
                rank: Some(Rank::Species),
                order: Some("Hymenoptera".into()),
                class: Some("Insecta".into()),
                usage_key: Some(1341976),
                genus_key: Some(1334757),
                species_key: Some(1341976),
            },
        );
        answers.insert(
            "Bombus".to_string(),
            BackboneMatch {
                scientific_name: Some("Bombus Latreille, 1802".into()),
                status: Some(TaxonStatus::Accepted),
                confidence: Some(94),
                match_type: Some(MatchType::Exact),
                rank: Some(Rank::Genus),
                order: Some("Hymenoptera".into()),
                class: Some("Insecta".into()),
                usage_key: Some(1340278),
                genus_key: Some(1340278),
                species_key: None,
            },
        );
        answers.insert(
            "Musca".to_string(),
            BackboneMatch {
                scientific_name: Some("Musca Linnaeus, 1758".into()),
                status: Some(TaxonStatus::Accepted),
                confidence: Some(97),
                match_type: Some(MatchType::Exact),
                rank: Some(Rank::Genus),
                order: Some("Diptera".into()),
                class: Some("Insecta".into()),
                usage_key: Some(1529178),
                genus_key: Some(1529178),
                species_key: None,
            },
        );
        answers.insert(
            "Vespa crabro".to_string(),
            BackboneMatch {
                scientific_name: Some("Vespa crabro Linnaeus, 1758".into()),
                status: Some(TaxonStatus::Synonym),
                confidence: Some(99),
                match_type: Some(MatchType::Exact),
                rank: Some(Rank::Species),
                order: Some("Hymenoptera".into()),
                class: Some("Insecta".into()),
                usage_key: Some(1311418),
                ..BackboneMatch::default()
            },
        );
        Self {
            answers,
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl BackboneLookup for FakeBackbone {
    fn match_name(&self, query: &NameQuery) -> Result<BackboneMatch, LookupError> {
        self.calls.borrow_mut().push(query.clone());
        self.answers.get(&query.name).cloned().ok_or(LookupError::Http {
            status: 404,
            message: "not found".into(),
        })
    }
}

fn run_fixture(backbone: &FakeBackbone) -> ReconResult {
    let config = RunConfig::default();
    let store = load_specimens(METADATA, b',', &config.columns).unwrap();
    let whitelist = load_whitelist(SAMPLES, b',', &config.columns).unwrap();
    run(&config, ReconInput { store, whitelist }, backbone).unwrap()
}

#[test]
fn streams_partition_the_working_set() {
    let backbone = FakeBackbone::new();
    let result = run_fixture(&backbone);

    let resolved: Vec<_> = result.output.resolved.iter().map(|r| r.row_id).collect();
    let inconsistent: Vec<_> = result.output.inconsistent.iter().map(|r| r.row_id).collect();
    let rank_invalid: Vec<_> = result.output.rank_invalid.iter().map(|r| r.row_id).collect();

    assert_eq!(resolved, vec![RowId(0), RowId(1), RowId(2)]);
    assert_eq!(rank_invalid, vec![RowId(3)]);
    assert_eq!(inconsistent, vec![RowId(4)]);

    assert_eq!(result.summary.filter.input_rows, 7);
    assert_eq!(result.summary.filter.after_whitelist, 6);
    assert_eq!(result.summary.filter.unmapped_whitelist_ids, 1);
    assert_eq!(result.summary.filter.species_level_skipped, 1);
    assert_eq!(result.summary.reconciled, 5);
}

#[test]
fn not_collected_record_skips_backbone() {
    let backbone = FakeBackbone::new();
    run_fixture(&backbone);

    let names: Vec<String> = backbone.calls.borrow().iter().map(|q| q.name.clone()).collect();
    assert_eq!(names, vec!["Apis mellifera", "Bombus", "Musca", "Vespa crabro"]);
    assert_eq!(backbone.calls.borrow()[1].rank, Some(Rank::Genus));
}

#[test]
fn resolved_rows_carry_references_and_project() {
    let backbone = FakeBackbone::new();
    let result = run_fixture(&backbone);
    let rows = &result.output.resolved;

    assert_eq!(rows[0].proposed_name, "Apis mellifera");
    assert_eq!(rows[0].name_type, "published_name");
    assert_eq!(
        rows[0].description,
        "voucher A https://www.gbif.org/species/1341976"
    );
    assert_eq!(rows[1].proposed_name, "Bombus sp. P002");
    assert_eq!(rows[1].name_type, "novel_species");
    assert_eq!(rows[1].description, "https://www.gbif.org/species/1340278");
    assert_eq!(rows[2].proposed_name, "not collected");
    assert_eq!(rows[2].name_type, "not_collected");
    assert_eq!(rows[2].description, "");
    assert!(rows.iter().all(|r| r.project_id == "BGE"));

    // Taxid rendered without the trailing fraction.
    let taxid_col = result
        .output
        .resolved_headers
        .iter()
        .position(|h| h == "taxid")
        .unwrap();
    assert_eq!(rows[0].to_record()[taxid_col], "7460");
}

#[test]
fn rejected_rows_keep_their_descriptions() {
    let backbone = FakeBackbone::new();
    let result = run_fixture(&backbone);

    assert_eq!(result.store.get(RowId(3)).unwrap().description(), "");
    assert_eq!(result.store.get(RowId(4)).unwrap().description(), "");

    let invalid = &result.output.rank_invalid[0];
    assert_eq!(invalid.process_id, "P004");
    assert_eq!(invalid.backbone_order.as_deref(), Some("Diptera"));
    assert_eq!(invalid.failure_reason, "No match at order or class level");

    let inconsistent = &result.output.inconsistent[0];
    assert_eq!(inconsistent.process_id, "P005");
    assert_eq!(inconsistent.status.as_deref(), Some("SYNONYM"));
    assert_eq!(inconsistent.error, None);
}

#[test]
fn unknown_name_is_isolated_failure() {
    let mut backbone = FakeBackbone::new();
    backbone.answers.remove("Bombus");
    let result = run_fixture(&backbone);

    assert_eq!(result.output.resolved.len(), 2);
    assert_eq!(result.output.inconsistent.len(), 2);
    assert_eq!(
        result.output.inconsistent[0].error.as_deref(),
        Some("HTTP 404: not found")
    );
    assert_eq!(result.summary.lookup_failures, 1);
}

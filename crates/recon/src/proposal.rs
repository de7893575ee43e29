use crate::model::{is_valid_taxon, NameType, ProposedName, SpecimenRecord, NOT_COLLECTED, SP_MARKER};

/// Propose a submission name for a record.
///
/// Fallback order is species, then `"{genus} sp. {process_id}"`, then
/// `"{family} sp. {process_id}"`, then the `"not collected"` sentinel.
pub fn propose_name(record: &SpecimenRecord) -> ProposedName {
    let text = proposed_text(record);
    let name_type = determine_name_type(&text, &record.taxonomy.species);

    tracing::debug!(
        "Processing: ID={}, proposed={}, name_type={}",
        record.process_id,
        text,
        name_type
    );
    if name_type == NameType::Unclassified {
        tracing::warn!(
            "No name type could be assigned to '{}' ({}); it will fail species-level acceptance",
            text,
            record.process_id
        );
    }

    ProposedName {
        text,
        name_type,
        source_row_id: record.row_id,
    }
}

fn proposed_text(record: &SpecimenRecord) -> String {
    let t = &record.taxonomy;
    let process_id = record.process_id.trim();

    if is_valid_taxon(&t.species) {
        t.species.trim().to_string()
    } else if is_valid_taxon(&t.genus) {
        format!("{} {SP_MARKER} {process_id}", t.genus.trim())
    } else if is_valid_taxon(&t.family) {
        format!("{} {SP_MARKER} {process_id}", t.family.trim())
    } else {
        NOT_COLLECTED.to_string()
    }
}

/// Name type from the proposed text and the record's original species field.
pub fn determine_name_type(text: &str, original_species: &str) -> NameType {
    let text = text.trim();
    let original = original_species.trim().to_lowercase();

    if text.eq_ignore_ascii_case(NOT_COLLECTED) {
        return NameType::NotCollected;
    }
    if text.contains(SP_MARKER) {
        return NameType::NovelSpecies;
    }
    if original == NOT_COLLECTED && text != original {
        return NameType::NovelSpecies;
    }
    if text.split_whitespace().count() >= 2 {
        NameType::PublishedName
    } else {
        NameType::Unclassified
    }
}

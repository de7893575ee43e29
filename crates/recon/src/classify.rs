use crate::config::AcceptanceConfig;
use crate::model::{
    AcceptanceCase, BackboneMatch, LookupOutcome, MatchType, ProposedName, Rank, RankFailure,
    ReconciliationOutcome, SpecimenRecord, TaxonStatus, Taxonomy, SP_MARKER,
};

/// Classify one lookup under the acceptance rules.
///
/// Cases, first hit wins:
/// 1. not-collected pass-through (`NOT_COLLECTED` + `NONE`)
/// 2. species level: binomial without `sp.`, confidence above the species
///    floor, `ACCEPTED`, `EXACT`
/// 3. genus level: `sp.` name, `ACCEPTED`, rank `GENUS`, confidence above the
///    genus floor
///
/// Cases 2 and 3 must also pass [`cross_validate`]. Failed lookups and
/// matches missing any required field are `Inconsistent`.
pub fn classify(
    proposed: &ProposedName,
    lookup: &LookupOutcome,
    record: &SpecimenRecord,
    acceptance: &AcceptanceConfig,
) -> ReconciliationOutcome {
    let Some(m) = lookup.result.matched() else {
        return ReconciliationOutcome::Inconsistent;
    };

    if is_not_collected(m) {
        return ReconciliationOutcome::Resolved {
            case: AcceptanceCase::NotCollected,
            key: None,
        };
    }

    let Some(case) = acceptance_case(&proposed.text, m, acceptance) else {
        return ReconciliationOutcome::Inconsistent;
    };

    match cross_validate(m, &record.taxonomy) {
        Ok(()) => ReconciliationOutcome::Resolved {
            case,
            key: reference_key(case, m),
        },
        Err(reason) => {
            tracing::info!(
                "Taxonomic validation failed for {}: {} (order: original {}, backbone {}; class: original {}, backbone {})",
                record.process_id,
                reason,
                record.taxonomy.order,
                m.order.as_deref().unwrap_or("none"),
                record.taxonomy.class,
                m.class.as_deref().unwrap_or("none"),
            );
            ReconciliationOutcome::RankInvalid {
                reason,
                returned_order: m.order.clone(),
                returned_class: m.class.clone(),
            }
        }
    }
}

fn is_not_collected(m: &BackboneMatch) -> bool {
    m.status == Some(TaxonStatus::NotCollected) && m.match_type == Some(MatchType::NoMatch)
}

fn confidence_above(m: &BackboneMatch, floor: u8) -> bool {
    m.confidence.is_some_and(|c| c > floor)
}

fn is_binomial(text: &str) -> bool {
    text.split_whitespace().count() >= 2 && !text.to_lowercase().contains(SP_MARKER)
}

/// Which acceptance case (2 or 3) a match satisfies, if any.
pub fn acceptance_case(
    text: &str,
    m: &BackboneMatch,
    acceptance: &AcceptanceConfig,
) -> Option<AcceptanceCase> {
    let accepted = m.status == Some(TaxonStatus::Accepted);

    if is_binomial(text)
        && accepted
        && confidence_above(m, acceptance.species_min_confidence)
        && m.match_type == Some(MatchType::Exact)
    {
        return Some(AcceptanceCase::SpeciesLevel);
    }

    if text.contains(SP_MARKER)
        && accepted
        && m.rank == Some(Rank::Genus)
        && confidence_above(m, acceptance.genus_min_confidence)
    {
        return Some(AcceptanceCase::GenusLevel);
    }

    None
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Compare returned order/class against the record's own classification.
///
/// Both ranks must be present in the match. An order match is enough;
/// otherwise the class must match.
pub fn cross_validate(m: &BackboneMatch, original: &Taxonomy) -> Result<(), RankFailure> {
    let (Some(order), Some(class)) = (present(&m.order), present(&m.class)) else {
        return Err(RankFailure::MissingRanks);
    };

    if original.order.trim() == order {
        tracing::debug!("Order match found ({order})");
        Ok(())
    } else if original.class.trim() == class {
        tracing::debug!("Class match found ({class})");
        Ok(())
    } else {
        Err(RankFailure::NoOrderOrClassMatch)
    }
}

/// Genus-level matches reference the genus (falling back to the usage key),
/// species-level matches the usage key.
fn reference_key(case: AcceptanceCase, m: &BackboneMatch) -> Option<u64> {
    match case {
        AcceptanceCase::GenusLevel => m.genus_key.or(m.usage_key),
        AcceptanceCase::SpeciesLevel => m.usage_key,
        AcceptanceCase::NotCollected => None,
    }
}

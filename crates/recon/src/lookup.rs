//! Dispatch of proposed names to a backbone name-matching service.
//!
//! The service itself sits behind [`BackboneLookup`]; the HTTP
//! implementation lives in `taxreq-backbone`. This module decides what to
//! ask (or whether to ask at all) and turns every failure into a value.

use crate::config::BackboneConfig;
use crate::model::{
    is_valid_taxon, BackboneMatch, LookupError, LookupOutcome, MatchResult, NameQuery, NameType,
    ProposedName, Rank, SpecimenRecord, SP_MARKER,
};

/// A name-resolution authority.
pub trait BackboneLookup {
    fn match_name(&self, query: &NameQuery) -> Result<BackboneMatch, LookupError>;
}

impl<T: BackboneLookup + ?Sized> BackboneLookup for &T {
    fn match_name(&self, query: &NameQuery) -> Result<BackboneMatch, LookupError> {
        (**self).match_name(query)
    }
}

/// Per-run query decorations.
#[derive(Debug, Clone, Default)]
pub struct LookupOptions {
    pub kingdom: Option<String>,
    pub family_hint: bool,
}

impl From<&BackboneConfig> for LookupOptions {
    fn from(config: &BackboneConfig) -> Self {
        Self {
            kingdom: config.kingdom.clone().filter(|k| !k.trim().is_empty()),
            family_hint: config.family_hint,
        }
    }
}

/// The query for a proposed name, or `None` when no lookup should happen.
///
/// Names carrying the `sp.` marker are reduced to the text before the marker
/// and queried at genus rank.
pub fn build_query(
    proposed: &ProposedName,
    record: &SpecimenRecord,
    options: &LookupOptions,
) -> Option<NameQuery> {
    if proposed.name_type == NameType::NotCollected {
        return None;
    }

    let mut query = if proposed.has_sp_marker() {
        let genus = proposed.text.split(SP_MARKER).next().unwrap_or("").trim();
        let mut q = NameQuery::new(genus);
        q.rank = Some(Rank::Genus);
        if options.family_hint && is_valid_taxon(&record.taxonomy.family) {
            q.family = Some(record.taxonomy.family.trim().to_string());
        }
        q
    } else {
        NameQuery::new(proposed.text.trim())
    };
    query.kingdom = options.kingdom.clone();
    Some(query)
}

/// Resolve one proposed name. Never fails: service errors come back as
/// [`MatchResult::Failed`].
pub fn lookup_proposed(
    proposed: &ProposedName,
    record: &SpecimenRecord,
    options: &LookupOptions,
    backbone: &dyn BackboneLookup,
) -> LookupOutcome {
    let Some(query) = build_query(proposed, record, options) else {
        tracing::info!(
            "Entry {} is 'not collected' - skipping backbone lookup",
            record.process_id
        );
        return LookupOutcome {
            query: None,
            result: MatchResult::Matched(BackboneMatch::not_collected()),
        };
    };

    match query.rank {
        Some(Rank::Genus) => tracing::info!("Performing genus-level search: {}", query.name),
        _ => tracing::info!("Performing standard search: {}", query.name),
    }

    let result = match backbone.match_name(&query) {
        Ok(m) => {
            tracing::info!(
                "Backbone result: scientific name {}, status {}, confidence {}",
                m.scientific_name.as_deref().unwrap_or("none"),
                m.status.as_ref().map(|s| s.as_str()).unwrap_or("unknown"),
                m.confidence.map(|c| c.to_string()).unwrap_or_else(|| "unknown".into()),
            );
            MatchResult::Matched(m)
        }
        Err(e) => {
            tracing::warn!(
                "Error resolving name '{}' for {}: {}",
                query.name,
                record.process_id,
                e
            );
            MatchResult::Failed(e)
        }
    };

    LookupOutcome {
        query: Some(query),
        result,
    }
}

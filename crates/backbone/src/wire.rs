use serde::Deserialize;

use taxreq_recon::model::{BackboneMatch, MatchType, Rank, TaxonStatus};

/// `species/match` response body. Only the documented fields are read;
/// everything else in the payload is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameUsageMatch {
    pub scientific_name: Option<String>,
    pub status: Option<String>,
    pub confidence: Option<u32>,
    pub match_type: Option<String>,
    pub rank: Option<String>,
    pub order: Option<String>,
    pub class: Option<String>,
    pub usage_key: Option<u64>,
    pub genus_key: Option<u64>,
    pub species_key: Option<u64>,
}

impl NameUsageMatch {
    pub fn into_match(self) -> BackboneMatch {
        BackboneMatch {
            scientific_name: self.scientific_name,
            status: self.status.as_deref().map(TaxonStatus::parse),
            confidence: self.confidence.map(|c| c.min(100) as u8),
            match_type: self.match_type.as_deref().map(MatchType::parse),
            rank: self.rank.as_deref().map(Rank::parse),
            order: self.order,
            class: self.class,
            usage_key: self.usage_key,
            genus_key: self.genus_key,
            species_key: self.species_key,
        }
    }
}

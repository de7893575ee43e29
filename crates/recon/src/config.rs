use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Run configuration, normally loaded from an optional `taxreq.toml`.
///
/// Every section is optional; an empty file yields the same behaviour as
/// running without a config at all.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub backbone: BackboneConfig,
    #[serde(default)]
    pub acceptance: AcceptanceConfig,
    #[serde(default)]
    pub columns: ColumnConfig,
    #[serde(default)]
    pub request: RequestConfig,
}

impl RunConfig {
    pub fn from_toml(s: &str) -> Result<Self, ReconError> {
        let config: Self = toml::from_str(s).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let b = &self.backbone;
        if !(b.base_url.starts_with("http://") || b.base_url.starts_with("https://")) {
            return Err(ReconError::ConfigValidation(format!(
                "backbone.base_url must be an http(s) URL, got '{}'",
                b.base_url
            )));
        }
        if b.timeout_secs == 0 {
            return Err(ReconError::ConfigValidation(
                "backbone.timeout_secs must be at least 1".into(),
            ));
        }
        if b.max_retries > 10 {
            return Err(ReconError::ConfigValidation(format!(
                "backbone.max_retries must be at most 10, got {}",
                b.max_retries
            )));
        }

        let a = &self.acceptance;
        for (name, value) in [
            ("species_min_confidence", a.species_min_confidence),
            ("genus_min_confidence", a.genus_min_confidence),
        ] {
            if value > 100 {
                return Err(ReconError::ConfigValidation(format!(
                    "acceptance.{name} must be within 0..=100, got {value}"
                )));
            }
        }

        let c = &self.columns;
        if c.species_aliases.is_empty() {
            return Err(ReconError::ConfigValidation(
                "columns.species_aliases must not be empty".into(),
            ));
        }
        if c.whitelist_id_aliases.is_empty() {
            return Err(ReconError::ConfigValidation(
                "columns.whitelist_id_aliases must not be empty".into(),
            ));
        }
        for (name, value) in [
            ("process_id", &c.process_id),
            ("genus", &c.genus),
            ("family", &c.family),
            ("order", &c.order),
            ("class", &c.class),
            ("matched_rank", &c.matched_rank),
            ("taxid", &c.taxid),
        ] {
            if value.trim().is_empty() {
                return Err(ReconError::ConfigValidation(format!(
                    "columns.{name} must not be empty"
                )));
            }
        }

        if self.request.project_id.trim().is_empty() {
            return Err(ReconError::ConfigValidation(
                "request.project_id must not be empty".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Backbone service
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BackboneConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Attempts after the first one for 429/5xx and network errors.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Attached to every query when set (e.g. "Animalia").
    #[serde(default)]
    pub kingdom: Option<String>,
    /// Attach the record's family to genus-rank queries.
    #[serde(default)]
    pub family_hint: bool,
}

fn default_base_url() -> String {
    "https://api.gbif.org/v1".into()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

impl Default for BackboneConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            kingdom: None,
            family_hint: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Acceptance thresholds
// ---------------------------------------------------------------------------

/// Confidence floors. Both comparisons are strict (`confidence > floor`).
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AcceptanceConfig {
    #[serde(default = "default_species_min_confidence")]
    pub species_min_confidence: u8,
    #[serde(default = "default_genus_min_confidence")]
    pub genus_min_confidence: u8,
}

fn default_species_min_confidence() -> u8 {
    95
}

fn default_genus_min_confidence() -> u8 {
    90
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            species_min_confidence: default_species_min_confidence(),
            genus_min_confidence: default_genus_min_confidence(),
        }
    }
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnConfig {
    #[serde(default = "default_process_id")]
    pub process_id: String,
    /// Candidate names for the species column, first match wins.
    #[serde(default = "default_species_aliases")]
    pub species_aliases: Vec<String>,
    #[serde(default = "default_genus")]
    pub genus: String,
    #[serde(default = "default_family")]
    pub family: String,
    #[serde(default = "default_order")]
    pub order: String,
    #[serde(default = "default_class")]
    pub class: String,
    #[serde(default = "default_matched_rank")]
    pub matched_rank: String,
    #[serde(default = "default_taxid")]
    pub taxid: String,
    /// Optional in the source; empty when absent.
    #[serde(default = "default_phylum")]
    pub phylum: String,
    /// Optional in the source; seeds the record description.
    #[serde(default = "default_description")]
    pub description: String,
    /// Candidate identifier columns in the samples file, first match wins.
    #[serde(default = "default_whitelist_id_aliases")]
    pub whitelist_id_aliases: Vec<String>,
}

fn default_process_id() -> String {
    "Process ID".into()
}

fn default_species_aliases() -> Vec<String> {
    ["Species", "species", "scientific_name", "Scientific_Name", "scientific name"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_genus() -> String {
    "genus".into()
}

fn default_family() -> String {
    "family".into()
}

fn default_order() -> String {
    "order".into()
}

fn default_class() -> String {
    "class".into()
}

fn default_matched_rank() -> String {
    "matched_rank".into()
}

fn default_taxid() -> String {
    "taxid".into()
}

fn default_phylum() -> String {
    "phylum".into()
}

fn default_description() -> String {
    "description".into()
}

fn default_whitelist_id_aliases() -> Vec<String> {
    ["ID", "Process ID", "process_id", "ProcessID", "PROCESS_ID"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for ColumnConfig {
    fn default() -> Self {
        Self {
            process_id: default_process_id(),
            species_aliases: default_species_aliases(),
            genus: default_genus(),
            family: default_family(),
            order: default_order(),
            class: default_class(),
            matched_rank: default_matched_rank(),
            taxid: default_taxid(),
            phylum: default_phylum(),
            description: default_description(),
            whitelist_id_aliases: default_whitelist_id_aliases(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestConfig {
    #[serde(default = "default_project_id")]
    pub project_id: String,
    #[serde(default)]
    pub host: String,
    /// Prefix of the reference appended to descriptions; the key follows it.
    #[serde(default = "default_reference_base")]
    pub reference_base: String,
}

fn default_project_id() -> String {
    "BGE".into()
}

fn default_reference_base() -> String {
    "https://www.gbif.org/species/".into()
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            project_id: default_project_id(),
            host: String::new(),
            reference_base: default_reference_base(),
        }
    }
}

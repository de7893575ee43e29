use std::fmt;

use serde::Serialize;

/// Sentinel used by the source data for "field was not recorded".
pub const NOT_COLLECTED: &str = "not collected";

/// Marker carried by names proposed below species level ("Apis sp. X1").
pub const SP_MARKER: &str = "sp.";

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// Stable row identity: 0-based data-row position in the metadata file.
///
/// Assigned once at ingestion and carried through every stage; filtering
/// never renumbers it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RowId(pub usize);

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Free-text taxonomic fields of a specimen, trimmed at ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Taxonomy {
    pub phylum: String,
    pub class: String,
    pub order: String,
    pub family: String,
    pub genus: String,
    pub species: String,
}

/// One metadata row.
///
/// Everything except `description` and `project_id` is fixed at ingestion.
/// Those two are written only by the merge step.
#[derive(Debug, Clone)]
pub struct SpecimenRecord {
    pub row_id: RowId,
    pub process_id: String,
    pub taxonomy: Taxonomy,
    pub matched_rank: String,
    pub taxid: String,
    /// Every source field in header order, untouched.
    pub raw: Vec<String>,
    description: String,
    project_id: String,
}

impl SpecimenRecord {
    pub fn new(row_id: RowId, process_id: impl Into<String>, taxonomy: Taxonomy) -> Self {
        Self {
            row_id,
            process_id: process_id.into(),
            taxonomy,
            matched_rank: String::new(),
            taxid: String::new(),
            raw: Vec::new(),
            description: String::new(),
            project_id: String::new(),
        }
    }

    pub fn with_matched_rank(mut self, rank: impl Into<String>) -> Self {
        self.matched_rank = rank.into();
        self
    }

    pub fn with_taxid(mut self, taxid: impl Into<String>) -> Self {
        self.taxid = taxid.into();
        self
    }

    pub fn with_raw(mut self, raw: Vec<String>) -> Self {
        self.raw = raw;
        self
    }

    /// Seed the description; NaN spellings and blanks become empty.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = normalize_description(description);
        self
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub(crate) fn set_description(&mut self, description: String) {
        self.description = description;
    }

    pub(crate) fn set_project_id(&mut self, project_id: String) {
        self.project_id = project_id;
    }
}

/// Missing-value spellings produced by spreadsheet and dataframe exports.
pub fn normalize_description(value: &str) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("nan") {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// True when a taxonomic field carries a usable value.
pub fn is_valid_taxon(value: &str) -> bool {
    let v = value.trim();
    !v.is_empty() && !v.eq_ignore_ascii_case(NOT_COLLECTED)
}

// ---------------------------------------------------------------------------
// Proposed names
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NameType {
    PublishedName,
    NovelSpecies,
    NotCollected,
    /// No tier could be assigned. Rendered as an empty string.
    Unclassified,
}

impl NameType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PublishedName => "published_name",
            Self::NovelSpecies => "novel_species",
            Self::NotCollected => "not_collected",
            Self::Unclassified => "",
        }
    }
}

impl fmt::Display for NameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposedName {
    pub text: String,
    pub name_type: NameType,
    pub source_row_id: RowId,
}

impl ProposedName {
    pub fn has_sp_marker(&self) -> bool {
        self.text.contains(SP_MARKER)
    }
}

// ---------------------------------------------------------------------------
// Backbone vocabulary
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxonStatus {
    Accepted,
    Synonym,
    Doubtful,
    /// Synthesized for records that were never sent to the backbone.
    NotCollected,
    Other(String),
}

impl TaxonStatus {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "ACCEPTED" => Self::Accepted,
            "SYNONYM" => Self::Synonym,
            "DOUBTFUL" => Self::Doubtful,
            "NOT_COLLECTED" => Self::NotCollected,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Accepted => "ACCEPTED",
            Self::Synonym => "SYNONYM",
            Self::Doubtful => "DOUBTFUL",
            Self::NotCollected => "NOT_COLLECTED",
            Self::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchType {
    Exact,
    Fuzzy,
    HigherRank,
    /// The backbone's `NONE`.
    NoMatch,
    Other(String),
}

impl MatchType {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "EXACT" => Self::Exact,
            "FUZZY" => Self::Fuzzy,
            "HIGHERRANK" => Self::HigherRank,
            "NONE" => Self::NoMatch,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Exact => "EXACT",
            Self::Fuzzy => "FUZZY",
            Self::HigherRank => "HIGHERRANK",
            Self::NoMatch => "NONE",
            Self::Other(s) => s,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rank {
    Genus,
    Species,
    Family,
    Other(String),
}

impl Rank {
    pub fn parse(s: &str) -> Self {
        match s.trim() {
            "GENUS" => Self::Genus,
            "SPECIES" => Self::Species,
            "FAMILY" => Self::Family,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Genus => "GENUS",
            Self::Species => "SPECIES",
            Self::Family => "FAMILY",
            Self::Other(s) => s,
        }
    }
}

// ---------------------------------------------------------------------------
// Lookup
// ---------------------------------------------------------------------------

/// One name-resolution request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameQuery {
    pub name: String,
    pub rank: Option<Rank>,
    pub kingdom: Option<String>,
    pub family: Option<String>,
}

impl NameQuery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rank: None,
            kingdom: None,
            family: None,
        }
    }
}

/// Documented fields of a backbone match. Any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackboneMatch {
    pub scientific_name: Option<String>,
    pub status: Option<TaxonStatus>,
    pub confidence: Option<u8>,
    pub match_type: Option<MatchType>,
    pub rank: Option<Rank>,
    pub order: Option<String>,
    pub class: Option<String>,
    pub usage_key: Option<u64>,
    pub genus_key: Option<u64>,
    pub species_key: Option<u64>,
}

impl BackboneMatch {
    /// Placeholder for names that are never looked up.
    pub fn not_collected() -> Self {
        Self {
            status: Some(TaxonStatus::NotCollected),
            confidence: Some(100),
            match_type: Some(MatchType::NoMatch),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Connection, timeout, or other transport failure.
    Transport(String),
    /// Non-success HTTP status.
    Http { status: u16, message: String },
    /// Response body was not the expected shape.
    Decode(String),
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Http { status, message } => write!(f, "HTTP {status}: {message}"),
            Self::Decode(msg) => write!(f, "malformed response: {msg}"),
        }
    }
}

impl std::error::Error for LookupError {}

/// Either the match fields or the error, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult {
    Matched(BackboneMatch),
    Failed(LookupError),
}

impl MatchResult {
    pub fn matched(&self) -> Option<&BackboneMatch> {
        match self {
            Self::Matched(m) => Some(m),
            Self::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&LookupError> {
        match self {
            Self::Matched(_) => None,
            Self::Failed(e) => Some(e),
        }
    }
}

/// Result of one lookup attempt. `query` is `None` on the not-collected path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupOutcome {
    pub query: Option<NameQuery>,
    pub result: MatchResult,
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceCase {
    NotCollected,
    SpeciesLevel,
    GenusLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RankFailure {
    MissingRanks,
    NoOrderOrClassMatch,
}

impl fmt::Display for RankFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingRanks => write!(f, "Missing taxonomic ranks in backbone data"),
            Self::NoOrderOrClassMatch => write!(f, "No match at order or class level"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconciliationOutcome {
    /// Accepted. `key` identifies the backbone entry to reference; absent for
    /// not-collected pass-through.
    Resolved { case: AcceptanceCase, key: Option<u64> },
    /// Lookup failed or no acceptance case applied.
    Inconsistent,
    /// Accepted by naming rules but order/class disagree with the record.
    RankInvalid {
        reason: RankFailure,
        returned_order: Option<String>,
        returned_class: Option<String>,
    },
}

/// Everything the pipeline learned about one record, before merging.
#[derive(Debug, Clone)]
pub struct ReconciledRecord {
    pub row_id: RowId,
    pub proposed: ProposedName,
    pub lookup: LookupOutcome,
    pub outcome: ReconciliationOutcome,
}

use std::collections::HashSet;

use crate::config::ColumnConfig;
use crate::error::ReconError;
use crate::model::{RowId, SpecimenRecord, Taxonomy};
use crate::store::RecordStore;

const METADATA: &str = "metadata";
const SAMPLES: &str = "samples";

/// Identifiers to retain, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct Whitelist {
    /// Column the identifiers were read from.
    pub column: String,
    ids: Vec<String>,
    set: HashSet<String>,
}

impl Whitelist {
    pub fn from_ids(column: impl Into<String>, ids: impl IntoIterator<Item = String>) -> Self {
        let mut list = Self {
            column: column.into(),
            ..Self::default()
        };
        for id in ids {
            let id = id.trim().to_string();
            if !id.is_empty() && list.set.insert(id.clone()) {
                list.ids.push(id);
            }
        }
        list
    }

    pub fn contains(&self, id: &str) -> bool {
        self.set.contains(id)
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Render numeric identifiers without a trailing fraction ("1234.0" → "1234").
pub fn render_identifier(value: &str) -> String {
    let trimmed = value.trim();
    if let Some((int_part, frac)) = trimmed.split_once('.') {
        let int_ok = !int_part.is_empty() && int_part.chars().all(|c| c.is_ascii_digit());
        let frac_zero = !frac.is_empty() && frac.chars().all(|c| c == '0');
        if int_ok && frac_zero {
            return int_part.to_string();
        }
    }
    trimmed.to_string()
}

fn read_headers(
    reader: &mut csv::Reader<&[u8]>,
    source: &str,
) -> Result<Vec<String>, ReconError> {
    Ok(reader
        .headers()
        .map_err(|e| ReconError::Parse {
            source: source.into(),
            message: e.to_string(),
        })?
        .iter()
        .map(|h| h.to_string())
        .collect())
}

/// Load the metadata table into a [`RecordStore`]. Row ids are the 0-based
/// data-row positions.
pub fn load_specimens(
    csv_data: &str,
    delimiter: u8,
    columns: &ColumnConfig,
) -> Result<RecordStore, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers = read_headers(&mut reader, METADATA)?;

    let position = |name: &str| headers.iter().position(|h| h == name);
    let required = |name: &str| -> Result<usize, ReconError> {
        position(name).ok_or_else(|| ReconError::MissingColumn {
            source: METADATA.into(),
            column: name.into(),
        })
    };

    let process_idx = position(&columns.process_id).ok_or_else(|| ReconError::MissingJoinKey {
        source: METADATA.into(),
        candidates: vec![columns.process_id.clone()],
    })?;
    let species_idx = columns
        .species_aliases
        .iter()
        .find_map(|alias| position(alias))
        .ok_or_else(|| ReconError::MissingColumn {
            source: METADATA.into(),
            column: columns.species_aliases.join(" | "),
        })?;
    let genus_idx = required(&columns.genus)?;
    let family_idx = required(&columns.family)?;
    let order_idx = required(&columns.order)?;
    let class_idx = required(&columns.class)?;
    let rank_idx = required(&columns.matched_rank)?;
    let taxid_idx = required(&columns.taxid)?;
    let phylum_idx = position(&columns.phylum);
    let description_idx = position(&columns.description);

    tracing::info!("Using '{}' as species column", headers[species_idx]);

    let mut store = RecordStore::new(headers.clone());

    for (row, record) in reader.records().enumerate() {
        let record = record.map_err(|e| ReconError::Parse {
            source: METADATA.into(),
            message: e.to_string(),
        })?;
        let field = |i: usize| record.get(i).unwrap_or("").trim().to_string();

        let taxonomy = Taxonomy {
            phylum: phylum_idx.map(field).unwrap_or_default(),
            class: field(class_idx),
            order: field(order_idx),
            family: field(family_idx),
            genus: field(genus_idx),
            species: field(species_idx),
        };

        let mut raw: Vec<String> = (0..headers.len())
            .map(|i| record.get(i).unwrap_or("").to_string())
            .collect();
        raw[taxid_idx] = render_identifier(&raw[taxid_idx]);

        let description = description_idx.map(field).unwrap_or_default();

        let specimen = SpecimenRecord::new(RowId(row), field(process_idx), taxonomy)
            .with_matched_rank(field(rank_idx))
            .with_taxid(render_identifier(&field(taxid_idx)))
            .with_description(&description)
            .with_raw(raw);
        store.insert(specimen);
    }

    tracing::info!("Initial rows in metadata file: {}", store.len());
    Ok(store)
}

/// Load the samples table, taking identifiers from the first alias column present.
pub fn load_whitelist(
    csv_data: &str,
    delimiter: u8,
    columns: &ColumnConfig,
) -> Result<Whitelist, ReconError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(csv_data.as_bytes());

    let headers = read_headers(&mut reader, SAMPLES)?;

    let (idx, column) = columns
        .whitelist_id_aliases
        .iter()
        .find_map(|alias| headers.iter().position(|h| h == alias).map(|i| (i, alias.clone())))
        .ok_or_else(|| ReconError::MissingJoinKey {
            source: SAMPLES.into(),
            candidates: columns.whitelist_id_aliases.clone(),
        })?;

    let mut ids = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ReconError::Parse {
            source: SAMPLES.into(),
            message: e.to_string(),
        })?;
        ids.push(record.get(idx).unwrap_or("").to_string());
    }

    let whitelist = Whitelist::from_ids(column, ids);
    tracing::info!(
        "Number of unique IDs in filter file: {} (column '{}')",
        whitelist.len(),
        whitelist.column
    );
    Ok(whitelist)
}

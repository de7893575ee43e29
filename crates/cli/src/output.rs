//! Output file layout for one run.
//!
//! Every run writes all three tables, header-only when a stream is empty:
//!
//! | File                              | Delimiter | Content                    |
//! |-----------------------------------|-----------|----------------------------|
//! | `{prefix}_taxonomy_request.tsv`   | tab       | resolved records           |
//! | `{prefix}_gbif_inconsistent.tsv`  | tab       | lookup failures / no case  |
//! | `{prefix}_tax_validation_fails.csv` | comma   | order/class disagreements  |
//! | `{prefix}.log`                    | -         | run log                    |

use std::path::PathBuf;

use serde::Serialize;
use taxreq_io::csv::{write_records, write_serialized};
use taxreq_io::IoError;
use taxreq_recon::merge::{InconsistentRow, MergeOutput, RankInvalidRow};

#[derive(Debug, Clone, Serialize)]
pub struct OutputPaths {
    pub request: PathBuf,
    pub inconsistent: PathBuf,
    pub rank_invalid: PathBuf,
    pub log: PathBuf,
}

impl OutputPaths {
    pub fn from_prefix(prefix: &str) -> Self {
        Self {
            request: PathBuf::from(format!("{prefix}_taxonomy_request.tsv")),
            inconsistent: PathBuf::from(format!("{prefix}_gbif_inconsistent.tsv")),
            rank_invalid: PathBuf::from(format!("{prefix}_tax_validation_fails.csv")),
            log: PathBuf::from(format!("{prefix}.log")),
        }
    }
}

/// Write the three output tables.
pub fn write_outputs(paths: &OutputPaths, output: &MergeOutput) -> Result<(), IoError> {
    let n = write_records(
        &paths.request,
        b'\t',
        &output.resolved_headers,
        output.resolved.iter().map(|r| r.to_record()),
    )?;
    tracing::info!("Wrote {} resolved records to {}", n, paths.request.display());

    let n = write_serialized(
        &paths.inconsistent,
        b'\t',
        &InconsistentRow::HEADERS,
        &output.inconsistent,
    )?;
    tracing::info!("Wrote {} inconsistent records to {}", n, paths.inconsistent.display());

    let n = write_serialized(
        &paths.rank_invalid,
        b',',
        &RankInvalidRow::HEADERS,
        &output.rank_invalid,
    )?;
    tracing::info!("Wrote {} rank validation failures to {}", n, paths.rank_invalid.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_from_prefix() {
        let paths = OutputPaths::from_prefix("runs/BGE_01");
        assert_eq!(paths.request, PathBuf::from("runs/BGE_01_taxonomy_request.tsv"));
        assert_eq!(paths.inconsistent, PathBuf::from("runs/BGE_01_gbif_inconsistent.tsv"));
        assert_eq!(paths.rank_invalid, PathBuf::from("runs/BGE_01_tax_validation_fails.csv"));
        assert_eq!(paths.log, PathBuf::from("runs/BGE_01.log"));
    }

    #[test]
    fn test_empty_output_writes_headers() {
        let dir = tempfile::tempdir().unwrap();
        let prefix = dir.path().join("empty");
        let paths = OutputPaths::from_prefix(&prefix.to_string_lossy());
        let output = MergeOutput {
            resolved_headers: vec!["proposed_name".into(), "name_type".into()],
            ..MergeOutput::default()
        };

        write_outputs(&paths, &output).unwrap();

        assert_eq!(std::fs::read_to_string(&paths.request).unwrap(), "proposed_name\tname_type\n");
        let inconsistent = std::fs::read_to_string(&paths.inconsistent).unwrap();
        assert!(inconsistent.starts_with("process_id\tproposed_name\t"));
        assert_eq!(inconsistent.lines().count(), 1);
        let fails = std::fs::read_to_string(&paths.rank_invalid).unwrap();
        assert!(fails.ends_with("GBIF_order,failure_reason\n"));
    }
}

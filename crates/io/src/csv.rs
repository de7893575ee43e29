// CSV/TSV reading and writing

use std::io::Read;
use std::path::Path;

use serde::Serialize;

use crate::IoError;

/// Decoded file contents plus the delimiter detected for them.
#[derive(Debug, Clone)]
pub struct DelimitedText {
    pub content: String,
    pub delimiter: u8,
}

/// Read a delimited file, decoding to UTF-8 and sniffing the delimiter.
pub fn read_delimited(path: &Path) -> Result<DelimitedText, IoError> {
    let content = read_file_as_utf8(path)?;
    let delimiter = sniff_delimiter(&content);
    tracing::debug!(
        "Read {} ({} bytes, delimiter {:?})",
        path.display(),
        content.len(),
        delimiter as char
    );
    Ok(DelimitedText { content, delimiter })
}

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Must produce >1 field on the header line to be viable
        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }

        // Lines agreeing with the header's field count, weighted by that count
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Read file and convert to UTF-8 if needed (Excel exports are often Windows-1252).
pub fn read_file_as_utf8(path: &Path) -> Result<String, IoError> {
    let mut file = std::fs::File::open(path).map_err(|e| IoError::read(path, e))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| IoError::read(path, e))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(strip_bom(s)),
        Err(e) => {
            let bytes = e.into_bytes();
            tracing::warn!("{} is not valid UTF-8, decoding as Windows-1252", path.display());
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

fn strip_bom(s: String) -> String {
    match s.strip_prefix('\u{feff}') {
        Some(rest) => rest.to_string(),
        None => s,
    }
}

/// Write a header row followed by string records. The header is written
/// even when there are no rows. Returns the number of data rows written.
pub fn write_records<I>(
    path: &Path,
    delimiter: u8,
    headers: &[String],
    rows: I,
) -> Result<usize, IoError>
where
    I: IntoIterator<Item = Vec<String>>,
{
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_path(path)
        .map_err(|e| IoError::write(path, e))?;

    writer.write_record(headers).map_err(|e| IoError::write(path, e))?;
    let mut count = 0;
    for row in rows {
        writer.write_record(&row).map_err(|e| IoError::write(path, e))?;
        count += 1;
    }
    writer.flush().map_err(|e| IoError::write(path, e))?;
    Ok(count)
}

/// Write serde rows under an explicit header. `headers` must list the
/// serialized field names in order; it is written even when `rows` is empty.
pub fn write_serialized<T: Serialize>(
    path: &Path,
    delimiter: u8,
    headers: &[&str],
    rows: &[T],
) -> Result<usize, IoError> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_path(path)
        .map_err(|e| IoError::write(path, e))?;

    writer.write_record(headers).map_err(|e| IoError::write(path, e))?;
    for row in rows {
        writer.serialize(row).map_err(|e| IoError::write(path, e))?;
    }
    writer.flush().map_err(|e| IoError::write(path, e))?;
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Name;Age;City\nAlice;30;Paris\nBob;25;London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "Process ID,species,genus\nP1,Apis mellifera,Apis\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_delimiter() {
        let content = "Process ID\tspecies\tgenus\nP1\tApis mellifera\tApis\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_pipe_delimiter() {
        let content = "Name|Age|City\nAlice|30|Paris\nBob|25|London\n";
        assert_eq!(sniff_delimiter(content), b'|');
    }

    #[test]
    fn test_sniff_single_column_defaults_to_comma() {
        assert_eq!(sniff_delimiter("ID\nP1\nP2\n"), b',');
        assert_eq!(sniff_delimiter(""), b',');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "Name;Address;City\n\"Doe, Jane\";\"123 Main St, Apt 4\";Paris\nBob;\"456 Elm\";London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_windows_1252_fallback() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("latin.csv");
        // "Müller" with ü as 0xFC
        fs::write(&path, b"collector\nM\xfcller\n").unwrap();

        let content = read_file_as_utf8(&path).unwrap();
        assert_eq!(content, "collector\nMüller\n");
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bom.csv");
        fs::write(&path, "\u{feff}Process ID,species\nP1,x\n").unwrap();

        let text = read_delimited(&path).unwrap();
        assert!(text.content.starts_with("Process ID"));
        assert_eq!(text.delimiter, b',');
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let dir = tempdir().unwrap();
        let err = read_delimited(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, IoError::Read { .. }));
    }

    #[test]
    fn test_write_records_header_only_when_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.tsv");
        let headers = vec!["a".to_string(), "b".to_string()];

        let n = write_records(&path, b'\t', &headers, Vec::new()).unwrap();
        assert_eq!(n, 0);
        assert_eq!(fs::read_to_string(&path).unwrap(), "a\tb\n");
    }

    #[derive(Serialize)]
    struct Row {
        #[serde(rename = "Process_ID")]
        id: String,
        score: Option<u8>,
    }

    #[test]
    fn test_write_serialized_renders_none_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        let rows = vec![
            Row {
                id: "P1".into(),
                score: Some(97),
            },
            Row {
                id: "P2".into(),
                score: None,
            },
        ];

        write_serialized(&path, b',', &["Process_ID", "score"], &rows).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "Process_ID,score\nP1,97\nP2,\n");
    }

    #[test]
    fn test_write_to_missing_directory_is_write_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing").join("out.csv");
        let err = write_serialized::<Row>(&path, b',', &["Process_ID", "score"], &[]).unwrap_err();
        assert!(matches!(err, IoError::Write { .. }));
    }
}

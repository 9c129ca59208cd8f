//! Tolerant delimited-text parsing into canonical rows

use crate::constants::CANDIDATE_DELIMITERS;
use crate::error::{ReplayError, Result};
use crate::models::CanonicalRow;
use crate::normalize::canonicalize;
use csv::{ReaderBuilder, Trim};
use std::fs;
use std::path::Path;

/// Pick the delimiter that splits the header line into the most fields.
///
/// Ties resolve toward comma, then semicolon, then tab.
pub fn detect_delimiter(header_line: &str) -> u8 {
    let mut best = (CANDIDATE_DELIMITERS[0], 0);
    for &delimiter in CANDIDATE_DELIMITERS {
        let fields = header_line.split(delimiter as char).count();
        if fields > best.1 {
            best = (delimiter, fields);
        }
    }
    best.0
}

/// Read one file into canonical rows
pub fn read_rows(path: &Path) -> Result<Vec<CanonicalRow>> {
    let text = fs::read_to_string(path)?;
    parse_rows(&text).map_err(|source| ReplayError::CsvParsing {
        path: path.to_path_buf(),
        source,
    })
}

/// Parse delimited text with a header row.
///
/// Headers are canonicalized, cells trimmed, ragged rows accepted: extra
/// cells are dropped and missing cells are simply absent from the row.
pub fn parse_rows(text: &str) -> std::result::Result<Vec<CanonicalRow>, csv::Error> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let header_line = text.lines().next().unwrap_or_default();

    let mut reader = ReaderBuilder::new()
        .delimiter(detect_delimiter(header_line))
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(canonicalize).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: CanonicalRow = headers
            .iter()
            .zip(record.iter())
            .map(|(key, cell)| (key.clone(), cell))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

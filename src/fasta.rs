use std::fs;

use camino::Utf8Path;

use crate::domain::SequenceRecord;
use crate::error::ImportError;

/// Parse FASTA text into sequence records.
///
/// The record name is the full header line after `>`, trimmed; the updater
/// matches on it verbatim. A header with no readable identifier still
/// produces a record (with an empty name) so callers can report and skip it
/// instead of silently losing track of the entry.
pub fn parse(input: &str) -> Vec<SequenceRecord> {
    let mut records = Vec::new();
    let mut current: Option<SequenceRecord> = None;

    for line in input.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') {
            continue;
        }

        if let Some(header) = trimmed.strip_prefix('>') {
            if let Some(record) = current.take() {
                records.push(record);
            }
            current = Some(SequenceRecord {
                name: header.trim().to_string(),
                seq: String::new(),
            });
        } else if let Some(record) = current.as_mut() {
            record
                .seq
                .extend(trimmed.chars().filter(|ch| !ch.is_whitespace()));
        }
        // sequence lines before any header are not attributable to a record
    }

    if let Some(record) = current {
        records.push(record);
    }

    records
}

pub fn read_file(path: &Utf8Path) -> Result<Vec<SequenceRecord>, ImportError> {
    if !path.as_std_path().exists() {
        return Err(ImportError::InputNotFound(path.as_std_path().to_path_buf()));
    }
    let content = fs::read_to_string(path.as_std_path())
        .map_err(|err| ImportError::Filesystem(format!("read {path}: {err}")))?;
    Ok(parse(&content))
}

/// Serialize records back to FASTA, 80 columns per sequence line.
pub fn serialize(records: &[SequenceRecord]) -> String {
    let mut out = String::new();
    for record in records {
        out.push('>');
        out.push_str(&record.name);
        out.push('\n');
        for chunk in record.seq.as_bytes().chunks(80) {
            out.push_str(&String::from_utf8_lossy(chunk));
            out.push('\n');
        }
    }
    out
}

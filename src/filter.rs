use std::collections::HashSet;
use std::fs;

use camino::Utf8Path;
use serde::Serialize;
use tracing::{info, warn};

use crate::db::RecordStore;
use crate::domain::Accession;
use crate::error::ImportError;
use crate::fs_util::write_bytes_atomic;
use crate::{fasta, tsv};

#[derive(Debug, Clone, Serialize)]
pub struct FilterResult {
    pub meta_kept: u64,
    pub meta_dropped: u64,
    pub seq_kept: u64,
    pub seq_dropped: u64,
}

/// Split out records not yet in the database: metadata rows whose accession
/// is unknown go to `new_tsv`, and the sequences belonging to those rows go
/// to `new_fasta`.
pub fn split_out_new<S: RecordStore>(
    store: &S,
    metadata_tsv: &Utf8Path,
    sequences_fasta: &Utf8Path,
    new_tsv: &Utf8Path,
    new_fasta: &Utf8Path,
) -> Result<FilterResult, ImportError> {
    if !metadata_tsv.as_std_path().exists() {
        return Err(ImportError::InputNotFound(
            metadata_tsv.as_std_path().to_path_buf(),
        ));
    }

    let content = fs::read_to_string(metadata_tsv.as_std_path())
        .map_err(|err| ImportError::Filesystem(format!("read {metadata_tsv}: {err}")))?;
    let (headers, rows) = tsv::read_rows(content.as_bytes())?;
    let accession_index = tsv::column_index(&headers, "gisaid_epi_isl")?;
    let strain_index = tsv::column_index(&headers, "strain")?;

    let known = store.known_accessions()?;

    let mut kept_rows = Vec::new();
    let mut kept_strains = HashSet::new();
    let mut meta_dropped = 0u64;
    for row in &rows {
        let raw = row.get(accession_index).unwrap_or_default();
        let accession = match raw.parse::<Accession>() {
            Ok(accession) => accession,
            Err(_) => {
                warn!(accession = raw, "dropping row with unreadable accession");
                meta_dropped += 1;
                continue;
            }
        };
        if known.contains(accession.as_str()) {
            meta_dropped += 1;
            continue;
        }
        kept_strains.insert(row.get(strain_index).unwrap_or_default().to_string());
        kept_rows.push(row.clone());
    }

    let mut meta_out = Vec::new();
    tsv::write_rows(&mut meta_out, &headers, &kept_rows)?;
    write_bytes_atomic(new_tsv, &meta_out)?;

    let sequences = fasta::read_file(sequences_fasta)?;
    let total_sequences = sequences.len() as u64;
    let kept_sequences: Vec<_> = sequences
        .into_iter()
        .filter(|record| kept_strains.contains(&record.name))
        .collect();
    let seq_kept = kept_sequences.len() as u64;
    write_bytes_atomic(new_fasta, fasta::serialize(&kept_sequences).as_bytes())?;

    let result = FilterResult {
        meta_kept: kept_rows.len() as u64,
        meta_dropped,
        seq_kept,
        seq_dropped: total_sequences - seq_kept,
    };
    info!(
        meta_kept = result.meta_kept,
        meta_dropped = result.meta_dropped,
        seq_kept = result.seq_kept,
        "split out new records"
    );
    Ok(result)
}

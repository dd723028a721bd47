use std::collections::HashSet;

use camino::Utf8Path;
use serde::Serialize;
use tracing::{info, warn};

use crate::db::RecordStore;
use crate::domain::SequenceRecord;
use crate::error::ImportError;
use crate::fasta;

#[derive(Debug, Clone, Serialize)]
pub struct UpdateResult {
    pub parsed: u64,
    pub updated: u64,
    pub skipped: u64,
}

/// Fill in sequence text on records that were imported without one.
///
/// A single linear pass: every parsed sequence whose name matches a record
/// with a null sequence field gets written back. Re-running against the same
/// input is a no-op because updated records no longer qualify as missing.
pub fn update_sequences<S: RecordStore>(
    store: &S,
    input: &Utf8Path,
) -> Result<UpdateResult, ImportError> {
    let records = fasta::read_file(input)?;
    let result = apply_updates(store, &records)?;
    info!(
        parsed = result.parsed,
        updated = result.updated,
        skipped = result.skipped,
        "updated sequences"
    );
    Ok(result)
}

pub fn apply_updates<S: RecordStore>(
    store: &S,
    records: &[SequenceRecord],
) -> Result<UpdateResult, ImportError> {
    let missing: HashSet<String> = store.missing_sequence_names()?.into_iter().collect();

    let mut updated = 0u64;
    let mut skipped = 0u64;
    for record in records {
        if record.name.is_empty() {
            warn!("could not read identifier for a sequence entry, skipping");
            skipped += 1;
            continue;
        }
        if missing.contains(&record.name) {
            store.set_sequence(&record.name, &record.seq)?;
            updated += 1;
        }
    }

    Ok(UpdateResult {
        parsed: records.len() as u64,
        updated,
        skipped,
    })
}

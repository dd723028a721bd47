use std::fs;

use camino::Utf8Path;
use serde::Serialize;
use tracing::info;

use crate::adapt::adapt_row;
use crate::db::RecordStore;
use crate::error::ImportError;
use crate::tsv;

#[derive(Debug, Clone, Serialize)]
pub struct SubmitResult {
    pub adapted: u64,
    pub inserted: u64,
}

/// Adapt every row of a translated metadata TSV into a document record and
/// insert the batch. Rows that cannot be adapted abort the step: by this
/// point the file has already been translated and filtered, so a bad row
/// means the upstream steps did not run.
pub fn submit_tsv<S: RecordStore>(store: &S, input: &Utf8Path) -> Result<SubmitResult, ImportError> {
    if !input.as_std_path().exists() {
        return Err(ImportError::InputNotFound(input.as_std_path().to_path_buf()));
    }

    let content = fs::read_to_string(input.as_std_path())
        .map_err(|err| ImportError::Filesystem(format!("read {input}: {err}")))?;
    let (headers, rows) = tsv::read_rows(content.as_bytes())?;

    let mut records = Vec::with_capacity(rows.len());
    for row in &rows {
        records.push(adapt_row(&headers, row)?);
    }

    let inserted = store.insert_records(&records)?;
    info!(adapted = records.len(), inserted, "imported metadata records");
    Ok(SubmitResult {
        adapted: records.len() as u64,
        inserted,
    })
}

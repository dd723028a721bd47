use chrono::NaiveDate;
use csv::StringRecord;

use crate::domain::{Accession, IsolateRecord, Location};
use crate::error::ImportError;
use crate::tsv::column_index;

/// Adapt one translated metadata row into the document shape stored in the
/// records collection. `gisaid_epi_isl` and `strain` are required; every
/// other field degrades to an absent value.
pub fn adapt_row(headers: &StringRecord, row: &StringRecord) -> Result<IsolateRecord, ImportError> {
    let accession_index = column_index(headers, "gisaid_epi_isl")?;
    let strain_index = column_index(headers, "strain")?;

    let accession: Accession = row
        .get(accession_index)
        .unwrap_or_default()
        .parse()?;
    let name = row.get(strain_index).unwrap_or_default().trim().to_string();

    let field = |column: &str| -> Option<String> {
        headers
            .iter()
            .position(|header| header == column)
            .and_then(|index| row.get(index))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let original_collected = field("date");
    let original_submitted = field("date_submitted");

    Ok(IsolateRecord {
        id: accession,
        name,
        location: Location {
            subregion: field("region").unwrap_or_default(),
            country: field("country").unwrap_or_default(),
            state: field("division").unwrap_or_default(),
            locality: field("location").unwrap_or_default(),
        },
        age: field("age").and_then(|value| value.parse().ok()),
        sex: field("sex"),
        host: field("host"),
        passage: field("passage"),
        length: field("length").and_then(|value| value.parse().ok()),
        collected: original_collected.as_deref().and_then(parse_date),
        original_collected,
        submitted: original_submitted.as_deref().and_then(parse_date),
        original_submitted,
        originating_lab: field("originating_lab"),
        submitting_lab: field("submitting_lab"),
        authors: field("authors"),
        genbank_accession: field("genbank_accession"),
        nextstrain_clade: field("Nextstrain_clade"),
        pangolin_lineage: field("pangolin_lineage"),
        gisaid_clade: field("GISAID_clade"),
    })
}

/// Partial dates complete to the first of the period ("2020-03" ->
/// 2020-03-01, "2020" -> 2020-01-01); the original string is kept on the
/// record either way.
fn parse_date(value: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{value}-01"), "%Y-%m-%d") {
        return Some(date);
    }
    NaiveDate::parse_from_str(&format!("{value}-01-01"), "%Y-%m-%d").ok()
}

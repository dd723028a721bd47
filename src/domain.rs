use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ImportError;

/// GISAID EPI_ISL accession, normalized to lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Accession(String);

impl Accession {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Accession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Accession {
    type Err = ImportError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        let digits = normalized.strip_prefix("epi_isl_");
        let is_valid = digits
            .map(|rest| !rest.is_empty() && rest.chars().all(|ch| ch.is_ascii_digit()))
            .unwrap_or(false);
        if !is_valid {
            return Err(ImportError::InvalidAccession(value.to_string()));
        }
        Ok(Self(normalized))
    }
}

/// One entry parsed from a FASTA file. The name is the full header text;
/// it may be empty when the header carried no readable identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    pub name: String,
    pub seq: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub subregion: String,
    pub country: String,
    pub state: String,
    pub locality: String,
}

/// A metadata row adapted into the document shape stored in `gisaid.records`.
/// The sequence field starts out absent and is filled in by the updater.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolateRecord {
    pub id: Accession,
    pub name: String,
    pub location: Location,
    pub age: Option<i32>,
    pub sex: Option<String>,
    pub host: Option<String>,
    pub passage: Option<String>,
    pub length: Option<i64>,
    pub collected: Option<NaiveDate>,
    pub original_collected: Option<String>,
    pub submitted: Option<NaiveDate>,
    pub original_submitted: Option<String>,
    pub originating_lab: Option<String>,
    pub submitting_lab: Option<String>,
    pub authors: Option<String>,
    pub genbank_accession: Option<String>,
    pub nextstrain_clade: Option<String>,
    pub pangolin_lineage: Option<String>,
    pub gisaid_clade: Option<String>,
}

use std::collections::HashSet;

use chrono::{NaiveDate, NaiveTime};
use mongodb::bson::{Bson, DateTime, Document, doc};
use mongodb::sync::{Client, Collection};

use crate::domain::IsolateRecord;
use crate::error::ImportError;

pub const DATABASE_NAME: &str = "gisaid";
pub const COLLECTION_NAME: &str = "records";

/// Seam over the document store. The pipeline steps only ever need these
/// four operations; tests swap in an in-memory implementation.
pub trait RecordStore: Send + Sync {
    /// Accession ids of records already imported.
    fn known_accessions(&self) -> Result<HashSet<String>, ImportError>;

    /// Names of records whose sequence field is still null.
    fn missing_sequence_names(&self) -> Result<Vec<String>, ImportError>;

    /// Set the sequence text on the record matching `name`.
    fn set_sequence(&self, name: &str, seq: &str) -> Result<(), ImportError>;

    /// Insert adapted records, returning how many were written.
    fn insert_records(&self, records: &[IsolateRecord]) -> Result<u64, ImportError>;
}

impl<S: RecordStore + ?Sized> RecordStore for &S {
    fn known_accessions(&self) -> Result<HashSet<String>, ImportError> {
        (**self).known_accessions()
    }

    fn missing_sequence_names(&self) -> Result<Vec<String>, ImportError> {
        (**self).missing_sequence_names()
    }

    fn set_sequence(&self, name: &str, seq: &str) -> Result<(), ImportError> {
        (**self).set_sequence(name, seq)
    }

    fn insert_records(&self, records: &[IsolateRecord]) -> Result<u64, ImportError> {
        (**self).insert_records(records)
    }
}

#[derive(Clone)]
pub struct MongoRecordStore {
    collection: Collection<Document>,
}

impl MongoRecordStore {
    pub fn connect(uri: &str) -> Result<Self, ImportError> {
        let client = Client::with_uri_str(uri).map_err(db_err)?;
        let collection = client.database(DATABASE_NAME).collection(COLLECTION_NAME);
        Ok(Self { collection })
    }
}

impl RecordStore for MongoRecordStore {
    fn known_accessions(&self) -> Result<HashSet<String>, ImportError> {
        let cursor = self
            .collection
            .find(doc! {})
            .projection(doc! { "id": 1 })
            .run()
            .map_err(db_err)?;
        let mut accessions = HashSet::new();
        for document in cursor {
            let document = document.map_err(db_err)?;
            if let Ok(id) = document.get_str("id") {
                accessions.insert(id.to_string());
            }
        }
        Ok(accessions)
    }

    fn missing_sequence_names(&self) -> Result<Vec<String>, ImportError> {
        let cursor = self
            .collection
            .find(doc! { "seq": Bson::Null })
            .projection(doc! { "name": 1 })
            .run()
            .map_err(db_err)?;
        let mut names = Vec::new();
        for document in cursor {
            let document = document.map_err(db_err)?;
            if let Ok(name) = document.get_str("name") {
                names.push(name.to_string());
            }
        }
        Ok(names)
    }

    fn set_sequence(&self, name: &str, seq: &str) -> Result<(), ImportError> {
        self.collection
            .update_one(doc! { "name": name }, doc! { "$set": { "seq": seq } })
            .run()
            .map_err(db_err)?;
        Ok(())
    }

    fn insert_records(&self, records: &[IsolateRecord]) -> Result<u64, ImportError> {
        if records.is_empty() {
            return Ok(0);
        }
        let documents: Vec<Document> = records.iter().map(isolate_to_document).collect();
        let result = self.collection.insert_many(documents).run().map_err(db_err)?;
        Ok(result.inserted_ids.len() as u64)
    }
}

/// Document shape matching the loader the records collection was built
/// around: lowercased accession as `id`, strain as `name`, a nested
/// location object, and a null `seq` until the updater fills it in.
pub fn isolate_to_document(record: &IsolateRecord) -> Document {
    doc! {
        "id": record.id.as_str(),
        "name": record.name.as_str(),
        "seq": Bson::Null,
        "address": opt_str(&record.originating_lab),
        "lab": opt_str(&record.originating_lab),
        "originating_lab": opt_str(&record.originating_lab),
        "submitter": opt_str(&record.submitting_lab),
        "submitting_lab": opt_str(&record.submitting_lab),
        "authors": opt_str(&record.authors),
        "genbank_accession": opt_str(&record.genbank_accession),
        "age": record.age.map(Bson::Int32).unwrap_or(Bson::Null),
        "gender": opt_str(&record.sex),
        "sex": opt_str(&record.sex),
        "host": opt_str(&record.host),
        "passage": opt_str(&record.passage),
        "length": record.length.map(Bson::Int64).unwrap_or(Bson::Null),
        "seqLength": record.length.map(Bson::Int64).unwrap_or(Bson::Null),
        "collected": opt_date(record.collected),
        "originalCollected": opt_str(&record.original_collected),
        "submitted": opt_date(record.submitted),
        "originalSubmitted": opt_str(&record.original_submitted),
        "location": {
            "subregion": record.location.subregion.as_str(),
            "country": record.location.country.as_str(),
            "state": record.location.state.as_str(),
            "locality": record.location.locality.as_str(),
        },
        "assembly": Bson::Null,
        "coverage": Bson::Null,
        "technology": Bson::Null,
        "type": Bson::Null,
        "nextstrainClade": opt_str(&record.nextstrain_clade),
        "pangolinLineage": opt_str(&record.pangolin_lineage),
        "gisaidClade": opt_str(&record.gisaid_clade),
    }
}

fn opt_str(value: &Option<String>) -> Bson {
    match value {
        Some(text) => Bson::String(text.clone()),
        None => Bson::Null,
    }
}

fn opt_date(value: Option<NaiveDate>) -> Bson {
    match value {
        Some(date) => {
            let millis = date.and_time(NaiveTime::MIN).and_utc().timestamp_millis();
            Bson::DateTime(DateTime::from_millis(millis))
        }
        None => Bson::Null,
    }
}

fn db_err(err: mongodb::error::Error) -> ImportError {
    ImportError::Database(err.to_string())
}

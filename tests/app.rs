use std::collections::{HashMap, HashSet};
use std::fs;
use std::sync::Mutex;

use camino::Utf8PathBuf;

use gisaid_import::app::{App, RunOptions};
use gisaid_import::config::{Config, ConfigLoader, ResolvedConfig, RetrievalConfig};
use gisaid_import::db::RecordStore;
use gisaid_import::domain::IsolateRecord;
use gisaid_import::error::ImportError;

/// In-memory records collection: accession set plus name -> seq.
#[derive(Default)]
struct MemoryStore {
    accessions: Mutex<HashSet<String>>,
    records: Mutex<HashMap<String, Option<String>>>,
    inserted: Mutex<Vec<IsolateRecord>>,
}

impl MemoryStore {
    fn with_accessions(accessions: &[&str]) -> Self {
        Self {
            accessions: Mutex::new(accessions.iter().map(|acc| acc.to_string()).collect()),
            ..Self::default()
        }
    }

    fn seq_of(&self, name: &str) -> Option<String> {
        self.records.lock().unwrap().get(name).cloned().flatten()
    }

    fn inserted_count(&self) -> usize {
        self.inserted.lock().unwrap().len()
    }
}

impl RecordStore for MemoryStore {
    fn known_accessions(&self) -> Result<HashSet<String>, ImportError> {
        Ok(self.accessions.lock().unwrap().clone())
    }

    fn missing_sequence_names(&self) -> Result<Vec<String>, ImportError> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, seq)| seq.is_none())
            .map(|(name, _)| name.clone())
            .collect())
    }

    fn set_sequence(&self, name: &str, seq: &str) -> Result<(), ImportError> {
        self.records
            .lock()
            .unwrap()
            .insert(name.to_string(), Some(seq.to_string()));
        Ok(())
    }

    fn insert_records(&self, records: &[IsolateRecord]) -> Result<u64, ImportError> {
        let mut accessions = self.accessions.lock().unwrap();
        let mut by_name = self.records.lock().unwrap();
        for record in records {
            accessions.insert(record.id.as_str().to_string());
            by_name.insert(record.name.clone(), None);
        }
        let mut inserted = self.inserted.lock().unwrap();
        inserted.extend(records.iter().cloned());
        Ok(records.len() as u64)
    }
}

fn test_config(root: &Utf8PathBuf) -> ResolvedConfig {
    let config = ConfigLoader::resolve_config(Config {
        schema_version: None,
        working_dir: root.to_string(),
        import_dir: None,
        imported_dir: None,
        database_uri: None,
        retrieval: None,
    })
    .unwrap();
    fs::create_dir_all(config.import_dir.as_std_path()).unwrap();
    config
}

fn utf8_root(temp: &tempfile::TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap()
}

const METADATA: &str = "\
strain\tgisaid_epi_isl\tdate\tregion\tcountry\tdivision\tlocation\thost\n\
hCoV-19/One/2020\tEPI_ISL_1\t2020-03-01\tAsia\tChina\tHubei\tWuhan\tHuman\n\
hCoV-19/Two/2020\tEPI_ISL_2\t2020-03-02\tEurope\tGermany\tBavaria\tMunich\tHuman\n";

const SEQUENCES: &str = "\
>hCoV-19/One/2020\nACGTACGT\n>hCoV-19/Two/2020\nTTTTCCCC\n";

#[test]
fn split_out_new_drops_known_accessions() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_root(&temp);
    let config = test_config(&root);
    fs::write(config.metadata_tsv().as_std_path(), METADATA).unwrap();
    fs::write(config.sequences_fasta().as_std_path(), SEQUENCES).unwrap();

    let store = MemoryStore::with_accessions(&["epi_isl_1"]);
    let app = App::new(&store, config.clone());

    let result = app.split_out_new().unwrap();

    assert_eq!(result.meta_kept, 1);
    assert_eq!(result.meta_dropped, 1);
    assert_eq!(result.seq_kept, 1);
    assert_eq!(result.seq_dropped, 1);

    let new_tsv = fs::read_to_string(config.new_tsv().as_std_path()).unwrap();
    assert!(new_tsv.contains("EPI_ISL_2"));
    assert!(!new_tsv.contains("EPI_ISL_1"));

    let new_fasta = fs::read_to_string(config.new_fasta().as_std_path()).unwrap();
    assert!(new_fasta.contains(">hCoV-19/Two/2020"));
    assert!(!new_fasta.contains(">hCoV-19/One/2020"));
}

#[test]
fn import_then_update_fills_sequences() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_root(&temp);
    let config = test_config(&root);
    fs::write(config.metadata_tsv().as_std_path(), METADATA).unwrap();
    fs::write(config.sequences_fasta().as_std_path(), SEQUENCES).unwrap();

    let store = MemoryStore::default();
    let app = App::new(&store, config.clone());

    let filtered = app.split_out_new().unwrap();
    assert_eq!(filtered.meta_kept, 2);

    let submitted = app.submit().unwrap();
    assert_eq!(submitted.inserted, 2);
    assert_eq!(store.inserted_count(), 2);

    let updated = app.update_sequences(None).unwrap();
    assert_eq!(updated.updated, 2);
    assert_eq!(store.seq_of("hCoV-19/One/2020").as_deref(), Some("ACGTACGT"));
    assert_eq!(store.seq_of("hCoV-19/Two/2020").as_deref(), Some("TTTTCCCC"));

    // idempotence: everything already carries a sequence now
    let again = app.update_sequences(None).unwrap();
    assert_eq!(again.updated, 0);
}

#[test]
fn translate_then_rename_produces_canonical_metadata() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_root(&temp);
    let config = test_config(&root);
    fs::write(
        config.metadata_tsv().as_std_path(),
        "Virus name\tAccession ID\tLocation\nhCoV-19/x\tEPI_ISL_9\tAsia / China / Hubei / Wuhan\n",
    )
    .unwrap();

    let store = MemoryStore::default();
    let app = App::new(&store, config.clone());

    let translated = app.translate().unwrap();
    assert_eq!(translated.rows, 1);
    assert!(config.translated_tsv().as_std_path().exists());

    app.rename_translated().unwrap();
    assert!(!config.translated_tsv().as_std_path().exists());

    let metadata = fs::read_to_string(config.metadata_tsv().as_std_path()).unwrap();
    assert!(metadata.starts_with("strain\tgisaid_epi_isl\tregion\tcountry\tdivision\tlocation\n"));
    assert!(metadata.contains("hCoV-19/x\tEPI_ISL_9\tAsia\tChina\tHubei\tWuhan"));
}

#[test]
fn archive_moves_processed_files() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_root(&temp);
    let config = test_config(&root);
    fs::write(config.new_tsv().as_std_path(), "strain\n").unwrap();
    fs::write(config.new_fasta().as_std_path(), ">a\nACGT\n").unwrap();

    let store = MemoryStore::default();
    let app = App::new(&store, config.clone());

    let result = app.archive().unwrap();

    assert_eq!(result.moved, vec!["new.fasta".to_string(), "new.tsv".to_string()]);
    assert!(config.imported_dir.join("new.tsv").as_std_path().exists());
    assert!(!config.new_tsv().as_std_path().exists());
}

#[test]
fn dry_run_plans_without_touching_anything() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_root(&temp);
    let config = test_config(&root);

    let store = MemoryStore::default();
    let app = App::new(&store, config.clone());

    let result = app.run(RunOptions { dry_run: true }).unwrap();

    assert_eq!(result.tasks.len(), 9);
    assert!(result.tasks.iter().all(|task| task.status == "planned"));
    assert_eq!(result.tasks[0].id, "retrieve_meta");
    assert_eq!(result.tasks.last().unwrap().id, "move_files");
    assert!(!config.new_tsv().as_std_path().exists());
}

#[test]
fn failing_command_task_aborts_the_run() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_root(&temp);
    let marker = root.join("retrieved-sequences");
    let config = ConfigLoader::resolve_config(Config {
        schema_version: None,
        working_dir: root.to_string(),
        import_dir: None,
        imported_dir: None,
        database_uri: None,
        retrieval: Some(RetrievalConfig {
            metadata_command: Some("false".to_string()),
            sequences_command: Some(format!("touch {marker}")),
        }),
    })
    .unwrap();
    fs::create_dir_all(config.import_dir.as_std_path()).unwrap();

    let store = MemoryStore::default();
    let app = App::new(&store, config.clone());

    let err = app.run(RunOptions { dry_run: false }).unwrap_err();

    assert!(matches!(err, ImportError::TaskFailed { ref task, .. } if task == "retrieve_meta"));
    // nothing downstream of the failed task ran
    assert!(!marker.as_std_path().exists());
    assert!(!config.new_tsv().as_std_path().exists());
}

#[test]
fn update_missing_input_is_reported() {
    let temp = tempfile::tempdir().unwrap();
    let root = utf8_root(&temp);
    let config = test_config(&root);

    let store = MemoryStore::default();
    let app = App::new(&store, config);

    let err = app.update_sequences(None).unwrap_err();
    assert!(matches!(err, ImportError::InputNotFound(_)));
}

use std::fs;
use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::error::ImportError;

pub const DEFAULT_DATABASE_URI: &str = "mongodb://127.0.0.1:27017";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    pub working_dir: String,
    #[serde(default)]
    pub import_dir: Option<String>,
    #[serde(default)]
    pub imported_dir: Option<String>,
    #[serde(default)]
    pub database_uri: Option<String>,
    #[serde(default)]
    pub retrieval: Option<RetrievalConfig>,
}

/// Commands for the opaque retrieval steps. Defaults shell out to the
/// node scripts shipped alongside the pipeline in the working directory.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RetrievalConfig {
    #[serde(default)]
    pub metadata_command: Option<String>,
    #[serde(default)]
    pub sequences_command: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub working_dir: Utf8PathBuf,
    pub import_dir: Utf8PathBuf,
    pub imported_dir: Utf8PathBuf,
    pub database_uri: String,
    pub metadata_command: String,
    pub sequences_command: String,
}

impl ResolvedConfig {
    pub fn metadata_tsv(&self) -> Utf8PathBuf {
        self.import_dir.join("metadata.tsv")
    }

    pub fn translated_tsv(&self) -> Utf8PathBuf {
        self.import_dir.join("translate.tsv")
    }

    pub fn sequences_fasta(&self) -> Utf8PathBuf {
        self.import_dir.join("sequences.fasta")
    }

    pub fn new_tsv(&self) -> Utf8PathBuf {
        self.import_dir.join("new.tsv")
    }

    pub fn new_fasta(&self) -> Utf8PathBuf {
        self.import_dir.join("new.fasta")
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, ImportError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from("gisaid-import.json"),
        };

        if path.is_none() && !config_path.exists() {
            return Err(ImportError::MissingConfig);
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ImportError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ImportError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, ImportError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let working_dir = Utf8PathBuf::from(config.working_dir);

        let import_dir = match config.import_dir {
            Some(dir) => Utf8PathBuf::from(dir),
            None => working_dir.join("data").join("to-import"),
        };
        let imported_dir = match config.imported_dir {
            Some(dir) => Utf8PathBuf::from(dir),
            None => working_dir.join("data").join("imported"),
        };

        let retrieval = config.retrieval.unwrap_or_default();
        let metadata_command = retrieval
            .metadata_command
            .unwrap_or_else(|| default_retrieval_command(&working_dir, "get_metadata.js"));
        let sequences_command = retrieval
            .sequences_command
            .unwrap_or_else(|| default_retrieval_command(&working_dir, "get_seqs.js"));

        Ok(ResolvedConfig {
            schema_version,
            working_dir,
            import_dir,
            imported_dir,
            database_uri: config
                .database_uri
                .unwrap_or_else(|| DEFAULT_DATABASE_URI.to_string()),
            metadata_command,
            sequences_command,
        })
    }
}

fn default_retrieval_command(working_dir: &Utf8Path, script: &str) -> String {
    format!("node {}", working_dir.join("js").join(script))
}

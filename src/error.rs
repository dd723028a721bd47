use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ImportError {
    #[error("invalid accession id: {0}")]
    InvalidAccession(String),

    #[error("missing config file gisaid-import.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("tabular file error: {0}")]
    Tabular(String),

    #[error("missing column in metadata file: {0}")]
    MissingColumn(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("task {task} failed: {message}")]
    TaskFailed { task: String, message: String },

    #[error("task {task} depends on unknown task {dependency}")]
    UnknownDependency { task: String, dependency: String },

    #[error("dependency cycle involving task {0}")]
    DependencyCycle(String),

    #[error("unknown task id: {0}")]
    UnknownTask(String),
}

use std::fs;
use std::process::Command;

use camino::Utf8Path;
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::config::ResolvedConfig;
use crate::dag::{Step, TaskAction, import_dag};
use crate::db::RecordStore;
use crate::error::ImportError;
use crate::filter::{FilterResult, split_out_new};
use crate::fs_util::{archive_processed, move_file, write_bytes_atomic};
use crate::submit::{SubmitResult, submit_tsv};
use crate::tsv;
use crate::update::{UpdateResult, update_sequences};

#[derive(Debug, Clone, Serialize)]
pub struct TranslateResult {
    pub rows: u64,
    pub output: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameResult {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ArchiveResult {
    pub moved: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskRunResult {
    pub id: String,
    pub kind: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub tasks: Vec<TaskRunResult>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub dry_run: bool,
}

/// Orchestrates the pipeline steps over a record store and resolved
/// configuration. External retrieval and extraction stay opaque commands;
/// everything downstream is a builtin step.
pub struct App<S: RecordStore> {
    store: S,
    config: ResolvedConfig,
}

impl<S: RecordStore> App<S> {
    pub fn new(store: S, config: ResolvedConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    pub fn run(&self, options: RunOptions) -> Result<RunResult, ImportError> {
        let dag = import_dag(&self.config);
        let order = dag.execution_order()?;

        let mut tasks = Vec::with_capacity(order.len());
        for task in order {
            info!(task = task.id.as_str(), "running task");
            let result = match &task.action {
                TaskAction::Command(command) => {
                    if options.dry_run {
                        TaskRunResult {
                            id: task.id.clone(),
                            kind: "command".to_string(),
                            status: "planned".to_string(),
                            detail: Some(Value::String(command.clone())),
                        }
                    } else {
                        run_command(&task.id, command)?;
                        TaskRunResult {
                            id: task.id.clone(),
                            kind: "command".to_string(),
                            status: "ok".to_string(),
                            detail: None,
                        }
                    }
                }
                TaskAction::Step(step) => {
                    if options.dry_run {
                        TaskRunResult {
                            id: task.id.clone(),
                            kind: "step".to_string(),
                            status: "planned".to_string(),
                            detail: None,
                        }
                    } else {
                        let detail = self.run_step(*step)?;
                        TaskRunResult {
                            id: task.id.clone(),
                            kind: "step".to_string(),
                            status: "ok".to_string(),
                            detail: Some(detail),
                        }
                    }
                }
            };
            tasks.push(result);
        }

        Ok(RunResult { tasks })
    }

    fn run_step(&self, step: Step) -> Result<Value, ImportError> {
        let detail = match step {
            Step::TranslateTsv => to_detail(&self.translate()?),
            Step::RenameTranslated => to_detail(&self.rename_translated()?),
            Step::SplitOutNew => to_detail(&self.split_out_new()?),
            Step::ImportTsv => to_detail(&self.submit()?),
            Step::UpdateWithSequences => to_detail(&self.update_sequences(None)?),
            Step::MoveFiles => to_detail(&self.archive()?),
        };
        Ok(detail)
    }

    /// Rewrite metadata.tsv's headers and values into the canonical
    /// vocabulary, producing translate.tsv next to it.
    pub fn translate(&self) -> Result<TranslateResult, ImportError> {
        let input = self.config.metadata_tsv();
        let output = self.config.translated_tsv();
        if !input.as_std_path().exists() {
            return Err(ImportError::InputNotFound(input.as_std_path().to_path_buf()));
        }

        let content = fs::read_to_string(input.as_std_path())
            .map_err(|err| ImportError::Filesystem(format!("read {input}: {err}")))?;
        let mut translated = Vec::new();
        let rows = tsv::translate(content.as_bytes(), &mut translated)?;
        write_bytes_atomic(&output, &translated)?;

        info!(rows, output = output.as_str(), "translated metadata");
        Ok(TranslateResult {
            rows,
            output: output.to_string(),
        })
    }

    /// Move translate.tsv over metadata.tsv, the same handoff the
    /// production workflow does between translation and filtering.
    pub fn rename_translated(&self) -> Result<RenameResult, ImportError> {
        let from = self.config.translated_tsv();
        let to = self.config.metadata_tsv();
        if !from.as_std_path().exists() {
            return Err(ImportError::InputNotFound(from.as_std_path().to_path_buf()));
        }
        move_file(&from, &to)?;
        Ok(RenameResult {
            from: from.to_string(),
            to: to.to_string(),
        })
    }

    pub fn split_out_new(&self) -> Result<FilterResult, ImportError> {
        split_out_new(
            &self.store,
            &self.config.metadata_tsv(),
            &self.config.sequences_fasta(),
            &self.config.new_tsv(),
            &self.config.new_fasta(),
        )
    }

    pub fn submit(&self) -> Result<SubmitResult, ImportError> {
        submit_tsv(&self.store, &self.config.new_tsv())
    }

    pub fn update_sequences(&self, input: Option<&Utf8Path>) -> Result<UpdateResult, ImportError> {
        let default = self.config.new_fasta();
        update_sequences(&self.store, input.unwrap_or(&default))
    }

    pub fn archive(&self) -> Result<ArchiveResult, ImportError> {
        let moved = archive_processed(&self.config.import_dir, &self.config.imported_dir)?;
        Ok(ArchiveResult { moved })
    }
}

fn run_command(task: &str, command: &str) -> Result<(), ImportError> {
    let output = Command::new("sh")
        .arg("-c")
        .arg(command)
        .output()
        .map_err(|err| ImportError::TaskFailed {
            task: task.to_string(),
            message: err.to_string(),
        })?;
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let message = if stderr.is_empty() {
        format!("command exited with {}", output.status)
    } else {
        stderr
    };
    Err(ImportError::TaskFailed {
        task: task.to_string(),
        message,
    })
}

fn to_detail<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

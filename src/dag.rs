use std::collections::{HashMap, HashSet};

use crate::config::ResolvedConfig;
use crate::error::ImportError;

/// Builtin pipeline steps, dispatched by the runner in `app`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    TranslateTsv,
    RenameTranslated,
    SplitOutNew,
    ImportTsv,
    UpdateWithSequences,
    MoveFiles,
}

/// What a task does when executed: shell out to an opaque external command,
/// or run one of the builtin steps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskAction {
    Command(String),
    Step(Step),
}

#[derive(Debug, Clone)]
pub struct Task {
    pub id: String,
    pub action: TaskAction,
    pub depends_on: Vec<String>,
}

/// The task graph is pure data: constructing it performs no I/O, and
/// execution order is derived, not stored.
#[derive(Debug, Clone, Default)]
pub struct Dag {
    tasks: Vec<Task>,
}

impl Dag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_command(&mut self, id: &str, command: impl Into<String>, depends_on: &[&str]) {
        self.tasks.push(Task {
            id: id.to_string(),
            action: TaskAction::Command(command.into()),
            depends_on: depends_on.iter().map(|dep| dep.to_string()).collect(),
        });
    }

    pub fn add_step(&mut self, id: &str, step: Step, depends_on: &[&str]) {
        self.tasks.push(Task {
            id: id.to_string(),
            action: TaskAction::Step(step),
            depends_on: depends_on.iter().map(|dep| dep.to_string()).collect(),
        });
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn task(&self, id: &str) -> Result<&Task, ImportError> {
        self.tasks
            .iter()
            .find(|task| task.id == id)
            .ok_or_else(|| ImportError::UnknownTask(id.to_string()))
    }

    /// Topological execution order, with declaration order as tie-break so
    /// runs are deterministic. Rejects unknown dependencies and cycles.
    pub fn execution_order(&self) -> Result<Vec<&Task>, ImportError> {
        let index_of: HashMap<&str, usize> = self
            .tasks
            .iter()
            .enumerate()
            .map(|(index, task)| (task.id.as_str(), index))
            .collect();

        let mut in_degree = vec![0usize; self.tasks.len()];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.tasks.len()];
        for (index, task) in self.tasks.iter().enumerate() {
            for dep in &task.depends_on {
                let dep_index =
                    *index_of
                        .get(dep.as_str())
                        .ok_or_else(|| ImportError::UnknownDependency {
                            task: task.id.clone(),
                            dependency: dep.clone(),
                        })?;
                in_degree[index] += 1;
                dependents[dep_index].push(index);
            }
        }

        let mut order = Vec::with_capacity(self.tasks.len());
        let mut done: HashSet<usize> = HashSet::new();
        while order.len() < self.tasks.len() {
            let next = (0..self.tasks.len())
                .find(|index| !done.contains(index) && in_degree[*index] == 0);
            let Some(next) = next else {
                let stuck = self
                    .tasks
                    .iter()
                    .enumerate()
                    .find(|(index, _)| !done.contains(index))
                    .map(|(_, task)| task.id.clone())
                    .unwrap_or_default();
                return Err(ImportError::DependencyCycle(stuck));
            };
            done.insert(next);
            order.push(&self.tasks[next]);
            for &dependent in &dependents[next] {
                in_degree[dependent] -= 1;
            }
        }

        Ok(order)
    }
}

/// The weekly import DAG, mirroring the production workflow:
/// both retrievals feed extraction, then translate, rename, filter, load,
/// annotate with sequences, and archive.
pub fn import_dag(config: &ResolvedConfig) -> Dag {
    let mut dag = Dag::new();
    dag.add_command("retrieve_meta", config.metadata_command.clone(), &[]);
    dag.add_command("retrieve_fasta", config.sequences_command.clone(), &[]);
    dag.add_command(
        "untar_files",
        format!(
            "cd {} && tar -xJf $(ls metadata*.tar.xz) && tar -xJf $(ls sequence*.tar.xz) && rm *.tar.xz",
            config.import_dir
        ),
        &["retrieve_meta", "retrieve_fasta"],
    );
    dag.add_step("translate_tsv", Step::TranslateTsv, &["untar_files"]);
    dag.add_step("rename_translated", Step::RenameTranslated, &["translate_tsv"]);
    dag.add_step("split_out_new", Step::SplitOutNew, &["rename_translated"]);
    dag.add_step("import_tsv", Step::ImportTsv, &["split_out_new"]);
    dag.add_step(
        "update_with_sequences",
        Step::UpdateWithSequences,
        &["import_tsv"],
    );
    dag.add_step("move_files", Step::MoveFiles, &["update_with_sequences"]);
    dag
}

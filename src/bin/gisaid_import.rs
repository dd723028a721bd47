use std::collections::HashSet;
use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use gisaid_import::app::{App, RunOptions};
use gisaid_import::config::ConfigLoader;
use gisaid_import::db::{MongoRecordStore, RecordStore};
use gisaid_import::domain::IsolateRecord;
use gisaid_import::error::ImportError;
use gisaid_import::output::JsonOutput;

#[derive(Parser)]
#[command(name = "gisaid-import")]
#[command(about = "Import pipeline for GISAID genomic surveillance records")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the full import DAG in dependency order")]
    Run(RunArgs),
    #[command(about = "Rewrite metadata.tsv headers into the canonical vocabulary")]
    TranslateTsv,
    #[command(about = "Move translate.tsv over metadata.tsv")]
    RenameTranslated,
    #[command(about = "Split out records not yet in the database (new.tsv, new.fasta)")]
    SplitOutNew,
    #[command(about = "Insert new.tsv records into the records collection")]
    ImportTsv,
    #[command(about = "Fill in sequence text on records missing one")]
    UpdateSequences(UpdateArgs),
    #[command(about = "Move processed files to the imported directory")]
    Archive,
}

#[derive(Args)]
struct RunArgs {
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct UpdateArgs {
    #[arg(short, long, help = "fasta to update")]
    input: String,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(import) = report.downcast_ref::<ImportError>() {
            return ExitCode::from(map_exit_code(import));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ImportError) -> u8 {
    match error {
        ImportError::MissingConfig
        | ImportError::ConfigRead(_)
        | ImportError::ConfigParse(_)
        | ImportError::InputNotFound(_)
        | ImportError::MissingColumn(_)
        | ImportError::InvalidAccession(_) => 2,
        ImportError::Database(_) | ImportError::TaskFailed { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?;

    match cli.command {
        Commands::Run(args) => {
            let store = MongoRecordStore::connect(&config.database_uri).into_diagnostic()?;
            let app = App::new(store, config);
            let result = app
                .run(RunOptions {
                    dry_run: args.dry_run,
                })
                .into_diagnostic()?;
            JsonOutput::print_run(&result).into_diagnostic()?;
        }
        Commands::TranslateTsv => {
            let app = App::new(NopStore, config);
            let result = app.translate().into_diagnostic()?;
            JsonOutput::print_translate(&result).into_diagnostic()?;
        }
        Commands::RenameTranslated => {
            let app = App::new(NopStore, config);
            let result = app.rename_translated().into_diagnostic()?;
            JsonOutput::print_rename(&result).into_diagnostic()?;
        }
        Commands::SplitOutNew => {
            let store = MongoRecordStore::connect(&config.database_uri).into_diagnostic()?;
            let app = App::new(store, config);
            let result = app.split_out_new().into_diagnostic()?;
            JsonOutput::print_filter(&result).into_diagnostic()?;
        }
        Commands::ImportTsv => {
            let store = MongoRecordStore::connect(&config.database_uri).into_diagnostic()?;
            let app = App::new(store, config);
            let result = app.submit().into_diagnostic()?;
            JsonOutput::print_submit(&result).into_diagnostic()?;
        }
        Commands::UpdateSequences(args) => {
            let store = MongoRecordStore::connect(&config.database_uri).into_diagnostic()?;
            let app = App::new(store, config);
            let input = Utf8PathBuf::from(args.input);
            let result = app.update_sequences(Some(&input)).into_diagnostic()?;
            JsonOutput::print_update(&result).into_diagnostic()?;
        }
        Commands::Archive => {
            let app = App::new(NopStore, config);
            let result = app.archive().into_diagnostic()?;
            JsonOutput::print_archive(&result).into_diagnostic()?;
        }
    }

    Ok(())
}

/// Stand-in for steps that never touch the database.
struct NopStore;

impl RecordStore for NopStore {
    fn known_accessions(&self) -> Result<HashSet<String>, ImportError> {
        Err(ImportError::Database(
            "record store not configured".to_string(),
        ))
    }

    fn missing_sequence_names(&self) -> Result<Vec<String>, ImportError> {
        Err(ImportError::Database(
            "record store not configured".to_string(),
        ))
    }

    fn set_sequence(&self, _name: &str, _seq: &str) -> Result<(), ImportError> {
        Err(ImportError::Database(
            "record store not configured".to_string(),
        ))
    }

    fn insert_records(&self, _records: &[IsolateRecord]) -> Result<u64, ImportError> {
        Err(ImportError::Database(
            "record store not configured".to_string(),
        ))
    }
}

//! Command line entry point
//!
//! Usage:
//!   study-measures run --input <dir|file.parquet> --study <name|file.json> [--output <dir>]
//!   study-measures export <name> <file.json>
//!   study-measures list

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use log::info;

use study_measures::algorithm::population::CohortStatistics;
use study_measures::config::{DEFAULT_ID_COLUMN, StudyConfig};
use study_measures::study::{self, BUILTIN_STUDIES};
use study_measures::utils::io::{
    find_parquet_files, load_patient_records_parallel, load_study_definition,
    read_patient_records, save_study_definition, write_measure_csv,
};
use study_measures::{PatientRecord, StudyDefinition};

#[global_allocator]
static ALLOC: snmalloc_rs::SnMalloc = snmalloc_rs::SnMalloc;

#[derive(Parser)]
#[command(name = "study-measures")]
#[command(about = "Compute stratified measure tables over extracted patient records")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select the cohort and write one CSV per measure
    Run {
        /// Parquet file or directory of Parquet files with one row per patient
        #[arg(short, long)]
        input: PathBuf,

        /// Built-in study name or path to a JSON study definition
        #[arg(short, long)]
        study: String,

        /// Directory for the measure tables
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Name of the patient identifier column
        #[arg(long, default_value = DEFAULT_ID_COLUMN)]
        id_column: String,

        /// Number of counting workers (defaults to one per CPU)
        #[arg(short, long)]
        workers: Option<usize>,

        /// Record count from which counting runs in parallel
        #[arg(long)]
        parallel_threshold: Option<usize>,
    },

    /// Write a built-in study definition as JSON
    Export {
        /// Built-in study name
        study: String,

        /// Destination JSON file
        path: PathBuf,
    },

    /// List the built-in studies
    List,
}

fn resolve_study(name: &str) -> anyhow::Result<StudyDefinition> {
    if let Some(definition) = study::builtin(name) {
        return Ok(definition);
    }
    let path = Path::new(name);
    if path.is_file() {
        return load_study_definition(path)
            .with_context(|| format!("failed to load study definition {}", path.display()));
    }
    bail!(
        "unknown study '{name}': expected one of {} or a JSON file",
        BUILTIN_STUDIES.join(", ")
    )
}

fn load_records(input: &Path, id_column: &str) -> anyhow::Result<Vec<PatientRecord>> {
    if input.is_dir() {
        let files = find_parquet_files(input)?;
        if files.is_empty() {
            bail!("no Parquet files found in {}", input.display());
        }
        Ok(load_patient_records_parallel(&files, id_column)?)
    } else {
        read_patient_records(input, id_column)
            .with_context(|| format!("failed to read {}", input.display()))
    }
}

fn run(input: &Path, definition: &StudyDefinition, config: &StudyConfig) -> anyhow::Result<()> {
    let start = Instant::now();
    info!("{config}");
    info!("{definition}");

    let records = load_records(input, &config.id_column)?;
    let run = definition
        .run(records, &config.aggregator)
        .with_context(|| format!("study '{}' failed", definition.name))?;

    let written = write_measure_csv(
        &config.output_dir,
        &definition.measures,
        &run.results,
        run.index_date,
    )?;

    info!("\n{}", CohortStatistics::generate_summary(&run));
    info!(
        "Wrote {} measure tables to {} in {:?}",
        written.len(),
        config.output_dir.display(),
        start.elapsed()
    );
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            input,
            study,
            output,
            id_column,
            workers,
            parallel_threshold,
        } => {
            let definition = resolve_study(&study)?;
            let mut config = StudyConfig {
                id_column,
                output_dir: output,
                ..StudyConfig::default()
            };
            config.aggregator.workers = workers;
            if let Some(threshold) = parallel_threshold {
                config.aggregator.parallel_threshold = threshold;
            }
            run(&input, &definition, &config)
        }
        Commands::Export { study, path } => {
            let Some(definition) = study::builtin(&study) else {
                bail!("unknown built-in study '{study}'");
            };
            save_study_definition(&definition, &path)?;
            Ok(())
        }
        Commands::List => {
            for name in BUILTIN_STUDIES {
                if let Some(definition) = study::builtin(name) {
                    println!("{name}: {} measures", definition.measures.len());
                }
            }
            Ok(())
        }
    }
}

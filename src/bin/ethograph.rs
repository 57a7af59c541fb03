//! Ethograph CLI - thin wrapper around the compute engine
//!
//! Commands:
//! - stack: join features and behavior scores into one delimited table
//! - graph: build the social-interaction graph as a JSON document
//! - validate: classify records and report their shapes

use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use ethograph::export::GraphDocument;
use ethograph::graph::GraphConfig;
use ethograph::{
    ExperimentAggregator, ExtractError, InteractionGraphBuilder, NormalizedRecord,
    RecordNormalizer, Selection, TimeSeriesStacker, ETHOGRAPH_VERSION,
};

/// Ethograph - tracker recordings to time series and interaction graphs
#[derive(Parser)]
#[command(name = "ethograph")]
#[command(version = ETHOGRAPH_VERSION)]
#[command(about = "Turn tracker recordings into time series and interaction graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stack features and behavior scores into one delimited table
    Stack {
        /// Record file (repeatable; use - for stdin). The file name drives
        /// feature and behavior naming.
        #[arg(short, long = "record", required = true)]
        records: Vec<PathBuf>,

        /// Features to stack: "all", "none", or comma-separated names
        #[arg(long, default_value = "all")]
        features: String,

        /// Raw scores to stack: "all", "none", or comma-separated names
        #[arg(long, default_value = "all")]
        raw_scores: String,

        /// Processed scores to stack: "all", "none", or comma-separated names
        #[arg(long, default_value = "all")]
        processed_scores: String,

        /// Trajectory attributes to extract as a feature, comma-separated
        /// (repeatable)
        #[arg(long = "extract")]
        extracts: Vec<String>,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// Field delimiter
        #[arg(long, default_value = ",")]
        delimiter: char,
    },

    /// Build the interaction graph and write it as a JSON document
    Graph {
        /// Record file (repeatable; use - for stdin)
        #[arg(short, long = "record", required = true)]
        records: Vec<PathBuf>,

        /// Feature holding per-entity distances to the group center
        #[arg(long, default_value = "dcenter")]
        distance_feature: String,

        /// Distance at or under which entities count as co-located
        #[arg(long, default_value = "2.0")]
        distance_threshold: f64,

        /// Behavior whose processed score gates samples
        #[arg(long)]
        behavior: Option<String>,

        /// Processed score at or over which a sample passes the gate
        #[arg(long, default_value = "0.5")]
        behavior_threshold: f64,

        /// One-second samples dropped from the start
        #[arg(long, default_value = "0")]
        burn_in: usize,

        /// Recording frame rate
        #[arg(long, default_value = "30")]
        samples_per_second: usize,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,
    },

    /// Classify records and report their shapes
    Validate {
        /// Record file (repeatable; use - for stdin)
        #[arg(short, long = "record", required = true)]
        records: Vec<PathBuf>,

        /// Output the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), EthographCliError> {
    match cli.command {
        Commands::Stack {
            records,
            features,
            raw_scores,
            processed_scores,
            extracts,
            output,
            delimiter,
        } => cmd_stack(
            &records,
            &features,
            &raw_scores,
            &processed_scores,
            &extracts,
            &output,
            delimiter,
        ),

        Commands::Graph {
            records,
            distance_feature,
            distance_threshold,
            behavior,
            behavior_threshold,
            burn_in,
            samples_per_second,
            output,
        } => cmd_graph(
            &records,
            GraphConfig {
                distance_feature,
                distance_threshold,
                behavior,
                behavior_threshold,
                burn_in_seconds: burn_in,
                samples_per_second,
            },
            &output,
        ),

        Commands::Validate { records, json } => cmd_validate(&records, json),
    }
}

fn cmd_stack(
    records: &[PathBuf],
    features: &str,
    raw_scores: &str,
    processed_scores: &str,
    extracts: &[String],
    output: &Path,
    delimiter: char,
) -> Result<(), EthographCliError> {
    let normalized = load_records(records)?;

    let extract_sets: Vec<Vec<&str>> = extracts
        .iter()
        .map(|set| set.split(',').map(str::trim).collect())
        .collect();
    let extract_refs: Vec<&[&str]> = extract_sets.iter().map(Vec::as_slice).collect();

    let experiment = ExperimentAggregator::with_trajectory_features(normalized, &extract_refs)?;
    let stacker = TimeSeriesStacker::new(&experiment);
    let stacked = stacker.stack(
        &parse_selection(features),
        &parse_selection(raw_scores),
        &parse_selection(processed_scores),
    )?;

    write_output(output, &stacked.to_delimited(delimiter))
}

fn cmd_graph(
    records: &[PathBuf],
    config: GraphConfig,
    output: &Path,
) -> Result<(), EthographCliError> {
    let normalized = load_records(records)?;
    let experiment = ExperimentAggregator::from_records(normalized)?;

    let graph = InteractionGraphBuilder::new(&experiment).build(&config)?;
    let document = GraphDocument::new(graph, config);

    write_output(output, &document.to_json()?)
}

fn cmd_validate(records: &[PathBuf], json: bool) -> Result<(), EthographCliError> {
    let mut report = ValidationReport {
        total_records: records.len(),
        valid_records: 0,
        invalid_records: 0,
        records: Vec::new(),
    };

    for path in records {
        let source = path.to_string_lossy().to_string();
        let outcome = read_record(path).and_then(|raw| {
            RecordNormalizer::normalize_json(&raw, &source).map_err(EthographCliError::from)
        });
        match outcome {
            Ok(record) => {
                report.valid_records += 1;
                report.records.push(RecordReport {
                    source,
                    shape: Some(record.shape().to_string()),
                    error: None,
                });
            }
            Err(e) => {
                report.invalid_records += 1;
                report.records.push(RecordReport {
                    source,
                    shape: None,
                    error: Some(CliError::from(e).message),
                });
            }
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for entry in &report.records {
            match (&entry.shape, &entry.error) {
                (Some(shape), _) => println!("{}: {shape}", entry.source),
                (None, Some(error)) => println!("{}: INVALID ({error})", entry.source),
                (None, None) => unreachable!(),
            }
        }
        println!(
            "{} of {} records valid",
            report.valid_records, report.total_records
        );
    }

    if report.invalid_records > 0 {
        Err(EthographCliError::ValidationFailed(report.invalid_records))
    } else {
        Ok(())
    }
}

fn load_records(paths: &[PathBuf]) -> Result<Vec<NormalizedRecord>, EthographCliError> {
    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        let raw = read_record(path)?;
        let source = path.to_string_lossy();
        records.push(RecordNormalizer::normalize_json(&raw, &source)?);
    }
    Ok(records)
}

fn read_record(path: &Path) -> Result<String, EthographCliError> {
    if path.to_string_lossy() == "-" {
        if atty::is(atty::Stream::Stdin) {
            return Err(EthographCliError::StdinIsTty);
        }
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn write_output(path: &Path, contents: &str) -> Result<(), EthographCliError> {
    if path.to_string_lossy() == "-" {
        io::stdout().write_all(contents.as_bytes())?;
        Ok(())
    } else {
        Ok(fs::write(path, contents)?)
    }
}

fn parse_selection(value: &str) -> Selection {
    match value {
        "all" => Selection::All,
        "none" | "" => Selection::none(),
        names => Selection::Named(
            names
                .split(',')
                .map(|name| name.trim().to_string())
                .collect(),
        ),
    }
}

// Error types

#[derive(Debug)]
enum EthographCliError {
    Io(io::Error),
    Extract(ExtractError),
    Json(serde_json::Error),
    StdinIsTty,
    ValidationFailed(usize),
}

impl From<io::Error> for EthographCliError {
    fn from(e: io::Error) -> Self {
        EthographCliError::Io(e)
    }
}

impl From<ExtractError> for EthographCliError {
    fn from(e: ExtractError) -> Self {
        EthographCliError::Extract(e)
    }
}

impl From<serde_json::Error> for EthographCliError {
    fn from(e: serde_json::Error) -> Self {
        EthographCliError::Json(e)
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<EthographCliError> for CliError {
    fn from(e: EthographCliError) -> Self {
        match e {
            EthographCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            EthographCliError::Extract(e) => CliError {
                code: "EXTRACT_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Run 'ethograph validate' on the input records".to_string()),
            },
            EthographCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            EthographCliError::StdinIsTty => CliError {
                code: "STDIN_IS_TTY".to_string(),
                message: "Record input '-' requires piped stdin".to_string(),
                hint: Some("Pipe a record into the command or pass a file path".to_string()),
            },
            EthographCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{count} records failed validation"),
                hint: Some("Fix the reported records and retry".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct ValidationReport {
    total_records: usize,
    valid_records: usize,
    invalid_records: usize,
    records: Vec<RecordReport>,
}

#[derive(serde::Serialize)]
struct RecordReport {
    source: String,
    shape: Option<String>,
    error: Option<String>,
}

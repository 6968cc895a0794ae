use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use rowpipe::config::{PipelineConfig, load_config_file};
use rowpipe::pipeline::validation::format_issues;
use rowpipe::pipeline::{ExecutionContext, ExecutionStats, PipelineSpec};
use rowpipe::record::{Record, Schema};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

#[derive(Parser)]
#[command(name = "rowpipe", about = "Run record transformation pipelines")]
pub struct Cli {
    /// Default log level; RUST_LOG overrides it
    #[arg(long, global = true, default_value = "warn", env = "ROWPIPE_LOG")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Apply a pipeline spec to a JSON record set
    Run {
        /// Path to the pipeline spec (JSON)
        #[arg(short, long)]
        spec: PathBuf,

        /// Input file: {"columns": [...], "records": [...]}
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path. Defaults to stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include execution statistics in the output
        #[arg(long)]
        stats: bool,

        /// Path to a JSON execution config file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Abort the run after this many milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// Check a pipeline spec without running it
    Validate {
        /// Path to the pipeline spec (JSON)
        #[arg(short, long)]
        spec: PathBuf,
    },
}

/// Record set as read from and written to disk.
#[derive(Debug, Serialize, Deserialize)]
struct RecordSet {
    #[serde(default)]
    columns: Vec<String>,
    records: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none", skip_deserializing)]
    stats: Option<ExecutionStats>,
}

pub fn run_command(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            spec,
            input,
            output,
            stats,
            config,
            timeout_ms,
        } => handle_run(&spec, &input, output.as_deref(), stats, config.as_deref(), timeout_ms),
        Commands::Validate { spec } => handle_validate(&spec),
    }
}

fn handle_run(
    spec_path: &Path,
    input_path: &Path,
    output_path: Option<&Path>,
    with_stats: bool,
    config_path: Option<&Path>,
    timeout_ms: Option<u64>,
) -> Result<()> {
    let spec = PipelineSpec::from_file(spec_path)?;
    let pipeline = spec.build_pipeline()?;
    let config = match config_path {
        Some(path) => load_config_file(path)?,
        None => PipelineConfig::default(),
    };

    let input = load_records(input_path)?;
    let schema = Schema::new(input.columns);

    let mut ctx = ExecutionContext::new().with_config(config);
    if let Some(ms) = timeout_ms {
        ctx = ctx.with_deadline(Instant::now() + Duration::from_millis(ms));
    }

    tracing::info!(
        "Running pipeline '{}' ({} steps) on {} records",
        spec.name,
        pipeline.len(),
        input.records.len()
    );
    let output = pipeline
        .run(&input.records, &schema, &ctx)
        .with_context(|| format!("Pipeline '{}' failed", spec.name))?;

    let result = RecordSet {
        columns: output.schema.columns().to_vec(),
        records: output.records,
        stats: with_stats.then_some(output.stats),
    };
    let json = serde_json::to_string_pretty(&result).context("Failed to serialize output")?;

    match output_path {
        Some(path) => {
            std::fs::write(path, json)
                .with_context(|| format!("Failed to write output: {}", path.display()))?;
            tracing::info!("Output written to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn handle_validate(spec_path: &Path) -> Result<()> {
    let spec = PipelineSpec::from_file(spec_path)?;
    let issues = spec.validate();
    if !issues.is_empty() {
        anyhow::bail!("Pipeline validation failed:\n{}", format_issues(&issues));
    }
    println!("Pipeline '{}' is valid ({} steps)", spec.name, spec.steps.len());
    Ok(())
}

fn load_records(path: &Path) -> Result<RecordSet> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input file: {}", path.display()))?;
    serde_json::from_str(&content).context("Failed to parse input records JSON")
}

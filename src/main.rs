// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command line front end: runs the transition pipeline over a delimited log
//! file or a seeded synthetic stream and prints one JSON snapshot per line.

use clap::{Parser, Subcommand, ValueEnum};
use std::io::Write;
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use tfgen_rust::core::{
    discover_event_classes, discover_top_event_classes, CompletionPolicy, EventClassifier,
    LogReader, LogReaderConfig, MatrixVariant, PipelineConfig, StreamOutput,
    SyntheticSourceConfig, SyntheticTraceSource, TfgenError, TfgenResult, TransitionPipeline,
};

#[derive(Parser)]
#[command(
    name = "tfgen",
    about = "Streaming transition-frequency features over process event logs",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Process a delimited log file and print one JSON snapshot per line.
    Run(RunArgs),
    /// Stream a seeded synthetic log through the pipeline.
    Demo(DemoArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// Input log file.
    file: PathBuf,

    /// Field delimiter.
    #[arg(long, default_value = ",")]
    delimiter: char,

    /// Treat the first non-empty line as a header.
    #[arg(long)]
    header: bool,

    /// Zero-based column holding the case identifier.
    #[arg(long, default_value_t = 0)]
    case_column: usize,

    /// Zero-based attribute columns, comma separated, in tuple order.
    #[arg(long, value_delimiter = ',', default_value = "1")]
    attribute_columns: Vec<usize>,

    /// Log and skip rows with missing columns instead of failing.
    #[arg(long)]
    skip_malformed: bool,

    /// Transitions held in the sliding window.
    #[arg(long, default_value_t = 500)]
    window_size: usize,

    /// Snapshot representation.
    #[arg(long, value_enum, default_value_t = VariantArg::Dense)]
    variant: VariantArg,

    /// Keep only the N most frequent event classes; the rest map to the
    /// default token.
    #[arg(long)]
    top_classes: Option<usize>,

    /// Exact matrix recount every N transitions.
    #[arg(long)]
    resync_interval: Option<u64>,
}

#[derive(clap::Args)]
struct DemoArgs {
    /// Concurrently interleaved cases.
    #[arg(long, default_value_t = 5)]
    cases: usize,

    /// Activity vocabulary size.
    #[arg(long, default_value_t = 8)]
    classes: usize,

    /// Samples to generate.
    #[arg(long, default_value_t = 1000)]
    events: usize,

    /// Chance that a sample closes its trace.
    #[arg(long, default_value_t = 0.05)]
    end_probability: f64,

    #[arg(long, default_value_t = 7)]
    seed: u64,

    /// Transitions held in the sliding window.
    #[arg(long, default_value_t = 50)]
    window_size: usize,

    /// Snapshot representation.
    #[arg(long, value_enum, default_value_t = VariantArg::Dense)]
    variant: VariantArg,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum VariantArg {
    Dense,
    CompressedSparse,
}

impl From<VariantArg> for MatrixVariant {
    fn from(value: VariantArg) -> Self {
        match value {
            VariantArg::Dense => MatrixVariant::Dense,
            VariantArg::CompressedSparse => MatrixVariant::CompressedSparse,
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Run(args) => run_file(args),
        Command::Demo(args) => run_demo(args),
    };

    if let Err(err) = result {
        eprintln!("fatal: {err}");
        process::exit(1);
    }
}

fn run_file(args: RunArgs) -> TfgenResult<()> {
    let reader = LogReader::new(LogReaderConfig {
        delimiter: args.delimiter,
        has_header: args.header,
        case_column: args.case_column,
        attribute_columns: args.attribute_columns,
        skip_malformed: args.skip_malformed,
    })?;
    let rows = reader.read_path(&args.file)?;

    // Halt on end of stream: a one-shot run has no second data set, and the
    // final counters stay readable for the summary line.
    let config = PipelineConfig {
        window_size: args.window_size,
        variant: args.variant.into(),
        resync_interval: args.resync_interval,
        completion: CompletionPolicy::Halt,
        ..PipelineConfig::default()
    };
    let classifier = EventClassifier::new(
        &config.reserved,
        config.attribute_separator.as_str(),
        config.end_of_trace_marker.as_str(),
    );

    let attribute_rows: Vec<_> = rows.iter().map(|s| s.attributes.clone()).collect();
    let classes = match args.top_classes {
        Some(n) => discover_top_event_classes(&attribute_rows, &classifier, n),
        None => discover_event_classes(&attribute_rows, &classifier),
    };
    log::info!(
        "discovered {} event classes across {} rows",
        classes.len(),
        rows.len()
    );

    let mut pipeline = TransitionPipeline::new(&classes, config)?;
    pipeline.load_bulk(rows, &args.file.display().to_string())?;

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    let mut emitted = 0usize;
    for snapshot in pipeline.snapshots()? {
        let line = serde_json::to_string(&snapshot)
            .map_err(|e| TfgenError::parse(format!("snapshot serialization failed: {e}")))?;
        writeln!(out, "{line}")?;
        emitted += 1;
    }
    out.flush()?;

    let metrics = pipeline.metrics();
    log::info!(
        "done: {} snapshots from {} events ({} unknown classes)",
        emitted,
        metrics.events_processed,
        metrics.unknown_classes
    );
    Ok(())
}

fn run_demo(args: DemoArgs) -> TfgenResult<()> {
    let source = SyntheticTraceSource::new(SyntheticSourceConfig {
        cases: args.cases,
        classes: args.classes,
        events: args.events,
        end_probability: args.end_probability,
        seed: args.seed,
        ..SyntheticSourceConfig::default()
    })?;
    let classes = source.vocabulary();

    let config = PipelineConfig {
        name: "tfgen-demo".to_string(),
        window_size: args.window_size,
        variant: args.variant.into(),
        ..PipelineConfig::default()
    };
    let mut pipeline = TransitionPipeline::new(&classes, config)?;
    pipeline.load_stream(source)?;

    // Every sample applies exactly one transition and every post-warm-up
    // sample emits one snapshot, so the output count is known up front.
    let expected = args.events.saturating_sub(args.window_size - 1);

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    let mut emitted = 0usize;
    while emitted < expected {
        match pipeline.pull_next_timeout(Duration::from_secs(10))? {
            StreamOutput::Snapshot(snapshot) => {
                let line = serde_json::to_string(&snapshot)
                    .map_err(|e| TfgenError::parse(format!("snapshot serialization failed: {e}")))?;
                writeln!(out, "{line}")?;
                emitted += 1;
            }
            StreamOutput::EndOfStream => break,
        }
    }
    out.flush()?;

    let metrics = pipeline.metrics();
    log::info!(
        "demo done: {} snapshots from {} events, {} open cases at the end",
        emitted,
        metrics.events_processed,
        metrics.open_cases
    );

    pipeline.terminate()?;
    match pipeline.pull_next_timeout(Duration::from_secs(10))? {
        StreamOutput::EndOfStream => Ok(()),
        StreamOutput::Snapshot(_) => Err(TfgenError::engine_stopped(
            "unexpected snapshot after the stream drained",
        )),
    }
}

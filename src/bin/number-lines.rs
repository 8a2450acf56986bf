//! CLI tool to number the lines of a (large) text file.
//!
//! Usage:
//!   number-lines <input>
//!   number-lines <input> -o <output> --high-water-mark 65536
//!
//! If no output file is specified, writes to stdout. An input of `-` reads
//! stdin.

use clap::Parser;
use linestream_rs::sink::DEFAULT_TERMINATOR;
use linestream_rs::{
    ChunkSource, Encoding, Pipeline, PipelineConfig, PipelineError, ReaderSource, RunSummary,
    WriterSink, parse_delimiter,
};
use std::io;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Prefix every line of a file with its line number, streaming.
#[derive(Parser)]
#[command(name = "number-lines")]
struct Cli {
    /// Input text file, or - for stdin
    input: String,

    /// Write output to file instead of stdout
    #[arg(short, long)]
    output: Option<String>,

    /// Maximum bytes read per chunk
    #[arg(long, default_value_t = linestream_rs::DEFAULT_HIGH_WATER_MARK)]
    high_water_mark: usize,

    /// Input encoding: utf8, utf8-lossy or latin1
    #[arg(long, default_value = "utf8")]
    encoding: Encoding,

    /// Line delimiter; accepts \n, \r, \t and \\ escapes
    #[arg(long, default_value = "\\n")]
    delimiter: String,

    /// Write records as-is, without an extra line terminator
    #[arg(long)]
    raw: bool,

    /// Fail if a single read or write takes longer than this
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Print the run duration on stderr
    #[arg(long)]
    timing: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "linestream_rs=warn",
        1 => "linestream_rs=debug",
        _ => "linestream_rs=trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn build_config(cli: &Cli) -> Result<PipelineConfig, PipelineError> {
    let mut config = PipelineConfig::new()
        .with_high_water_mark(cli.high_water_mark)
        .with_encoding(cli.encoding)
        .with_delimiter(parse_delimiter(&cli.delimiter)?);
    if let Some(ms) = cli.timeout_ms {
        config = config.with_op_timeout(Duration::from_millis(ms));
    }
    config.validate()?;
    Ok(config)
}

fn run_with<S: ChunkSource>(
    cli: &Cli,
    config: PipelineConfig,
    source: S,
) -> Result<RunSummary, PipelineError> {
    let mut pipeline = Pipeline::new(config)?;
    let terminator = if cli.raw { "" } else { DEFAULT_TERMINATOR };
    match &cli.output {
        Some(path) => {
            let sink = WriterSink::create(path)?.terminated_by(terminator);
            pipeline.run(source, sink)
        }
        None => {
            let sink = WriterSink::with_terminator(io::stdout().lock(), terminator);
            pipeline.run(source, sink)
        }
    }
}

fn run(cli: &Cli) -> Result<RunSummary, PipelineError> {
    let config = build_config(cli)?;
    if cli.input == "-" {
        let source = ReaderSource::new(io::stdin().lock(), &config);
        run_with(cli, config, source)
    } else {
        let source = ReaderSource::open(&cli.input, &config)?;
        run_with(cli, config, source)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli) {
        Ok(summary) => {
            if cli.timing {
                eprintln!(
                    "{} records in {:.3} ms",
                    summary.records,
                    summary.elapsed.as_secs_f64() * 1000.0
                );
            }
            ExitCode::SUCCESS
        }
        Err(PipelineError::Sink(e))
            if std::error::Error::source(&e)
                .and_then(|s| s.downcast_ref::<io::Error>())
                .is_some_and(|e| e.kind() == io::ErrorKind::BrokenPipe) =>
        {
            // Downstream closed early (e.g. piped to `head`).
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use neobatch::config::{WriterConfig, PROGRESS_INTERVAL};
use neobatch::input::EntityReader;
use neobatch::ontology::StaticOntology;
use neobatch::verify::verify_output;
use neobatch::BatchWriter;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::{Duration, Instant};
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser)]
#[command(name = "neobatch")]
#[command(about = "Write graph entities as neo4j-admin import CSV files")]
struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream entities into header/part CSV files and the import call
    Write(WriteArgs),
    /// Check that every part file line matches its header
    Verify(VerifyArgs),
}

#[derive(Args)]
struct FormatArgs {
    /// Field delimiter
    #[arg(long)]
    delimiter: Option<String>,

    /// Delimiter between array elements inside a field
    #[arg(long)]
    array_delimiter: Option<String>,

    /// Quote character for string fields
    #[arg(long)]
    quote: Option<String>,
}

#[derive(Args)]
struct WriteArgs {
    /// JSON Lines file of entities (.jsonl or .jsonl.bz2)
    #[arg(short, long)]
    input: PathBuf,

    /// Ontology schema file (JSON)
    #[arg(short, long)]
    schema: Option<PathBuf>,

    /// Output directory (defaults to a timestamped directory)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Writer configuration file (JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of entities per part file
    #[arg(long)]
    batch_size: Option<usize>,

    #[command(flatten)]
    format: FormatArgs,

    /// Database name used in the import call
    #[arg(long)]
    db_name: Option<String>,

    /// Pass --skip-bad-relationships=true to the loader
    #[arg(long)]
    skip_bad_relationships: bool,

    /// Pass --skip-duplicate-nodes=true to the loader
    #[arg(long)]
    skip_duplicate_nodes: bool,

    /// Pass --force=true to the loader, overwriting the target database
    #[arg(long)]
    wipe: bool,
}

#[derive(Args)]
struct VerifyArgs {
    /// Output directory to check
    #[arg(short, long)]
    output: PathBuf,

    /// Writer configuration file (JSON), for delimiter and quote
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(flatten)]
    format: FormatArgs,
}

fn load_config(path: Option<&PathBuf>, format: &FormatArgs) -> Result<WriterConfig> {
    let mut config = match path {
        Some(p) => WriterConfig::from_file(p)
            .with_context(|| format!("Failed to load config: {}", p.display()))?,
        None => WriterConfig::default(),
    };
    if let Some(d) = &format.delimiter {
        config.delimiter = d.clone();
    }
    if let Some(d) = &format.array_delimiter {
        config.array_delimiter = d.clone();
    }
    if let Some(q) = &format.quote {
        config.quote = q.clone();
    }
    Ok(config)
}

fn make_spinner() -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn run_write(args: WriteArgs) -> Result<()> {
    let mut config = load_config(args.config.as_ref(), &args.format)?;
    if let Some(output) = args.output {
        config.output_dir = Some(output);
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(db_name) = args.db_name {
        config.db_name = db_name;
    }
    config.skip_bad_relationships |= args.skip_bad_relationships;
    config.skip_duplicate_nodes |= args.skip_duplicate_nodes;
    config.wipe |= args.wipe;

    let ontology = match &args.schema {
        Some(path) => StaticOntology::from_file(path)
            .with_context(|| format!("Failed to load schema: {}", path.display()))?,
        None => StaticOntology::new(),
    };
    info!(labels = ontology.len(), "Ontology loaded");

    let mut writer =
        BatchWriter::new(config, Box::new(ontology)).context("Failed to set up writer")?;
    let reader = EntityReader::open(&args.input)
        .with_context(|| format!("Failed to open input: {}", args.input.display()))?;

    let start = Instant::now();
    let pb = make_spinner()?;
    let mut seen = 0u64;
    let entities = reader.inspect(|_| {
        seen += 1;
        if seen % PROGRESS_INTERVAL == 0 {
            pb.set_message(format!("{seen} entities"));
        }
    });

    let stats = writer
        .try_write(entities)
        .with_context(|| format!("Failed to write entities from {}", args.input.display()))?;
    pb.finish_and_clear();

    let call_path = writer.write_call().context("Failed to write import call")?;

    println!();
    println!("=== Summary ===");
    println!("Output directory:   {}", writer.outdir().display());
    println!("Import call:        {}", call_path.display());
    println!("Total time:         {:.2}s", start.elapsed().as_secs_f64());
    println!();
    println!("Entities processed: {}", stats.processed);
    println!("Entities written:   {}", stats.written);
    println!("Duplicates dropped: {}", stats.duplicates);
    println!("Malformed edges:    {}", stats.malformed_edges);
    println!("Part files:         {}", stats.part_files);
    println!("Headers written:    {}", stats.headers);

    Ok(())
}

fn run_verify(args: VerifyArgs) -> Result<()> {
    let config = load_config(args.config.as_ref(), &args.format)?;
    let report = verify_output(&args.output, &config.format())
        .with_context(|| format!("Failed to verify {}", args.output.display()))?;

    for label in &report.labels {
        println!(
            "{:<30} {:>3} columns {:>5} parts {:>10} rows {:>6} misaligned",
            label.label,
            label.columns,
            label.part_files,
            label.rows,
            label.misaligned.len()
        );
    }

    if !report.is_ok() {
        anyhow::bail!("Output in {} has misaligned lines", args.output.display());
    }
    println!("All {} rows match their headers.", report.rows());
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // RUST_LOG, when set, overrides -v.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let result = match cli.command {
        Commands::Write(args) => run_write(args),
        Commands::Verify(args) => run_verify(args),
    };

    match result {
        Ok(()) => {
            info!("Completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

//! dbsnp-importer: the extraction CLI.
//!
//! # Usage
//!
//! ```bash
//! # One batch through a cursor, JSON lines on stdout
//! dbsnp-importer import --build 150 --batch 11825 \
//!     --assembly Gallus_gallus-5.0 --assembly-type Primary_Assembly
//!
//! # Every batch, page by page, into a file
//! dbsnp-importer import --build 150 --page-size 5000 -o subsnps.jsonl
//!
//! # Show the SQL and bindings only
//! dbsnp-importer sql --build 150 --batch 11825
//! ```

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use dbsnp_importer::prelude::*;
use dbsnp_importer::query::Scope;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "dbsnp-importer")]
#[command(version)]
#[command(about = "Extract and normalize dbSNP SubSNP records", long_about = None)]
#[command(after_help = "EXAMPLES:
    dbsnp-importer import --build 150 --batch 11825 --assembly Gallus_gallus-5.0 --assembly-type Primary_Assembly
    dbsnp-importer import --build 150 --page-size 5000 -o subsnps.jsonl
    dbsnp-importer sql --build 150 --batch 11825")]
struct Cli {
    /// Config file (default: ./dbsnp-importer.toml, then the user config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database connection URL
    #[arg(long, env = "DBSNP_DATABASE_URL", global = true)]
    database_url: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct Target {
    /// dbSNP build number, e.g. 150 for the b150_* tables
    #[arg(long)]
    build: Option<u32>,

    /// Assembly name matched against contiginfo.group_label
    #[arg(long)]
    assembly: Option<String>,

    /// Accepted contiginfo.group_term values
    #[arg(long = "assembly-type", value_delimiter = ',')]
    assembly_types: Vec<String>,

    /// Schema of the obsvariation table
    #[arg(long)]
    shared_schema: Option<String>,

    /// Batch to extract through a cursor; omit to page through every batch
    #[arg(long)]
    batch: Option<i32>,

    /// Rows per page when paging
    #[arg(long, allow_negative_numbers = true)]
    page_size: Option<i64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract records and write them as JSON lines
    Import {
        #[command(flatten)]
        target: Target,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Rows per cursor FETCH
        #[arg(long)]
        fetch_size: Option<usize>,

        /// Records per sink write
        #[arg(long)]
        chunk_size: Option<usize>,
    },
    /// Print the extraction SQL and its bindings without connecting
    Sql {
        #[command(flatten)]
        target: Target,
    },
}

/// How one pass reads the source.
enum ReadMode {
    Cursor { batch: i32 },
    Paged { page_size: i64 },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "dbsnp_importer=debug"
    } else {
        "dbsnp_importer=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = ImporterConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Sql { target } => {
            let (params, mode) = resolve(target, &config)?;
            show_sql(&params, &mode);
            Ok(())
        }
        Commands::Import {
            target,
            output,
            fetch_size,
            chunk_size,
        } => {
            let (params, mode) = resolve(target, &config)?;
            let fetch_size = fetch_size.unwrap_or(config.import.fetch_size);
            let chunk_size = chunk_size.unwrap_or(config.import.chunk_size);

            let url = cli
                .database_url
                .clone()
                .or_else(|| config.postgres.url.clone())
                .context("No database URL. Use --database-url, DBSNP_DATABASE_URL or [postgres] url")?;

            info!("Connecting to database");
            let db = DbsnpDb::connect(&url, config.postgres.max_connections).await?;

            let writer: Box<dyn Write + Send> = match output {
                Some(path) => Box::new(BufWriter::new(
                    File::create(path)
                        .with_context(|| format!("Failed to create {}", path.display()))?,
                )),
                None => Box::new(BufWriter::new(io::stdout())),
            };
            let mut sink = JsonLinesSink::new(writer);

            let mut reader = match mode {
                ReadMode::Cursor { batch } => {
                    SubSnpReader::open_cursor(db.source(), &params, batch, fetch_size).await?
                }
                ReadMode::Paged { page_size } => {
                    SubSnpReader::open_paged(db.source(), &params, page_size).await?
                }
            };

            let summary = import(&mut reader, &mut sink, chunk_size).await?;
            print_summary(&summary);
            Ok(())
        }
    }
}

/// Merge command-line values over the config file.
fn resolve(target: &Target, config: &ImporterConfig) -> Result<(ExtractionParams, ReadMode)> {
    let build = target
        .build
        .or(config.dbsnp.build)
        .context("No dbSNP build. Use --build or [dbsnp] build")?;
    let assembly = target
        .assembly
        .clone()
        .or_else(|| config.dbsnp.assembly.clone())
        .context("No assembly. Use --assembly or [dbsnp] assembly")?;
    let assembly_types = if target.assembly_types.is_empty() {
        config.dbsnp.assembly_types.clone()
    } else {
        target.assembly_types.clone()
    };
    let shared_schema = target
        .shared_schema
        .clone()
        .unwrap_or_else(|| config.dbsnp.shared_schema.clone());

    let params = ExtractionParams::new(build, assembly, assembly_types).shared_schema(shared_schema);
    let mode = match target.batch {
        Some(batch) => ReadMode::Cursor { batch },
        None => ReadMode::Paged {
            page_size: target.page_size.unwrap_or(config.import.page_size),
        },
    };

    Ok((params, mode))
}

fn show_sql(params: &ExtractionParams, mode: &ReadMode) {
    let query = match mode {
        ReadMode::Cursor { batch } => SubSnpQuery::for_batch(
            params.build,
            *batch,
            params.assembly.clone(),
            params.assembly_types.clone(),
        ),
        ReadMode::Paged { page_size } => SubSnpQuery::for_page(
            params.build,
            Page {
                after: None,
                limit: *page_size,
            },
            params.assembly.clone(),
            params.assembly_types.clone(),
        ),
    }
    .shared_schema(params.shared_schema.clone());

    let label = match query.scope {
        Scope::Batch(_) => "cursor",
        Scope::Paged(_) => "first page",
    };
    println!("{} ({})", "Generated SQL:".green().bold(), label.dimmed());
    println!("{}", query.to_sql().white());
    println!();
    println!("{}", "Bindings:".cyan());
    for (i, bind) in query.binds().iter().enumerate() {
        println!("  ${} = {}", i + 1, bind.to_string().yellow());
    }
}

fn print_summary(summary: &ImportSummary) {
    let elapsed = summary.finished_at - summary.started_at;
    eprintln!(
        "{} {} written, {} filtered, {} rows read in {}s",
        "✓".green(),
        summary.written.to_string().cyan(),
        summary.filtered.to_string().yellow(),
        summary.read,
        elapsed.num_seconds()
    );
}

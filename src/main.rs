//! relsnap - read-only snapshot reporting for a Postgres + object-storage
//! backed catalog.
//!
//! Usage:
//!   relsnap db                      - schema and rows for every known table
//!   relsnap product [--id X --json] - composite report for one product
//!   relsnap storage                 - list objects in the bucket folders
//!   relsnap tree [PATH]             - indented directory tree
//!   relsnap relations               - the fixed table relationship map

mod config;
mod connector;
mod error;
mod fetcher;
mod joiner;
mod model;
mod render;
mod report;
mod storage;
mod tree;

use crate::config::Settings;
use crate::fetcher::PgFetcher;
use crate::storage::StorageClient;
use crate::tree::IgnoreRules;
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "relsnap")]
#[command(about = "Read-only snapshot reports for the product catalog and its storage bucket")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print inferred schema and rows for every configured table
    Db,

    /// Composite report for one product and its related rows
    Product {
        /// Product id; the first product is used when omitted
        #[arg(short, long)]
        id: Option<String>,

        /// Emit the full composite as pretty JSON instead of a summary
        #[arg(long)]
        json: bool,
    },

    /// List objects in the configured storage bucket folders
    Storage,

    /// Print a directory tree with ignore-pattern pruning
    Tree {
        /// Root directory (defaults to the current directory)
        path: Option<PathBuf>,

        /// Additional ignore patterns (substring match)
        #[arg(short = 'I', long = "ignore")]
        ignore: Vec<String>,

        /// Include truncated file contents
        #[arg(long)]
        contents: bool,
    },

    /// Print the fixed table relationship map
    Relations,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::load()?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Db => {
            let pool = connector::connect(&settings.database).await?;
            let source = PgFetcher::new(pool);
            report::database_report(
                &mut out,
                &source,
                &settings.report.tables,
                settings.report.row_limit,
            )
            .await?;
        }

        Commands::Product { id, json } => {
            let pool = connector::connect(&settings.database).await?;
            let source = PgFetcher::new(pool);
            report::product_report(&mut out, &source, id.as_deref(), json).await?;
        }

        Commands::Storage => {
            let bucket = settings.storage.bucket.clone();
            let folders = settings.storage.folders.clone();
            let client = StorageClient::new(settings.storage);
            report::storage_report(&mut out, &client, &bucket, &folders).await?;
        }

        Commands::Tree {
            path,
            ignore,
            contents,
        } => {
            let root = match path {
                Some(path) => path,
                None => std::env::current_dir()?,
            };
            let mut patterns = settings.tree.ignore_patterns.clone();
            patterns.extend(ignore);
            report::tree_report(
                &mut out,
                &root,
                IgnoreRules::new(patterns),
                contents,
                settings.tree.max_content_chars,
            )?;
        }

        Commands::Relations => {
            write!(out, "{}", render::relationship_map(&model::known_relationships()))?;
        }
    }

    Ok(())
}

/// Initialize tracing with an env-filtered subscriber writing to stderr,
/// so report output on stdout stays clean
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,relsnap=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

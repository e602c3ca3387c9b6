//! Meshsync - command line entry point.
//!
//! `meshsync migrate` copies a legacy node dataset into the canonical store,
//! asking the operator to settle overlapping zones and to confirm the
//! result. `meshsync sync` pushes canonical nodes to an external provider.

mod console;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use console::ConsoleDecisions;
use meshsync_core::migration::{RollbackReason, RunDisposition};
use meshsync_core::{
    AdapterConfig, CancellationToken, CanonicalStore, LegacyDataset, LegacySource,
    MigrationConfig, MigrationPipeline, Reconciler, SqliteLegacySource, SynchronizerRegistry,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "meshsync")]
#[command(about = "Migrate legacy mesh nodes and synchronize them with external providers")]
struct Args {
    /// Log verbosity: 0 = warnings, 1 = progress, 2 = every record, 3 = trace
    #[arg(short, long, default_value = "1", global = true)]
    verbosity: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Migrate a legacy dataset into the canonical store
    Migrate {
        /// Canonical store (SQLite)
        #[arg(long)]
        store: PathBuf,

        /// Legacy dataset: a SQLite export, or a JSON dump ending in `.json`
        #[arg(long)]
        legacy: PathBuf,

        /// Migration settings (status mapping, default zone) as JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Keep the results without asking for confirmation
        #[arg(short, long)]
        yes: bool,
    },

    /// Push canonical nodes to an external provider
    Sync {
        /// Canonical store (SQLite)
        #[arg(long)]
        store: PathBuf,

        /// Adapter settings as JSON
        #[arg(long)]
        adapter: PathBuf,

        /// Node to create or update (repeatable, defaults to every node)
        #[arg(long = "node")]
        nodes: Vec<i64>,

        /// Provider-side record to delete (repeatable)
        #[arg(long = "delete")]
        deletes: Vec<String>,

        /// Only check that the adapter can authenticate
        #[arg(long)]
        check: bool,
    },
}

fn log_level(verbosity: u8) -> Level {
    match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    FmtSubscriber::builder()
        .with_max_level(log_level(args.verbosity))
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .init();

    match args.command {
        Command::Migrate {
            store,
            legacy,
            config,
            yes,
        } => migrate(&store, &legacy, config.as_deref(), yes),
        Command::Sync {
            store,
            adapter,
            nodes,
            deletes,
            check,
        } => sync(&store, &adapter, nodes, &deletes, check).await,
    }
}

fn open_legacy(path: &Path) -> Result<Box<dyn LegacySource>> {
    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if is_json {
        Ok(Box::new(LegacyDataset::from_json_file(path)?))
    } else {
        Ok(Box::new(SqliteLegacySource::open(path)?))
    }
}

fn migrate(store: &Path, legacy: &Path, config: Option<&Path>, yes: bool) -> Result<()> {
    let config = match config {
        Some(path) => MigrationConfig::load(path)
            .with_context(|| format!("Loading migration settings from {}", path.display()))?,
        None => MigrationConfig::default(),
    };
    let source = open_legacy(legacy)?;
    let store = CanonicalStore::open(store)?;

    let token = CancellationToken::new();
    let handler_token = token.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupt received, the run will be rolled back at the next phase boundary");
        handler_token.cancel();
    })
    .context("Installing the interrupt handler")?;

    info!("Migrating {}", legacy.display());
    let mut decisions = ConsoleDecisions::new(yes);
    let outcome = MigrationPipeline::new(&store, config)
        .with_cancellation(token)
        .run(source.as_ref(), &mut decisions)?;

    print!("{}", outcome.report);

    match outcome.disposition {
        RunDisposition::Kept => {
            println!("Migration complete.");
            Ok(())
        }
        RunDisposition::RolledBack { reason, report } => {
            for failure in &report.failures {
                warn!("Not rolled back: {} ({})", failure.entity, failure.error);
            }
            match reason {
                RollbackReason::Rejected => {
                    println!("Migration discarded, {} entities removed.", report.total_deleted());
                    Ok(())
                }
                RollbackReason::Cancelled => bail!("Migration interrupted and rolled back"),
                RollbackReason::Fatal(message) => {
                    bail!("Migration failed and was rolled back: {}", message)
                }
            }
        }
    }
}

async fn sync(
    store: &Path,
    adapter: &Path,
    nodes: Vec<i64>,
    deletes: &[String],
    check: bool,
) -> Result<()> {
    let config = AdapterConfig::load(adapter)
        .with_context(|| format!("Loading adapter settings from {}", adapter.display()))?;
    let adapter = SynchronizerRegistry::default().build(config)?;

    if check {
        adapter.clean().await?;
        println!("{}: authentication works.", adapter.provider());
        return Ok(());
    }

    let store = CanonicalStore::open(store)?;
    let reconciler = Reconciler::new(&store, adapter.as_ref());

    let nodes = if nodes.is_empty() && deletes.is_empty() {
        store.node_ids()?
    } else {
        nodes
    };

    let mut failed = 0;
    if !nodes.is_empty() {
        let report = reconciler.sync_nodes(&nodes).await?;
        println!(
            "{} nodes synchronized, {} failed",
            report.succeeded(),
            report.failed()
        );
        failed += report.failed();
    }
    if !deletes.is_empty() {
        let report = reconciler.delete_records(deletes).await?;
        println!(
            "{} records deleted, {} failed",
            report.succeeded(),
            report.failed()
        );
        failed += report.failed();
    }

    if failed > 0 {
        bail!("{} provider calls failed", failed);
    }
    Ok(())
}

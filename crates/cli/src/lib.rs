//! Command-line front end for usage snapshots.
//!
//! Every subcommand works against a [`JsonNodeStore`] file whose location comes
//! from `--store`, the `[store]` section of `usage-tree.toml`, or the default
//! `.usage-tree/nodes.json`.

use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use usage_protocol::SnapshotDescriptor;
use usage_snapshot::{InvalidRecordPolicy, ServiceConfig, SnapshotService};
use usage_store::JsonNodeStore;

pub mod config;
pub mod input;
pub mod output;

use config::CliConfig;

#[derive(Parser)]
#[command(name = "usage-tree")]
#[command(about = "Aggregate method invocation telemetry into usage trees", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (defaults to ./usage-tree.toml when present)
    #[arg(long, global = true, env = config::CONFIG_ENV)]
    config: Option<PathBuf>,

    /// Node store file (overrides [store] path)
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Recompute a snapshot from invocation records
    Build(BuildArgs),

    /// List the rows directly under a parent signature
    Children(ChildrenArgs),

    /// Find rows whose signature contains a substring
    Search(SearchArgs),

    /// Remove every row of a snapshot
    Delete(DeleteArgs),
}

#[derive(Args)]
struct SnapshotArgs {
    /// Customer owning the snapshot
    #[arg(long)]
    customer_id: u64,

    /// Snapshot id
    #[arg(long)]
    snapshot_id: u64,
}

#[derive(Args)]
struct BuildArgs {
    #[command(flatten)]
    snapshot: SnapshotArgs,

    /// Comma-separated package globs (empty keeps every record)
    #[arg(long, default_value = "")]
    packages: String,

    /// Records invoked at or after this epoch millis count as used
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    threshold: i64,

    /// JSON array or JSON Lines file of records (`-` or absent reads stdin)
    #[arg(long)]
    input: Option<PathBuf>,

    /// Skip records with malformed signatures instead of failing
    #[arg(long)]
    skip_invalid: bool,

    /// Rows per store write (overrides [build] chunk_size)
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ChildrenArgs {
    #[command(flatten)]
    snapshot: SnapshotArgs,

    /// Parent signature (empty lists the top level)
    #[arg(long, default_value = "")]
    parent: String,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct SearchArgs {
    #[command(flatten)]
    snapshot: SnapshotArgs,

    /// Case-sensitive signature substring
    #[arg(long)]
    query: String,

    /// Row id to leave out of the results
    #[arg(long)]
    exclude_id: Option<u64>,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct DeleteArgs {
    #[command(flatten)]
    snapshot: SnapshotArgs,
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    let json_output = match &cli.command {
        Commands::Build(args) => args.json,
        Commands::Children(args) => args.json,
        Commands::Search(args) => args.json,
        Commands::Delete(_) => false,
    };
    if json_output {
        cli.quiet = true;
    }
    init_logging(cli.verbose, cli.quiet);

    let config = CliConfig::load(cli.config.as_deref())?;
    let store_path = cli.store.clone().unwrap_or_else(|| config.store.path.clone());

    match cli.command {
        Commands::Build(args) => run_build(args, config.build, store_path).await,
        Commands::Children(args) => run_children(args, config.build, store_path).await,
        Commands::Search(args) => run_search(args, config.build, store_path).await,
        Commands::Delete(args) => run_delete(args, config.build, store_path).await,
    }
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

async fn open_service(
    config: ServiceConfig,
    store_path: PathBuf,
) -> Result<SnapshotService<JsonNodeStore>> {
    let store = JsonNodeStore::open(&store_path)
        .await
        .with_context(|| format!("Failed to open node store {}", store_path.display()))?;
    Ok(SnapshotService::new(Arc::new(store), config)?)
}

async fn run_build(args: BuildArgs, mut config: ServiceConfig, store_path: PathBuf) -> Result<()> {
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    if args.skip_invalid {
        config.invalid_records = InvalidRecordPolicy::Skip;
    }

    let records = input::read_records(args.input.as_deref())?;
    let service = open_service(config, store_path).await?;
    let descriptor = SnapshotDescriptor::new(args.snapshot.snapshot_id, args.snapshot.customer_id)
        .with_packages(args.packages)
        .with_filter_invoked_at_millis(args.threshold);

    let report = service
        .create_and_save_snapshot_nodes(&descriptor, &records)
        .await
        .context("Build failed")?;

    if args.json {
        output::print_json(&report)?;
    } else {
        output::print_report(&report);
    }
    Ok(())
}

async fn run_children(
    args: ChildrenArgs,
    config: ServiceConfig,
    store_path: PathBuf,
) -> Result<()> {
    let service = open_service(config, store_path).await?;
    let nodes = service
        .read_snapshot_node(args.snapshot.customer_id, args.snapshot.snapshot_id, &args.parent)
        .await?;

    if args.json {
        output::print_json(&nodes)?;
    } else {
        output::print_nodes(nodes);
    }
    Ok(())
}

async fn run_search(args: SearchArgs, config: ServiceConfig, store_path: PathBuf) -> Result<()> {
    let service = open_service(config, store_path).await?;
    let nodes = service
        .search_by_signature(
            args.snapshot.customer_id,
            args.snapshot.snapshot_id,
            &args.query,
            args.exclude_id,
        )
        .await?;

    if args.json {
        output::print_json(&nodes)?;
    } else {
        output::print_nodes(nodes);
    }
    Ok(())
}

async fn run_delete(args: DeleteArgs, config: ServiceConfig, store_path: PathBuf) -> Result<()> {
    let service = open_service(config, store_path).await?;
    let removed = service
        .delete_snapshot_node(args.snapshot.customer_id, args.snapshot.snapshot_id)
        .await?;
    println!(
        "Deleted {} rows of snapshot {}/{}",
        removed, args.snapshot.customer_id, args.snapshot.snapshot_id
    );
    Ok(())
}

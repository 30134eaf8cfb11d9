//! Operator-facing maintenance CLI. Today this has one job: bootstrap a
//! timestamp field the poller needs but the source collection doesn't yet
//! carry, replacing the interactive prompt §4.2/§9 call out as awkward for
//! a long-running service (`SPEC_FULL.md` [ADDED] 5).

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use search_types::config::SourceCollection;
use server::config;
use source_adapter::{MongoSourceAdapter, SourceAdapter};
use time::OffsetDateTime;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "admin-cli", about = "Operator maintenance tasks for the search service")]
struct Cli {
    #[arg(long, env = "OAS_CONFIG", default_value = "config.yaml")]
    config: PathBuf,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Stamps every document in an index's source collection that is
    /// missing its configured `timestamp_field`, so the poller can start
    /// incremental sync without silently downgrading to `_id` ordering.
    InitTimestamps {
        /// Name of the index whose source collection should be backfilled.
        index: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;

    match cli.command {
        Command::InitTimestamps { index } => init_timestamps(&cfg, &index).await?,
    }
    Ok(())
}

async fn init_timestamps(cfg: &config::AppConfig, index_name: &str) -> anyhow::Result<()> {
    let index_cfg = cfg
        .indexes
        .iter()
        .find(|i| i.name == index_name)
        .ok_or_else(|| anyhow::anyhow!("no index named `{index_name}` in this configuration"))?;

    if index_cfg.timestamp_field == search_types::config::INTRINSIC_ID_SENTINEL {
        info!(index = %index_name, "index uses intrinsic _id ordering, nothing to backfill");
        return Ok(());
    }

    let uri = config::mongo_uri(&cfg.mongodb);
    let source = MongoSourceAdapter::connect(&uri).await?;
    let collection: &SourceCollection = &index_cfg.source_collection;

    if source.has_field(collection, &index_cfg.timestamp_field).await? {
        info!(index = %index_name, field = %index_cfg.timestamp_field, "field already present on every document, nothing to do");
        return Ok(());
    }

    let stamped = source.backfill_field(collection, &index_cfg.timestamp_field, OffsetDateTime::now_utc()).await?;
    info!(index = %index_name, field = %index_cfg.timestamp_field, documents = stamped, "backfilled missing timestamp field");
    Ok(())
}

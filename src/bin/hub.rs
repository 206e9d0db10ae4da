use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use fact_hub::{
    collector::{CollectedData, CollectorService},
    config::{Config, StorageConfig, parse_config, read_config_file},
    facts::{FactStore, FactStoreError, consul::ConsulBackend},
    pipeline::{CancellationToken, ProjectorsWorkerPool, SubmitError},
    projectors::default_registry,
    storage::{EntityStore, MemoryEntityStore},
};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, error, info, level_filters::LevelFilter, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Project newline-delimited agent reports into the entity store
    Project {
        /// Read reports from this file instead of stdin
        #[arg(long)]
        input: Option<String>,
    },

    /// Inspect or modify facts in Consul
    #[command(subcommand)]
    Kv(KvCommand),
}

#[derive(Debug, Clone, Subcommand)]
enum KvCommand {
    /// Print the tree stored below a prefix as JSON
    Get {
        prefix: String,

        /// Strip this path instead of the prefix
        #[arg(long)]
        offset: Option<String>,
    },

    /// Store a JSON document below a prefix
    Put { prefix: String, file: String },

    /// Delete everything below a prefix
    Delete { prefix: String },
}

fn init() {
    let filter = filter::Targets::new().with_targets(vec![("fact_hub", LevelFilter::DEBUG)]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = match &args.file {
        Some(file) => read_config_file(file)?,
        None => parse_config("{}")?,
    };

    match args.command {
        Command::Project { input } => project(&config, input.as_deref()).await,
        Command::Kv(command) => kv(&config, command).await,
    }
}

async fn entity_store(config: &Config) -> anyhow::Result<Arc<dyn EntityStore>> {
    match &config.storage {
        None | Some(StorageConfig::None) => {
            info!("using in-memory entity store");
            Ok(Arc::new(MemoryEntityStore::new()))
        }
        #[cfg(feature = "storage-sqlite")]
        Some(StorageConfig::Sqlite { path }) => {
            info!("using SQLite entity store at {}", path.display());
            let store = fact_hub::storage::sqlite::SqliteEntityStore::new(path)
                .await
                .context("failed to open entity store")?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-sqlite"))]
        Some(StorageConfig::Sqlite { .. }) => {
            anyhow::bail!("SQLite storage requested but fact-hub was built without it")
        }
    }
}

async fn project(config: &Config, input: Option<&str>) -> anyhow::Result<()> {
    let store = entity_store(config).await?;
    let registry = Arc::new(default_registry(store.clone()));
    debug!("projector registry: {registry:?}");

    let cancel = CancellationToken::new();
    let pool = ProjectorsWorkerPool::new(registry, &config.pipeline, cancel.clone());
    let stats = pool.stats();
    let collector = CollectorService::new(pool.sender());
    let running = tokio::spawn(pool.run());

    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("interrupted, shutting down");
                cancel.cancel();
            }
        }
    });

    let reader: Box<dyn AsyncRead + Unpin + Send> = match input {
        Some(path) => Box::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {path}"))?,
        ),
        None => Box::new(tokio::io::stdin()),
    };
    let mut lines = BufReader::new(reader).lines();
    let mut line_number = 0usize;

    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line.context("failed to read reports")?,
        };
        let Some(line) = line else {
            break;
        };
        line_number += 1;

        if line.trim().is_empty() {
            continue;
        }

        let data: CollectedData = match serde_json::from_str(&line) {
            Ok(data) => data,
            Err(e) => {
                warn!("line {line_number}: not a report: {e}");
                continue;
            }
        };

        match collector.store_events_for_projection(data).await {
            Ok(id) => trace!("line {line_number}: accepted as event {id}"),
            Err(SubmitError::ChannelClosed) => break,
            Err(e) => warn!("line {line_number}: {e}"),
        }
    }

    // Closing the channel lets the workers drain what is left
    drop(collector);
    if let Err(e) = running.await {
        error!("projection pool failed: {e}");
    }

    let stats = stats.snapshot();
    info!(
        "processed {} events ({} unmatched), {} projections succeeded, {} failed",
        stats.events_processed,
        stats.unmatched_events,
        stats.projections_succeeded,
        stats.projections_failed
    );

    let health = store.health_check().await?;
    debug!("entity store: {}", health.message);

    Ok(())
}

async fn kv(config: &Config, command: KvCommand) -> anyhow::Result<()> {
    let backend = ConsulBackend::new(&config.consul)?;
    let store = FactStore::new(Arc::new(backend));

    match command {
        KvCommand::Get { prefix, offset } => {
            let tree = match offset {
                Some(offset) => store.list_map(&prefix, &offset).await?,
                None => match store.read(&prefix).await {
                    Ok(tree) => tree,
                    Err(FactStoreError::NotFound(_)) => {
                        warn!("nothing stored below {prefix}");
                        return Ok(());
                    }
                    Err(e) => return Err(e.into()),
                },
            };
            println!("{}", serde_json::to_string_pretty(&tree)?);
        }
        KvCommand::Put { prefix, file } => {
            let content =
                std::fs::read_to_string(&file).with_context(|| format!("failed to read {file}"))?;
            let value: serde_json::Value =
                serde_json::from_str(&content).with_context(|| format!("{file} is not JSON"))?;
            let written = store.write_value(&prefix, &value).await?;
            info!("wrote {written} entries below {prefix}");
        }
        KvCommand::Delete { prefix } => {
            store.delete(&prefix).await?;
            info!("deleted {prefix}");
        }
    }

    Ok(())
}

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use news_ingestion::{
    Config, Fetcher, IngestMode, IngestionPipeline, ProviderRegistry, SqliteStore, UdnSource,
};

#[derive(Parser)]
#[command(name = "news-ingestion", about = "Topic-filtered news ingestion pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one ingestion pass and exit.
    Ingest {
        /// Force the wide bootstrap page range even if the store has rows.
        #[arg(long)]
        bootstrap: bool,
    },
    /// Run continuously: one startup pass, then an incremental pass on a
    /// fixed interval.
    Run,
    /// Search the source from a free-text prompt and print the hits.
    Search { prompt: String },
    /// Summarize text read from stdin with the named provider.
    Summarize {
        #[arg(long, default_value = "default-openai")]
        model: String,
    },
    /// Print every stored article, newest first.
    List,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    let store = Arc::new(SqliteStore::connect(&config.database_url).await?);
    let registry = ProviderRegistry::from_config(&config)?;

    match cli.command {
        Command::Ingest { bootstrap } => {
            let pipeline = build_pipeline(&config, &registry, store.clone())?;
            let mode = if bootstrap {
                IngestMode::Bootstrap
            } else {
                startup_mode(store.as_ref()).await?
            };
            let summary = pipeline.run_ingestion(mode).await?;
            println!("{summary:?}");
        }
        Command::Run => {
            let pipeline = build_pipeline(&config, &registry, store.clone())?;
            // The cold-start decision happens exactly once, here; every
            // scheduled tick after the first pass is incremental.
            let mode = startup_mode(store.as_ref()).await?;
            run_scheduled(&pipeline, mode, config.run_interval_secs).await;
        }
        Command::Search { prompt } => {
            let pipeline = build_pipeline(&config, &registry, store.clone())?;
            let results = pipeline.search_by_prompt(&prompt).await?;
            println!("{}", serde_json::to_string_pretty(&results)?);
        }
        Command::Summarize { model } => {
            let mut content = String::new();
            std::io::stdin().read_to_string(&mut content)?;
            let summary = registry.summarize_text(&model, &content).await?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Command::List => {
            use news_ingestion::ArticleStore;
            let articles = store.list_all_by_time_desc().await?;
            println!("{}", serde_json::to_string_pretty(&articles)?);
        }
    }

    Ok(())
}

fn build_pipeline(
    config: &Config,
    registry: &ProviderRegistry,
    store: Arc<SqliteStore>,
) -> Result<IngestionPipeline> {
    let fetcher = Fetcher::new(config.fetch_config())?;
    let source = Arc::new(UdnSource::new(
        fetcher,
        config.news_api_url.clone(),
        config.news_channel_id,
    ));
    let adapter = registry.get(&config.default_model)?;
    Ok(IngestionPipeline::new(
        source,
        adapter,
        store,
        config.topic.clone(),
    ))
}

async fn startup_mode(store: &SqliteStore) -> Result<IngestMode> {
    use news_ingestion::ArticleStore;
    let mode = if store.count_all().await? == 0 {
        IngestMode::Bootstrap
    } else {
        IngestMode::Incremental
    };
    info!(?mode, "selected startup mode");
    Ok(mode)
}

/// Timer-driven loop around the pipeline. Runs are best effort: a failed
/// pass is logged and the next tick tries again.
async fn run_scheduled(pipeline: &IngestionPipeline, startup: IngestMode, interval_secs: u64) {
    if let Err(e) = pipeline.run_ingestion(startup).await {
        error!(error = %e, "startup ingestion run failed");
    }

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
    ticker.tick().await; // the first tick fires immediately
    loop {
        ticker.tick().await;
        if let Err(e) = pipeline.run_ingestion(IngestMode::Incremental).await {
            error!(error = %e, "scheduled ingestion run failed");
        }
    }
}

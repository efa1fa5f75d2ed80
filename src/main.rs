use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

mod config;
mod db;
mod error;
mod feed;
mod models;
mod notify;
mod pipeline;
mod scoring;

use config::Config;
use db::Repository;
use error::Result;
use feed::FeedFetcher;
use notify::Broadcaster;
use pipeline::{Pipeline, Scheduler};
use scoring::LexiconSentiment;

const EVENT_BUFFER: usize = 64;
const REPORT_LIMIT: usize = 10;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (info by default, RUST_LOG to override)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    // Check for --config <path>
    let config_path = args
        .iter()
        .position(|a| a == "--config")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);

    // Check for --refresh flag (single cycle, then exit)
    let headless_refresh = args.iter().any(|a| a == "--refresh");

    // Load configuration
    let config = match config_path {
        Some(path) => Config::load_from(&path)?,
        None => Config::load()?,
    };

    // Open the store for the life of the process
    let repository = Repository::new(&config.db_path).await?;
    repository.seed_defaults().await?;
    tracing::info!("Using database at {}", config.db_path);

    let broadcaster = Arc::new(Broadcaster::new(EVENT_BUFFER));
    let pipeline = Arc::new(Pipeline::new(
        repository.clone(),
        FeedFetcher::new(&config)?,
        Arc::new(LexiconSentiment::new()),
        broadcaster.clone(),
        config.summary_max_chars,
    ));

    if headless_refresh {
        let report = pipeline.run_cycle().await?;
        let settings = repository.settings().await?;
        println!(
            "Inserted {} new articles ({} stored)",
            report.inserted,
            repository.article_count().await?
        );
        for article in repository.top_articles(settings.min_score, REPORT_LIMIT).await? {
            println!(
                "[{:>2}] {:+.2} {:<12} {}",
                article.score,
                article.sentiment,
                article.tickers.join(","),
                article.title
            );
        }
        return Ok(());
    }

    let shutdown = CancellationToken::new();

    // Live subscriber: one JSON line per refresh event
    let mut events = broadcaster.subscribe();
    let printer_shutdown = shutdown.clone();
    let printer = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = printer_shutdown.cancelled() => break,
                received = events.recv() => match received {
                    Ok(event) => match event.to_json_line() {
                        Ok(line) => println!("{}", line),
                        Err(e) => tracing::warn!("Could not encode refresh event: {}", e),
                    },
                    Err(RecvError::Lagged(missed)) => {
                        tracing::warn!("Event printer fell behind, {} events skipped", missed)
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }
    });

    let scheduler = Scheduler::new(Arc::clone(&pipeline), &config).spawn(shutdown.clone());

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl+C, shutting down");
    shutdown.cancel();

    if let Err(e) = scheduler.await {
        tracing::error!("Scheduler task ended abnormally: {}", e);
    }
    if let Err(e) = printer.await {
        tracing::error!("Event printer task ended abnormally: {}", e);
    }

    Ok(())
}

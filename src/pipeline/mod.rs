//! One ingestion cycle: fetch every active feed, normalise and score each
//! entry, then persist the new ones through a single serial writer.

mod scheduler;
mod writer;

pub use scheduler::Scheduler;
use writer::{ArticleWriter, WriteOutcome};

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::db::Repository;
use crate::error::Result;
use crate::feed::{normalize_entry, truncate_chars, EntryOutcome, FeedFetcher, FetchOutcome, RawEntry};
use crate::models::{Feed, NewArticle, RefreshEvent, Settings};
use crate::notify::NotificationSink;
use crate::scoring::{score, ScoringContext, SentimentScorer};

/// Counters for a finished cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub feeds: usize,
    pub failed_feeds: usize,
    pub entries: usize,
    pub skipped: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub failed_writes: usize,
}

/// Configuration read once when a cycle starts. Edits made while the cycle
/// runs are picked up by the next one.
struct CycleSnapshot {
    settings: Settings,
    feeds: Vec<Feed>,
    ticker_ids: HashMap<String, i64>,
    scoring: ScoringContext,
}

impl CycleSnapshot {
    async fn load(repository: &Repository) -> Result<Self> {
        let settings = repository.settings().await?;
        let feeds = repository.active_feeds().await?;
        let tickers = repository.tickers().await?;
        let keywords = repository.keywords().await?;

        let scoring = ScoringContext::new(&tickers, &keywords, &settings.strong_word_list());
        let ticker_ids = tickers.iter().map(|t| (t.symbol.clone(), t.id)).collect();

        Ok(Self {
            settings,
            feeds,
            ticker_ids,
            scoring,
        })
    }
}

/// Entries of one feed after normalisation and scoring.
struct FeedBatch {
    articles: Vec<NewArticle>,
    skipped: usize,
}

pub struct Pipeline {
    repository: Repository,
    fetcher: FeedFetcher,
    sentiment: Arc<dyn SentimentScorer>,
    sink: Arc<dyn NotificationSink>,
    summary_max_chars: usize,
    cycle_lock: Mutex<()>,
}

impl Pipeline {
    pub fn new(
        repository: Repository,
        fetcher: FeedFetcher,
        sentiment: Arc<dyn SentimentScorer>,
        sink: Arc<dyn NotificationSink>,
        summary_max_chars: usize,
    ) -> Self {
        Self {
            repository,
            fetcher,
            sentiment,
            sink,
            summary_max_chars,
            cycle_lock: Mutex::new(()),
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repository
    }

    /// True while a cycle holds the cycle lock.
    pub fn is_running(&self) -> bool {
        self.cycle_lock.try_lock().is_err()
    }

    /// Run one full cycle and return its counters. Concurrent callers queue
    /// behind the running cycle; two cycles never overlap.
    pub async fn run_cycle(&self) -> Result<CycleReport> {
        let _running = self.cycle_lock.lock().await;
        let started = Instant::now();

        let snapshot = Arc::new(CycleSnapshot::load(&self.repository).await?);
        if snapshot.feeds.is_empty() {
            tracing::info!("No active feeds configured");
            return Ok(CycleReport::default());
        }

        tracing::info!(
            "Starting cycle: {} feeds, {} tickers, {} aliases, min_score {}",
            snapshot.feeds.len(),
            snapshot.ticker_ids.len(),
            snapshot.scoring.alias_count(),
            snapshot.settings.min_score
        );

        let mut report = CycleReport {
            feeds: snapshot.feeds.len(),
            ..CycleReport::default()
        };

        let outcomes = self.fetcher.fetch_all(snapshot.feeds.clone()).await;

        let mut workers = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            match outcome {
                FetchOutcome::Fetched { feed, entries } => {
                    report.entries += entries.len();
                    let snapshot = Arc::clone(&snapshot);
                    let sentiment = Arc::clone(&self.sentiment);
                    let max_chars = self.summary_max_chars;
                    let name = feed.name.clone();
                    let handle = tokio::task::spawn_blocking(move || {
                        process_feed(&feed, &entries, &snapshot, sentiment.as_ref(), max_chars)
                    });
                    workers.push((name, handle));
                }
                FetchOutcome::Failed { feed, error } => {
                    tracing::warn!("Failed to fetch {} ({}): {}", feed.name, feed.url, error);
                    report.failed_feeds += 1;
                }
            }
        }

        let mut articles = Vec::new();
        for (name, handle) in workers {
            match handle.await {
                Ok(batch) => {
                    report.skipped += batch.skipped;
                    articles.extend(batch.articles);
                }
                Err(e) => {
                    tracing::warn!("Processing {} failed: {}", name, e);
                    report.failed_feeds += 1;
                }
            }
        }

        let mut writer = ArticleWriter::new(&self.repository);
        for article in articles {
            match writer.write(article).await {
                WriteOutcome::Inserted(id) => {
                    tracing::debug!("Stored article {}", id);
                    report.inserted += 1;
                }
                WriteOutcome::Duplicate => report.duplicates += 1,
                WriteOutcome::Failed => report.failed_writes += 1,
            }
        }

        if report.inserted > 0 {
            self.sink.publish(RefreshEvent::new(report.inserted));
        }

        tracing::info!(
            "Cycle complete in {:.1}s: {} new, {} already stored, {} skipped, {} feeds failed",
            started.elapsed().as_secs_f64(),
            report.inserted,
            report.duplicates,
            report.skipped,
            report.failed_feeds
        );

        Ok(report)
    }
}

fn process_feed(
    feed: &Feed,
    entries: &[RawEntry],
    snapshot: &CycleSnapshot,
    sentiment: &dyn SentimentScorer,
    summary_max_chars: usize,
) -> FeedBatch {
    let mut batch = FeedBatch {
        articles: Vec::with_capacity(entries.len()),
        skipped: 0,
    };

    for raw in entries {
        let entry = match normalize_entry(raw, &feed.url) {
            EntryOutcome::Ready(entry) => entry,
            EntryOutcome::Skipped(reason) => {
                tracing::debug!("Skipping entry from {}: {:?}", feed.name, reason);
                batch.skipped += 1;
                continue;
            }
        };

        // scored over the whole summary, stored truncated
        let text = entry.text();
        let relevance = score(&text, &snapshot.scoring);
        tracing::trace!(
            "Scored '{}': {} ({:?}, {} keyword hits, strong word {})",
            entry.title,
            relevance.score,
            relevance.tickers,
            relevance.keyword_hits,
            relevance.strong_word
        );
        let ticker_ids = relevance
            .tickers
            .iter()
            .filter_map(|symbol| snapshot.ticker_ids.get(symbol).copied())
            .collect();

        batch.articles.push(NewArticle {
            feed_id: feed.id,
            url: entry.url,
            title: entry.title,
            summary: truncate_chars(&entry.summary, summary_max_chars),
            published_ts: entry.published_ts,
            published_str: entry.published_str,
            score: relevance.score,
            sentiment: sentiment.score(&text).clamp(-1.0, 1.0),
            ticker_ids,
        });
    }

    batch
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::notify::Broadcaster;
    use crate::scoring::LexiconSentiment;

    pub(crate) fn rss(items: &[(&str, &str)]) -> String {
        let body: String = items
            .iter()
            .map(|(link, title)| {
                format!(
                    "<item><title>{}</title><link>{}</link><pubDate>Fri, 01 Mar 2024 14:30:00 GMT</pubDate></item>",
                    title, link
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>t</title><link>https://example.com</link><description>d</description>{}</channel></rss>"#,
            body
        )
    }

    pub(crate) struct Harness {
        pub dir: tempfile::TempDir,
        pub repo: Repository,
        pub hub: Arc<Broadcaster>,
        pub pipeline: Arc<Pipeline>,
    }

    pub(crate) async fn harness(fetch_timeout_secs: u64) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::new(dir.path().join("radar.db").to_str().unwrap())
            .await
            .unwrap();
        let config = Config {
            fetch_timeout_secs,
            connect_timeout_secs: 1,
            ..Config::default()
        };
        let hub = Arc::new(Broadcaster::new(16));
        let pipeline = Arc::new(Pipeline::new(
            repo.clone(),
            FeedFetcher::new(&config).unwrap(),
            Arc::new(LexiconSentiment::new()),
            hub.clone(),
            config.summary_max_chars,
        ));
        Harness {
            dir,
            repo,
            hub,
            pipeline,
        }
    }

    async fn serve(server: &mut mockito::Server, path: &str, body: String) {
        server
            .mock("GET", path)
            .with_status(200)
            .with_header("content-type", "application/rss+xml")
            .with_body(body)
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn no_active_feeds_is_an_empty_cycle() {
        let h = harness(5).await;
        let report = h.pipeline.run_cycle().await.unwrap();
        assert_eq!(report, CycleReport::default());
    }

    #[tokio::test]
    async fn headline_is_scored_and_stored_with_tickers() {
        let mut server = mockito::Server::new_async().await;
        serve(
            &mut server,
            "/rss",
            rss(&[(
                "https://news.example/apple",
                "Apple announced record quarterly earnings today, Tesla too.",
            )]),
        )
        .await;

        let h = harness(5).await;
        h.repo
            .insert_feed(&format!("{}/rss", server.url()), "Mock")
            .await
            .unwrap();
        h.repo.insert_ticker("AAPL", "").await.unwrap();
        h.repo.insert_ticker("TSLA", "").await.unwrap();
        h.repo.insert_keyword("earnings").await.unwrap();
        h.repo
            .update_settings(Settings {
                strong_words: "record".to_string(),
                ..Settings::default()
            })
            .await
            .unwrap();

        let mut events = h.hub.subscribe();
        let report = h.pipeline.run_cycle().await.unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(events.recv().await.unwrap().inserted, 1);

        let stored = h
            .repo
            .find_article("https://news.example/apple")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.score, 6);
        assert_eq!(stored.tickers, vec!["AAPL", "TSLA"]);
        assert!((-1.0..=1.0).contains(&stored.sentiment));
        assert_eq!(stored.published_str, "2024-03-01 14:30:00");
    }

    #[tokio::test]
    async fn keyword_past_the_stored_summary_length_still_scores() {
        let description = format!("{} earnings", "lorem ipsum ".repeat(50));
        let body = format!(
            r#"<?xml version="1.0"?><rss version="2.0"><channel><title>t</title><link>https://example.com</link><description>d</description>
            <item><title>Quarter in review</title><link>https://news.example/long</link><description>{}</description></item>
            </channel></rss>"#,
            description
        );
        let mut server = mockito::Server::new_async().await;
        serve(&mut server, "/rss", body).await;

        let h = harness(5).await;
        h.repo
            .insert_feed(&format!("{}/rss", server.url()), "Mock")
            .await
            .unwrap();
        h.repo.insert_keyword("earnings").await.unwrap();

        assert_eq!(h.pipeline.run_cycle().await.unwrap().inserted, 1);
        let stored = h
            .repo
            .find_article("https://news.example/long")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.score, 1);
        assert_eq!(stored.summary.chars().count(), 500);
        assert!(!stored.summary.contains("earnings"));
    }

    #[tokio::test]
    async fn second_cycle_over_same_content_inserts_nothing() {
        let mut server = mockito::Server::new_async().await;
        serve(
            &mut server,
            "/rss",
            rss(&[
                ("https://news.example/1", "First story"),
                ("https://news.example/2", "Second story"),
            ]),
        )
        .await;

        let h = harness(5).await;
        h.repo
            .insert_feed(&format!("{}/rss", server.url()), "Mock")
            .await
            .unwrap();

        let mut events = h.hub.subscribe();
        assert_eq!(h.pipeline.run_cycle().await.unwrap().inserted, 2);
        let second = h.pipeline.run_cycle().await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.duplicates, 2);
        assert_eq!(h.repo.article_count().await.unwrap(), 2);

        // only the first cycle announced anything
        assert_eq!(events.recv().await.unwrap().inserted, 2);
        assert!(events.try_recv().is_err());
    }

    #[tokio::test]
    async fn same_link_in_two_feeds_is_stored_once() {
        let mut server = mockito::Server::new_async().await;
        let shared = rss(&[("https://news.example/shared", "Shared story")]);
        serve(&mut server, "/a", shared.clone()).await;
        serve(&mut server, "/b", shared).await;

        let h = harness(5).await;
        h.repo
            .insert_feed(&format!("{}/a", server.url()), "A")
            .await
            .unwrap();
        h.repo
            .insert_feed(&format!("{}/b", server.url()), "B")
            .await
            .unwrap();

        let report = h.pipeline.run_cycle().await.unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.duplicates, 1);
        assert_eq!(h.repo.article_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn timed_out_feed_does_not_block_a_healthy_one() {
        let stalled = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let stalled_addr = stalled.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = stalled.accept().await {
                held.push(socket);
            }
        });

        let mut server = mockito::Server::new_async().await;
        serve(
            &mut server,
            "/rss",
            rss(&[("https://news.example/ok", "Healthy story")]),
        )
        .await;

        let h = harness(1).await;
        h.repo
            .insert_feed(&format!("http://{}/rss", stalled_addr), "A")
            .await
            .unwrap();
        h.repo
            .insert_feed(&format!("{}/rss", server.url()), "B")
            .await
            .unwrap();

        let mut events = h.hub.subscribe();
        let report = h.pipeline.run_cycle().await.unwrap();
        assert_eq!(report.inserted, 1);
        assert_eq!(report.failed_feeds, 1);
        assert_eq!(events.recv().await.unwrap().inserted, 1);
    }

    #[tokio::test]
    async fn entries_without_links_are_skipped() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"<?xml version="1.0"?><rss version="2.0"><channel><title>t</title><link>https://example.com</link><description>d</description>
            <item><title>No link here</title></item>
            <item><title>Linked</title><link>https://news.example/linked</link></item>
            </channel></rss>"#;
        serve(&mut server, "/rss", body.to_string()).await;

        let h = harness(5).await;
        h.repo
            .insert_feed(&format!("{}/rss", server.url()), "Mock")
            .await
            .unwrap();

        let report = h.pipeline.run_cycle().await.unwrap();
        assert_eq!(report.entries, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.inserted, 1);
    }

    #[tokio::test]
    async fn overlapping_triggers_never_double_insert() {
        let mut server = mockito::Server::new_async().await;
        serve(
            &mut server,
            "/rss",
            rss(&[
                ("https://news.example/1", "One"),
                ("https://news.example/2", "Two"),
                ("https://news.example/3", "Three"),
            ]),
        )
        .await;

        let h = harness(5).await;
        h.repo
            .insert_feed(&format!("{}/rss", server.url()), "Mock")
            .await
            .unwrap();

        let scheduled = {
            let pipeline = Arc::clone(&h.pipeline);
            tokio::spawn(async move { pipeline.run_cycle().await })
        };
        let manual = {
            let pipeline = Arc::clone(&h.pipeline);
            tokio::spawn(async move { pipeline.run_cycle().await })
        };

        let a = scheduled.await.unwrap().unwrap();
        let b = manual.await.unwrap().unwrap();
        assert_eq!(a.inserted + b.inserted, 3);
        assert_eq!(a.duplicates + b.duplicates, 3);
        assert_eq!(h.repo.article_count().await.unwrap(), 3);
        assert!(!h.pipeline.is_running());
    }
}

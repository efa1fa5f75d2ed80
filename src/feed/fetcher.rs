use std::time::Duration;

use feed_rs::parser;
use futures::stream::{self, StreamExt};
use reqwest::Client;

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::models::Feed;

use super::normalize::{parse_timestamp, RawEntry};

/// What one feed contributed to a cycle.
#[derive(Debug)]
pub enum FetchOutcome {
    Fetched { feed: Feed, entries: Vec<RawEntry> },
    Failed { feed: Feed, error: AppError },
}

pub struct FeedFetcher {
    client: Client,
    timeout: Duration,
    max_concurrency: usize,
}

impl FeedFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.fetch_timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            timeout: config.fetch_timeout(),
            max_concurrency: config.max_concurrent_fetches.max(1),
        })
    }

    pub async fn fetch_feed(&self, url: &str) -> Result<Vec<RawEntry>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!("Failed to fetch feed: HTTP {}", response.status()).into());
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        parse_entries(&bytes)
    }

    /// Fetch every feed, at most `max_concurrent_fetches` at once. A failing
    /// feed yields `FetchOutcome::Failed` and never holds up the others.
    pub async fn fetch_all(&self, feeds: Vec<Feed>) -> Vec<FetchOutcome> {
        stream::iter(feeds)
            .map(|feed| async move {
                match self.fetch_feed(&feed.url).await {
                    Ok(entries) => {
                        tracing::debug!("Fetched {} entries from {}", entries.len(), feed.name);
                        FetchOutcome::Fetched { feed, entries }
                    }
                    Err(error) => FetchOutcome::Failed { feed, error },
                }
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await
    }

    fn classify(&self, error: reqwest::Error) -> AppError {
        if error.is_timeout() {
            AppError::Timeout(self.timeout.as_secs())
        } else {
            error.into()
        }
    }
}

/// Parse an RSS/Atom document into raw entries.
pub fn parse_entries(bytes: &[u8]) -> Result<Vec<RawEntry>> {
    let feed = parser::Builder::new()
        .timestamp_parser(parse_timestamp)
        .build()
        .parse(bytes)?;

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| RawEntry {
            link: entry.links.first().map(|l| l.href.clone()),
            title: entry.title.map(|t| t.content),
            summary: entry.summary.map(|s| s.content),
            content: entry.content.and_then(|c| c.body),
            published: entry.published.or(entry.updated),
        })
        .collect();

    Ok(entries)
}

use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::error::{AppError, Result};
use crate::models::{Article, Feed, NewArticle, Settings, Ticker, MIN_REFRESH_INTERVAL_SECS};

use super::schema::{DEFAULT_FEEDS, DEFAULT_KEYWORDS, DEFAULT_TICKERS, PRAGMAS, SCHEMA};

/// Owned handle to the SQLite store. Cloning shares the same background connection.
#[derive(Clone)]
pub struct Repository {
    conn: Connection,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    /// Populate settings, feeds, tickers and keywords when their tables are empty.
    pub async fn seed_defaults(&self) -> Result<()> {
        let defaults = Settings::default();
        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;

                tx.execute(
                    "INSERT OR IGNORE INTO settings (id, refresh_interval, min_score, strong_words) VALUES (1, ?1, ?2, ?3)",
                    params![
                        defaults.refresh_interval_seconds as i64,
                        defaults.min_score,
                        defaults.strong_words
                    ],
                )?;

                let feeds: i64 = tx.query_row("SELECT COUNT(*) FROM feeds", [], |row| row.get(0))?;
                if feeds == 0 {
                    for (url, name) in DEFAULT_FEEDS {
                        tx.execute(
                            "INSERT OR IGNORE INTO feeds (url, name) VALUES (?1, ?2)",
                            params![url, name],
                        )?;
                    }
                    tracing::info!("Seeded {} default feeds", DEFAULT_FEEDS.len());
                }

                let tickers: i64 =
                    tx.query_row("SELECT COUNT(*) FROM tickers", [], |row| row.get(0))?;
                if tickers == 0 {
                    for (symbol, company_names) in DEFAULT_TICKERS {
                        tx.execute(
                            "INSERT OR IGNORE INTO tickers (symbol, company_names) VALUES (?1, ?2)",
                            params![symbol, company_names],
                        )?;
                    }
                    tracing::info!("Seeded {} default tickers", DEFAULT_TICKERS.len());
                }

                let keywords: i64 =
                    tx.query_row("SELECT COUNT(*) FROM keywords", [], |row| row.get(0))?;
                if keywords == 0 {
                    for word in DEFAULT_KEYWORDS {
                        tx.execute(
                            "INSERT OR IGNORE INTO keywords (word) VALUES (?1)",
                            params![word],
                        )?;
                    }
                    tracing::info!("Seeded {} default keywords", DEFAULT_KEYWORDS.len());
                }

                tx.commit()?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    // Configuration reads consumed by the pipeline

    pub async fn active_feeds(&self) -> Result<Vec<Feed>> {
        let feeds = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, url, name, active FROM feeds WHERE active = 1 ORDER BY name",
                )?;
                let feeds = stmt
                    .query_map([], feed_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(feeds)
            })
            .await?;
        Ok(feeds)
    }

    pub async fn tickers(&self) -> Result<Vec<Ticker>> {
        let tickers = self
            .conn
            .call(|conn| {
                let mut stmt =
                    conn.prepare("SELECT id, symbol, company_names FROM tickers ORDER BY symbol")?;
                let tickers = stmt
                    .query_map([], |row| {
                        let id: i64 = row.get(0)?;
                        let symbol: String = row.get(1)?;
                        let company_names: String = row.get(2)?;
                        Ok(Ticker::from_stored(id, &symbol, &company_names))
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(tickers)
            })
            .await?;
        Ok(tickers)
    }

    pub async fn keywords(&self) -> Result<Vec<String>> {
        let keywords = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT word FROM keywords ORDER BY word")?;
                let words = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(words)
            })
            .await?;
        Ok(keywords)
    }

    /// The settings row, or defaults when it has not been written yet.
    pub async fn settings(&self) -> Result<Settings> {
        let settings = self
            .conn
            .call(|conn| {
                let settings = conn
                    .query_row(
                        "SELECT refresh_interval, min_score, strong_words FROM settings WHERE id = 1",
                        [],
                        |row| {
                            let interval: i64 = row.get(0)?;
                            Ok(Settings {
                                refresh_interval_seconds: interval.max(0) as u64,
                                min_score: row.get(1)?,
                                strong_words: row.get(2)?,
                            })
                        },
                    )
                    .optional()?;
                Ok(settings)
            })
            .await?;
        Ok(settings.unwrap_or_default())
    }

    // Article operations

    pub async fn article_exists(&self, url: &str) -> Result<bool> {
        let url = url.to_string();
        let exists = self
            .conn
            .call(move |conn| {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM articles WHERE url = ?1",
                    params![url],
                    |row| row.get(0),
                )?;
                Ok(count > 0)
            })
            .await?;
        Ok(exists)
    }

    /// Insert the article and its ticker links in one transaction.
    pub async fn insert_article(&self, article: NewArticle) -> Result<i64> {
        let id = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    r#"INSERT INTO articles
                           (feed_id, url, title, summary, published_ts, published_str, score, sentiment)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
                    params![
                        article.feed_id,
                        article.url,
                        article.title,
                        article.summary,
                        article.published_ts,
                        article.published_str,
                        article.score,
                        article.sentiment,
                    ],
                )?;
                let article_id = tx.last_insert_rowid();
                {
                    let mut stmt = tx.prepare(
                        "INSERT OR IGNORE INTO article_tickers (article_id, ticker_id) VALUES (?1, ?2)",
                    )?;
                    for ticker_id in &article.ticker_ids {
                        stmt.execute(params![article_id, ticker_id])?;
                    }
                }
                tx.commit()?;
                Ok(article_id)
            })
            .await?;
        Ok(id)
    }

    pub async fn article_count(&self) -> Result<i64> {
        let count = self
            .conn
            .call(|conn| {
                let count: i64 =
                    conn.query_row("SELECT COUNT(*) FROM articles", [], |row| row.get(0))?;
                Ok(count)
            })
            .await?;
        Ok(count)
    }

    /// Newest articles scoring at least `min_score`.
    pub async fn top_articles(&self, min_score: i64, limit: usize) -> Result<Vec<Article>> {
        let limit = limit as i64;
        let articles = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT a.id, a.feed_id, a.url, a.title, a.summary, a.published_ts,
                              a.published_str, a.score, a.sentiment,
                              COALESCE((SELECT GROUP_CONCAT(t.symbol, ',')
                                        FROM article_tickers at
                                        JOIN tickers t ON t.id = at.ticker_id
                                        WHERE at.article_id = a.id), '')
                       FROM articles a
                       WHERE a.score >= ?1
                       ORDER BY a.published_ts DESC, a.id DESC
                       LIMIT ?2"#,
                )?;
                let articles = stmt
                    .query_map(params![min_score, limit], article_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(articles)
            })
            .await?;
        Ok(articles)
    }

    #[cfg(test)]
    pub async fn find_article(&self, url: &str) -> Result<Option<Article>> {
        let url = url.to_string();
        let article = self
            .conn
            .call(move |conn| {
                let article = conn
                    .query_row(
                        r#"SELECT a.id, a.feed_id, a.url, a.title, a.summary, a.published_ts,
                                  a.published_str, a.score, a.sentiment,
                                  COALESCE((SELECT GROUP_CONCAT(t.symbol, ',')
                                            FROM article_tickers at
                                            JOIN tickers t ON t.id = at.ticker_id
                                            WHERE at.article_id = a.id), '')
                           FROM articles a WHERE a.url = ?1"#,
                        params![url],
                        article_from_row,
                    )
                    .optional()?;
                Ok(article)
            })
            .await?;
        Ok(article)
    }
}

/// Configuration writes. The management surface that calls these lives outside
/// the ingestion core.
#[allow(dead_code)]
impl Repository {
    pub async fn insert_feed(&self, url: &str, name: &str) -> Result<i64> {
        let url = url.trim().to_string();
        let name = name.trim().to_string();
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO feeds (url, name) VALUES (?1, ?2)",
                    params![url, name],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn set_feed_active(&self, id: i64, active: bool) -> Result<()> {
        self.conn
            .call(move |conn| {
                conn.execute(
                    "UPDATE feeds SET active = ?1 WHERE id = ?2",
                    params![active, id],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn insert_ticker(&self, symbol: &str, company_names: &str) -> Result<i64> {
        let symbol = symbol.trim().to_uppercase();
        let company_names = company_names.trim().to_string();
        let id = self
            .conn
            .call(move |conn| {
                conn.execute(
                    "INSERT INTO tickers (symbol, company_names) VALUES (?1, ?2)",
                    params![symbol, company_names],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn insert_keyword(&self, word: &str) -> Result<i64> {
        let word = word.trim().to_lowercase();
        let id = self
            .conn
            .call(move |conn| {
                conn.execute("INSERT INTO keywords (word) VALUES (?1)", params![word])?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        Ok(id)
    }

    pub async fn update_settings(&self, settings: Settings) -> Result<()> {
        if settings.refresh_interval_seconds < MIN_REFRESH_INTERVAL_SECS {
            return Err(AppError::Config(format!(
                "refresh interval must be at least {} seconds",
                MIN_REFRESH_INTERVAL_SECS
            )));
        }
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO settings (id, refresh_interval, min_score, strong_words)
                       VALUES (1, ?1, ?2, ?3)
                       ON CONFLICT(id) DO UPDATE SET
                           refresh_interval = excluded.refresh_interval,
                           min_score = excluded.min_score,
                           strong_words = excluded.strong_words,
                           updated_at = datetime('now')"#,
                    params![
                        settings.refresh_interval_seconds as i64,
                        settings.min_score,
                        settings.strong_words
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }
}

fn feed_from_row(row: &Row) -> rusqlite::Result<Feed> {
    Ok(Feed {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        active: row.get::<_, i64>(3)? != 0,
    })
}

fn article_from_row(row: &Row) -> rusqlite::Result<Article> {
    let symbols: String = row.get(9)?;
    let mut tickers: Vec<String> = symbols
        .split(',')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    tickers.sort();

    Ok(Article {
        id: row.get(0)?,
        feed_id: row.get(1)?,
        url: row.get(2)?,
        title: row.get(3)?,
        summary: row.get(4)?,
        published_ts: row.get(5)?,
        published_str: row.get(6)?,
        score: row.get(7)?,
        sentiment: row.get(8)?,
        tickers,
    })
}

pub const PRAGMAS: &str = r#"
PRAGMA journal_mode = WAL;
PRAGMA synchronous = NORMAL;
PRAGMA foreign_keys = ON;
"#;

pub const SCHEMA: &str = r#"
-- feeds table
CREATE TABLE IF NOT EXISTS feeds (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    active INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- tickers table (company_names is a comma-separated alias list)
CREATE TABLE IF NOT EXISTS tickers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    symbol TEXT NOT NULL UNIQUE,
    company_names TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- keywords table
CREATE TABLE IF NOT EXISTS keywords (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    word TEXT NOT NULL UNIQUE,
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- settings table (single row, id = 1)
CREATE TABLE IF NOT EXISTS settings (
    id INTEGER PRIMARY KEY CHECK (id = 1),
    refresh_interval INTEGER NOT NULL DEFAULT 600 CHECK (refresh_interval >= 10),
    min_score INTEGER NOT NULL DEFAULT 1,
    strong_words TEXT NOT NULL DEFAULT 'breaking,exclusive,surge,crash,boom,plunge',
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- articles table
CREATE TABLE IF NOT EXISTS articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    feed_id INTEGER NOT NULL REFERENCES feeds(id) ON DELETE CASCADE,
    url TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    summary TEXT NOT NULL DEFAULT '',
    published_ts INTEGER NOT NULL,
    published_str TEXT NOT NULL,
    score INTEGER NOT NULL DEFAULT 0 CHECK (score >= 0),
    sentiment REAL NOT NULL DEFAULT 0.0 CHECK (sentiment BETWEEN -1.0 AND 1.0),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_articles_published ON articles(published_ts DESC);

-- article_tickers junction table
CREATE TABLE IF NOT EXISTS article_tickers (
    article_id INTEGER NOT NULL REFERENCES articles(id) ON DELETE CASCADE,
    ticker_id INTEGER NOT NULL REFERENCES tickers(id) ON DELETE CASCADE,
    PRIMARY KEY (article_id, ticker_id)
);
"#;

pub const DEFAULT_FEEDS: &[(&str, &str)] = &[
    ("https://feeds.finance.yahoo.com/rss/2.0/headline", "Yahoo Finance"),
    ("https://www.cnbc.com/id/100003114/device/rss/rss.html", "CNBC Top News"),
    ("https://www.reuters.com/rssfeed/businessNews", "Reuters Business"),
    ("https://feeds.bloomberg.com/markets/news.rss", "Bloomberg Markets"),
];

pub const DEFAULT_TICKERS: &[(&str, &str)] = &[
    ("AAPL", "apple,apple inc"),
    ("MSFT", "microsoft,microsoft corporation"),
    ("GOOGL", "google,alphabet,alphabet inc"),
    ("AMZN", "amazon,amazon.com"),
    ("TSLA", "tesla,tesla motors"),
    ("META", "meta,facebook,meta platforms"),
    ("NVDA", "nvidia,nvidia corporation"),
    ("BTC", "bitcoin"),
    ("ETH", "ethereum"),
    ("SPY", "s&p 500,s&p,spy"),
];

pub const DEFAULT_KEYWORDS: &[&str] = &[
    "earnings",
    "revenue",
    "profit",
    "loss",
    "merger",
    "acquisition",
    "IPO",
    "stock",
    "market",
    "trade",
];

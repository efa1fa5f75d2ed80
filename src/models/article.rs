use serde::{Deserialize, Serialize};

/// A scored entry ready to be written; `ticker_ids` become association rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewArticle {
    pub feed_id: i64,
    pub url: String,
    pub title: String,
    pub summary: String,
    pub published_ts: i64,
    pub published_str: String,
    pub score: u32,
    pub sentiment: f64,
    pub ticker_ids: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: i64,
    pub feed_id: i64,
    pub url: String,
    pub title: String,
    pub summary: String,
    pub published_ts: i64,
    pub published_str: String,
    pub score: u32,
    pub sentiment: f64,
    pub tickers: Vec<String>,
}

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const MIN_REFRESH_INTERVAL_SECS: u64 = 10;

/// The singleton settings row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub refresh_interval_seconds: u64,
    /// Read-side filter only; ingestion stores every article regardless.
    pub min_score: i64,
    /// Comma-separated, as stored.
    pub strong_words: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            refresh_interval_seconds: 600,
            min_score: 1,
            strong_words: "breaking,exclusive,surge,crash,boom,plunge".to_string(),
        }
    }
}

impl Settings {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds.max(MIN_REFRESH_INTERVAL_SECS))
    }

    pub fn strong_word_list(&self) -> Vec<String> {
        self.strong_words
            .split(',')
            .map(|w| w.trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect()
    }
}

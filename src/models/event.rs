use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Emitted once per cycle that stored at least one new article.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "refresh")]
pub struct RefreshEvent {
    pub inserted: usize,
    pub timestamp: DateTime<Utc>,
}

impl RefreshEvent {
    pub fn new(inserted: usize) -> Self {
        Self {
            inserted,
            timestamp: Utc::now(),
        }
    }

    /// One line of JSON, as written to live subscribers.
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

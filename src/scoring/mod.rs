mod aliases;
mod relevance;
mod sentiment;

pub use relevance::{score, ScoringContext};
pub use sentiment::{LexiconSentiment, SentimentScorer};

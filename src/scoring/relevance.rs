use std::collections::BTreeSet;

use crate::models::Ticker;

use super::aliases::AliasMap;

/// Weight of each matched ticker in the final score.
const TICKER_WEIGHT: u32 = 2;

/// Characters allowed directly before a ticker symbol.
fn opens_symbol(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | '$')
}

/// Characters allowed directly after a ticker symbol.
fn closes_symbol(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '.' | ')' | ':' | ';' | '!' | '?')
}

/// Everything the scorer reads, frozen for the length of one cycle.
#[derive(Debug, Clone, Default)]
pub struct ScoringContext {
    symbols: Vec<String>,
    aliases: AliasMap,
    keywords: Vec<String>,
    strong_words: Vec<String>,
}

impl ScoringContext {
    pub fn new(tickers: &[Ticker], keywords: &[String], strong_words: &[String]) -> Self {
        let lower = |words: &[String]| -> Vec<String> {
            words
                .iter()
                .map(|w| w.trim().to_lowercase())
                .filter(|w| !w.is_empty())
                .collect()
        };

        Self {
            symbols: tickers
                .iter()
                .map(|t| t.symbol.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
            aliases: AliasMap::build(tickers),
            keywords: lower(keywords),
            strong_words: lower(strong_words),
        }
    }

    pub fn alias_count(&self) -> usize {
        self.aliases.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relevance {
    pub score: u32,
    pub tickers: BTreeSet<String>,
    pub keyword_hits: u32,
    pub strong_word: bool,
}

/// `2 × |matched tickers| + keyword occurrences + (1 if any strong word)`.
pub fn score(text: &str, context: &ScoringContext) -> Relevance {
    let text_lower = text.to_lowercase();
    let text_upper = text.to_uppercase();

    let mut tickers: BTreeSet<String> = context
        .symbols
        .iter()
        .filter(|symbol| contains_symbol(&text_upper, symbol))
        .cloned()
        .collect();
    if !context.aliases.is_empty() {
        tickers.extend(context.aliases.matches(&text_lower).map(str::to_string));
    }

    let keyword_hits = context
        .keywords
        .iter()
        .map(|keyword| text_lower.matches(keyword.as_str()).count() as u32)
        .sum::<u32>();

    let strong_word = context
        .strong_words
        .iter()
        .any(|word| text_lower.contains(word.as_str()));

    let score = TICKER_WEIGHT * tickers.len() as u32 + keyword_hits + u32::from(strong_word);

    Relevance {
        score,
        tickers,
        keyword_hits,
        strong_word,
    }
}

/// True when `symbol` occurs in `text_upper` as a standalone token rather
/// than inside a longer word.
fn contains_symbol(text_upper: &str, symbol: &str) -> bool {
    if symbol.is_empty() {
        return false;
    }
    text_upper.match_indices(symbol).any(|(start, _)| {
        let before = text_upper[..start].chars().next_back();
        let after = text_upper[start + symbol.len()..].chars().next();
        before.map_or(true, opens_symbol) && after.map_or(true, closes_symbol)
    })
}

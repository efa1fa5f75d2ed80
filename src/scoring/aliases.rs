use std::collections::BTreeSet;

use crate::models::Ticker;

/// Built-in company-name variants, lower-case, mapped to ticker symbols.
const COMPANY_TO_TICKER: &[(&str, &str)] = &[
    // Tech
    ("apple", "AAPL"),
    ("microsoft", "MSFT"),
    ("alphabet", "GOOGL"),
    ("google", "GOOGL"),
    ("amazon", "AMZN"),
    ("meta", "META"),
    ("facebook", "META"),
    ("tesla", "TSLA"),
    ("nvidia", "NVDA"),
    ("netflix", "NFLX"),
    ("adobe", "ADBE"),
    ("salesforce", "CRM"),
    ("oracle", "ORCL"),
    ("intel", "INTC"),
    ("amd", "AMD"),
    ("ibm", "IBM"),
    ("cisco", "CSCO"),
    ("qualcomm", "QCOM"),
    // Finance
    ("jpmorgan", "JPM"),
    ("jp morgan", "JPM"),
    ("bank of america", "BAC"),
    ("wells fargo", "WFC"),
    ("goldman sachs", "GS"),
    ("morgan stanley", "MS"),
    ("citigroup", "C"),
    ("visa", "V"),
    ("mastercard", "MA"),
    ("paypal", "PYPL"),
    ("square", "SQ"),
    ("american express", "AXP"),
    // Retail and consumer
    ("walmart", "WMT"),
    ("target", "TGT"),
    ("costco", "COST"),
    ("home depot", "HD"),
    ("nike", "NKE"),
    ("starbucks", "SBUX"),
    ("mcdonalds", "MCD"),
    ("mcdonald's", "MCD"),
    ("coca cola", "KO"),
    ("coca-cola", "KO"),
    ("pepsi", "PEP"),
    ("procter & gamble", "PG"),
    ("disney", "DIS"),
    // Automotive
    ("general motors", "GM"),
    ("ford", "F"),
    ("gm", "GM"),
    // Healthcare
    ("pfizer", "PFE"),
    ("moderna", "MRNA"),
    ("johnson & johnson", "JNJ"),
    ("abbvie", "ABBV"),
    ("merck", "MRK"),
    ("eli lilly", "LLY"),
    ("bristol myers", "BMY"),
    ("unitedhealth", "UNH"),
    // Energy
    ("exxon", "XOM"),
    ("chevron", "CVX"),
    ("conocophillips", "COP"),
    ("schlumberger", "SLB"),
    // Crypto
    ("bitcoin", "BTC"),
    ("ethereum", "ETH"),
    ("coinbase", "COIN"),
    ("microstrategy", "MSTR"),
    // Aerospace and defense
    ("boeing", "BA"),
    ("lockheed martin", "LMT"),
    ("raytheon", "RTX"),
    // Other
    ("berkshire hathaway", "BRK.B"),
    ("at&t", "T"),
    ("verizon", "VZ"),
    ("comcast", "CMCSA"),
    ("lowes", "LOW"),
    ("lowe's", "LOW"),
];

/// Immutable alias → symbol table for one cycle: the built-in names plus each
/// ticker's configured aliases, restricted to the configured tickers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AliasMap {
    entries: Vec<(String, String)>,
}

impl AliasMap {
    pub fn build(tickers: &[Ticker]) -> Self {
        let symbols: BTreeSet<String> = tickers.iter().map(|t| t.symbol.to_uppercase()).collect();

        let mut pairs: BTreeSet<(String, String)> = COMPANY_TO_TICKER
            .iter()
            .filter(|(_, symbol)| symbols.contains(*symbol))
            .map(|(alias, symbol)| (alias.to_string(), symbol.to_string()))
            .collect();

        for ticker in tickers {
            for alias in &ticker.aliases {
                let alias = alias.trim().to_lowercase();
                if !alias.is_empty() {
                    pairs.insert((alias, ticker.symbol.to_uppercase()));
                }
            }
        }

        Self {
            entries: pairs.into_iter().collect(),
        }
    }

    /// Symbols whose alias occurs anywhere in `text_lower`.
    pub fn matches<'a>(&'a self, text_lower: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entries
            .iter()
            .filter(move |(alias, _)| text_lower.contains(alias.as_str()))
            .map(|(_, symbol)| symbol.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

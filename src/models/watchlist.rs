use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticker {
    pub id: i64,
    /// Canonical upper-case symbol.
    pub symbol: String,
    /// Company-name variants, lower-cased, in configured order.
    pub aliases: Vec<String>,
}

impl Ticker {
    /// Build from the stored comma-separated alias column.
    pub fn from_stored(id: i64, symbol: &str, company_names: &str) -> Self {
        Self {
            id,
            symbol: symbol.trim().to_uppercase(),
            aliases: split_aliases(company_names),
        }
    }
}

fn split_aliases(company_names: &str) -> Vec<String> {
    company_names
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_ticker_is_normalised() {
        let ticker = Ticker::from_stored(7, " aapl ", "Apple, Apple Inc,, ");
        assert_eq!(ticker.symbol, "AAPL");
        assert_eq!(ticker.aliases, vec!["apple", "apple inc"]);
    }
}

use serde::{Deserialize, Serialize};

/// A strategy as read from the `strategies` table.
///
/// Owned by the strategy-management side; this crate only reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyRow {
    pub id: String,
    /// Primary token-weight payload (JSON text)
    pub composition: Option<String>,
    /// Legacy payload, consulted when `composition` is unusable
    pub config: Option<String>,
}

impl StrategyRow {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            composition: None,
            config: None,
        }
    }

    pub fn with_composition(mut self, composition: impl Into<String>) -> Self {
        self.composition = Some(composition.into());
        self
    }

    pub fn with_config(mut self, config: impl Into<String>) -> Self {
        self.config = Some(config.into());
        self
    }
}

/// One weighted token of a strategy basket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenEntry {
    /// Uppercased ticker symbol
    pub symbol: String,
    /// Raw weight, normalized when the snapshot is built
    pub weight: f64,
    /// Resolved mint address; `None` means the token cannot be priced
    pub mint: Option<String>,
}

impl TokenEntry {
    pub fn new(symbol: &str, weight: f64, mint: Option<String>) -> Self {
        Self {
            symbol: symbol.to_uppercase(),
            weight,
            mint,
        }
    }

    /// Key used in the snapshot maps: the mint when known, else the symbol
    pub fn key(&self) -> &str {
        self.mint.as_deref().unwrap_or(&self.symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_entry_key_prefers_mint() {
        let resolved = TokenEntry::new("sol", 1.0, Some("So11111111111111111111111111111111111111112".into()));
        assert_eq!(resolved.symbol, "SOL");
        assert_eq!(resolved.key(), "So11111111111111111111111111111111111111112");

        let unresolved = TokenEntry::new("foo", 1.0, None);
        assert_eq!(unresolved.key(), "FOO");
    }
}

//! Strategy composition parsing
//!
//! A strategy stores its basket as JSON text in `composition`, with older rows
//! keeping it in `config`. Either column may be empty, malformed, or hold an
//! object rather than a token array; none of these are errors. Everything past
//! this module only sees [`TokenEntry`].

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::{StrategyRow, TokenEntry};
use crate::resolver::{TokenHints, TokenResolver};

/// A decoded payload column
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CompositionPayload {
    /// A JSON array; individual items are validated later
    Tokens(Vec<Value>),
    /// Valid JSON of any other shape
    Unrecognized(Value),
}

impl CompositionPayload {
    /// Decode a payload column. Malformed JSON decodes as `Unrecognized`.
    pub fn decode(raw: &str) -> Self {
        match serde_json::from_str(raw) {
            Ok(payload) => payload,
            Err(e) => {
                debug!("Composition payload is not valid JSON: {}", e);
                CompositionPayload::Unrecognized(Value::Null)
            }
        }
    }

    pub fn into_tokens(self) -> Option<Vec<Value>> {
        match self {
            CompositionPayload::Tokens(items) => Some(items),
            CompositionPayload::Unrecognized(_) => None,
        }
    }
}

/// Extracts token lists from strategy rows
#[derive(Debug, Clone)]
pub struct CompositionParser {
    resolver: TokenResolver,
}

impl CompositionParser {
    pub fn new(resolver: TokenResolver) -> Self {
        Self { resolver }
    }

    /// Token list of a strategy; empty when neither column holds an array.
    pub fn parse_tokens(&self, row: &StrategyRow) -> Vec<TokenEntry> {
        let items = [row.composition.as_deref(), row.config.as_deref()]
            .into_iter()
            .flatten()
            .filter(|raw| !raw.trim().is_empty())
            .find_map(|raw| CompositionPayload::decode(raw).into_tokens());

        match items {
            Some(items) => items
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|item| self.parse_entry(item))
                .collect(),
            None => {
                debug!(strategy_id = %row.id, "No usable composition payload");
                Vec::new()
            }
        }
    }

    /// Keep items with a non-empty string symbol and a finite,
    /// non-negative numeric weight.
    fn parse_entry(&self, item: &Map<String, Value>) -> Option<TokenEntry> {
        let symbol = item
            .get("symbol")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())?;
        let weight = item
            .get("weight")
            .and_then(Value::as_f64)
            .filter(|w| w.is_finite() && *w >= 0.0)?;

        let hints = TokenHints {
            mint: item.get("mint").and_then(Value::as_str),
            address: item.get("address").and_then(Value::as_str),
            symbol: Some(symbol),
        };

        Some(TokenEntry::new(symbol, weight, self.resolver.resolve(&hints)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::SymbolTable;
    use std::sync::Arc;

    const SOL: &str = "So11111111111111111111111111111111111111112";
    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn parser() -> CompositionParser {
        CompositionParser::new(TokenResolver::new(Arc::new(SymbolTable::strict())))
    }

    #[test]
    fn test_decode_variants() {
        assert!(matches!(
            CompositionPayload::decode(r#"[{"symbol":"SOL"}]"#),
            CompositionPayload::Tokens(items) if items.len() == 1
        ));
        assert!(matches!(
            CompositionPayload::decode(r#"{"tokens":[]}"#),
            CompositionPayload::Unrecognized(_)
        ));
        assert!(matches!(
            CompositionPayload::decode("{not json"),
            CompositionPayload::Unrecognized(Value::Null)
        ));
    }

    #[test]
    fn test_parse_primary_composition() {
        let row = StrategyRow::new("s1")
            .with_composition(r#"[{"symbol":"sol","weight":60},{"symbol":"USDC","weight":40}]"#);

        let tokens = parser().parse_tokens(&row);
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], TokenEntry::new("SOL", 60.0, Some(SOL.to_string())));
        assert_eq!(tokens[1], TokenEntry::new("USDC", 40.0, Some(USDC.to_string())));
    }

    #[test]
    fn test_explicit_mint_field_is_used() {
        let mint = "Mint111111111111111111111111111111111111111";
        let row = StrategyRow::new("s1")
            .with_composition(format!(r#"[{{"symbol":"XYZ","weight":1,"mint":"{mint}"}}]"#));

        let tokens = parser().parse_tokens(&row);
        assert_eq!(tokens[0].mint.as_deref(), Some(mint));
    }

    #[test]
    fn test_falls_back_to_config_when_composition_is_object() {
        let row = StrategyRow::new("s1")
            .with_composition(r#"{"name":"My basket"}"#)
            .with_config(r#"[{"symbol":"BONK","weight":100}]"#);

        let tokens = parser().parse_tokens(&row);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].symbol, "BONK");
    }

    #[test]
    fn test_falls_back_to_config_when_composition_is_malformed_or_blank() {
        for composition in ["[{broken", "   "] {
            let row = StrategyRow::new("s1")
                .with_composition(composition)
                .with_config(r#"[{"symbol":"WIF","weight":5}]"#);
            assert_eq!(parser().parse_tokens(&row).len(), 1);
        }
    }

    #[test]
    fn test_invalid_entries_are_dropped() {
        let row = StrategyRow::new("s1").with_composition(
            r#"[
                {"symbol":"SOL","weight":"60"},
                {"symbol":"","weight":10},
                {"weight":10},
                {"symbol":42,"weight":10},
                {"symbol":"JUP","weight":-1},
                7,
                {"symbol":"RAY","weight":0}
            ]"#,
        );

        let tokens = parser().parse_tokens(&row);
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].symbol, "RAY");
        assert_eq!(tokens[0].weight, 0.0);
    }

    #[test]
    fn test_unresolvable_symbol_is_kept_without_mint() {
        let row = StrategyRow::new("s2").with_composition(r#"[{"symbol":"UNKNOWNSYM","weight":100}]"#);

        let tokens = parser().parse_tokens(&row);
        assert_eq!(tokens, vec![TokenEntry::new("UNKNOWNSYM", 100.0, None)]);
    }

    #[test]
    fn test_missing_payloads_yield_no_tokens() {
        assert!(parser().parse_tokens(&StrategyRow::new("s3")).is_empty());

        let row = StrategyRow::new("s3")
            .with_composition("null")
            .with_config("{}");
        assert!(parser().parse_tokens(&row).is_empty());
    }

    #[test]
    fn test_empty_array_is_used_as_is() {
        let row = StrategyRow::new("s1")
            .with_composition("[]")
            .with_config(r#"[{"symbol":"SOL","weight":1}]"#);
        assert!(parser().parse_tokens(&row).is_empty());
    }
}

//! Token resolution
//!
//! Maps a token descriptor from a strategy payload to its mint address.
//! Resolution order:
//! - an explicit `mint` field that looks like a real address
//! - a generic `address` field under the same test
//! - the uppercased symbol looked up in the curated symbol table

mod token_list;

pub use token_list::{CuratedToken, STRICT_LIST};

use std::collections::HashMap;
use std::sync::Arc;

/// Strings at or below this length are never treated as addresses
pub const MIN_ADDRESS_LEN: usize = 20;

/// Immutable uppercased-symbol -> mint table
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    by_symbol: HashMap<String, String>,
}

impl SymbolTable {
    pub fn from_tokens(tokens: &[CuratedToken]) -> Self {
        Self::from_pairs(tokens.iter().map(|t| (t.symbol, t.mint)))
    }

    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let by_symbol = pairs
            .into_iter()
            .map(|(symbol, mint)| (symbol.to_uppercase(), mint.to_string()))
            .collect();
        Self { by_symbol }
    }

    /// Table built from the curated strict list
    pub fn strict() -> Self {
        Self::from_tokens(STRICT_LIST)
    }

    pub fn lookup(&self, symbol: &str) -> Option<&str> {
        self.by_symbol
            .get(&symbol.to_uppercase())
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

/// The address-bearing fields of a token descriptor
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenHints<'a> {
    pub mint: Option<&'a str>,
    pub address: Option<&'a str>,
    pub symbol: Option<&'a str>,
}

/// Resolves token descriptors to mint addresses
#[derive(Debug, Clone)]
pub struct TokenResolver {
    table: Arc<SymbolTable>,
}

impl TokenResolver {
    pub fn new(table: Arc<SymbolTable>) -> Self {
        Self { table }
    }

    /// Returns `None` when the token is unpriceable; that is not an error.
    pub fn resolve(&self, hints: &TokenHints<'_>) -> Option<String> {
        if let Some(mint) = hints.mint.filter(|m| looks_like_address(m)) {
            return Some(mint.to_string());
        }
        if let Some(address) = hints.address.filter(|a| looks_like_address(a)) {
            return Some(address.to_string());
        }
        hints
            .symbol
            .and_then(|s| self.table.lookup(s))
            .map(str::to_string)
    }
}

fn looks_like_address(candidate: &str) -> bool {
    candidate.len() > MIN_ADDRESS_LEN
}

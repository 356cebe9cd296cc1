//! Upstream USD pricing
//!
//! Every upstream source implements [`PriceProvider`]. The [`PriceAggregator`]
//! asks them in order, each one only for the ids still unpriced, and merges
//! what comes back into a single [`PriceMap`](crate::domain::PriceMap).

mod aggregator;
mod coingecko;
mod dexscreener;
mod jupiter;

pub use aggregator::PriceAggregator;
pub use coingecko::CoinGeckoProvider;
pub use dexscreener::{best_prices_by_liquidity, DexScreenerPair, DexScreenerProvider};
pub use jupiter::JupiterProvider;

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

use crate::error::Result;

/// Prices returned by one provider call, keyed by asset id
pub type ProviderQuotes = HashMap<String, f64>;

/// A source of USD prices keyed by asset id
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Tag recorded as the price source
    fn name(&self) -> &'static str;

    /// Maximum ids per `fetch` call
    fn batch_size(&self) -> usize;

    /// Fetch prices for `ids`. Ids the provider has no price for are
    /// simply absent from the result.
    async fn fetch(&self, ids: &[String]) -> Result<ProviderQuotes>;
}

/// Upstream APIs send prices as JSON strings or numbers
pub(crate) fn parse_price(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_price_accepts_strings_and_numbers() {
        assert_eq!(parse_price(&json!("150.25")), Some(150.25));
        assert_eq!(parse_price(&json!(1.5)), Some(1.5));
        assert_eq!(parse_price(&json!("abc")), None);
        assert_eq!(parse_price(&Value::Null), None);
    }
}

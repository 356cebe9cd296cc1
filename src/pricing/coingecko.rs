//! CoinGecko token-price API (optional last-resort provider)
//!
//! Endpoint: `GET {base}/simple/token_price/solana?contract_addresses=...&vs_currencies=usd`
//! Response: `{"<address>": {"usd": 1.23}}`. Address keys may come back in a
//! different case than requested, so they are matched case-insensitively.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::debug;

use super::{PriceProvider, ProviderQuotes};
use crate::config::ProviderConfig;
use crate::error::{IndexerError, Result};

pub const PROVIDER_NAME: &str = "coingecko";

#[derive(Debug, Deserialize)]
struct TokenPrice {
    #[serde(default)]
    usd: Option<f64>,
}

/// CoinGecko price provider
pub struct CoinGeckoProvider {
    client: reqwest::Client,
    base_url: String,
    batch_size: usize,
    api_key: Option<String>,
}

impl CoinGeckoProvider {
    pub fn new(client: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            batch_size: config.batch_size,
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn batch_size(&self) -> usize {
        self.batch_size
    }

    async fn fetch(&self, ids: &[String]) -> Result<ProviderQuotes> {
        if ids.is_empty() {
            return Ok(ProviderQuotes::new());
        }

        let url = format!(
            "{}/simple/token_price/solana?contract_addresses={}&vs_currencies=usd",
            self.base_url,
            ids.join(",")
        );
        debug!("Fetching CoinGecko prices for {} tokens", ids.len());

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(IndexerError::provider(
                PROVIDER_NAME,
                format!("HTTP {}", response.status()),
            ));
        }

        let body: HashMap<String, TokenPrice> = response
            .json()
            .await
            .map_err(|e| IndexerError::provider(PROVIDER_NAME, format!("parse error: {}", e)))?;

        let priced: HashMap<String, f64> = body
            .into_iter()
            .filter_map(|(address, price)| Some((address, price.usd?)))
            .collect();

        let quotes = ids
            .iter()
            .filter_map(|id| match_address(&priced, id).map(|price| (id.clone(), price)))
            .collect();

        Ok(quotes)
    }
}

/// Exact key first. CoinGecko may lowercase addresses, so otherwise accept a
/// case-insensitive match, but only when exactly one key matches.
fn match_address(priced: &HashMap<String, f64>, id: &str) -> Option<f64> {
    if let Some(price) = priced.get(id) {
        return Some(*price);
    }

    let mut matches = priced
        .iter()
        .filter(|(address, _)| address.eq_ignore_ascii_case(id));
    match (matches.next(), matches.next()) {
        (Some((_, price)), None) => Some(*price),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, MockServer};
    use serde_json::json;

    #[test]
    fn test_match_address_prefers_exact_key() {
        let priced: HashMap<String, f64> = [
            ("MintA".to_string(), 1.0),
            ("minta".to_string(), 2.0),
            ("mintb".to_string(), 3.0),
        ]
        .into_iter()
        .collect();

        assert_eq!(match_address(&priced, "MintA"), Some(1.0));
        assert_eq!(match_address(&priced, "MINTB"), Some(3.0));
        // two keys fold to the same id and neither is exact
        assert_eq!(match_address(&priced, "MINTA"), None);
        assert_eq!(match_address(&priced, "MintC"), None);
    }

    #[tokio::test]
    async fn test_fetch_matches_addresses_case_insensitively() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/simple/token_price/solana")
                    .query_param("contract_addresses", "MintA,MintB")
                    .query_param("vs_currencies", "usd");
                then.status(200).json_body(json!({
                    "minta": {"usd": 4.2},
                    "MintB": {}
                }));
            })
            .await;

        let config = ProviderConfig {
            enabled: true,
            base_url: server.base_url(),
            ..ProviderConfig::coingecko()
        };
        let provider = CoinGeckoProvider::new(reqwest::Client::new(), &config);
        let prices = provider
            .fetch(&["MintA".to_string(), "MintB".to_string()])
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(prices.len(), 1);
        assert_eq!(prices["MintA"], 4.2);
    }
}

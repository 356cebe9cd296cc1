//! DexScreener token-pairs API
//!
//! Endpoint: `GET {base}/latest/dex/tokens/{mint1,mint2,...}`
//! Returns every trading pair involving the requested tokens; a token can
//! appear in many pairs, so the most liquid pair sets its price.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use super::{parse_price, PriceProvider, ProviderQuotes};
use crate::config::ProviderConfig;
use crate::domain::is_valid_price;
use crate::error::{IndexerError, Result};

pub const PROVIDER_NAME: &str = "dexscreener";

#[derive(Debug, Clone, Deserialize)]
struct TokensResponse {
    #[serde(default)]
    pairs: Option<Vec<DexScreenerPair>>,
}

/// The parts of a DexScreener pair this crate reads
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DexScreenerPair {
    #[serde(rename = "baseToken", default)]
    pub base_token: Option<BaseToken>,
    #[serde(rename = "priceUsd", default)]
    pub price_usd: Value,
    #[serde(default)]
    pub liquidity: Option<Liquidity>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BaseToken {
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Liquidity {
    #[serde(default)]
    pub usd: Option<f64>,
}

/// Pick one price per base token.
///
/// A later pair replaces an earlier one only with strictly greater USD
/// liquidity, so with equal or missing liquidity the first pair seen wins.
pub fn best_prices_by_liquidity(pairs: &[DexScreenerPair]) -> ProviderQuotes {
    let mut best: HashMap<String, (f64, f64)> = HashMap::new();

    for pair in pairs {
        let mint = match pair.base_token.as_ref().and_then(|t| t.address.as_ref()) {
            Some(mint) => mint,
            None => continue,
        };
        let price = match parse_price(&pair.price_usd).filter(|p| is_valid_price(*p)) {
            Some(price) => price,
            None => continue,
        };
        let liquidity = pair
            .liquidity
            .as_ref()
            .and_then(|l| l.usd)
            .filter(|l| l.is_finite())
            .unwrap_or(0.0);

        match best.get(mint) {
            Some((_, existing)) if liquidity <= *existing => {}
            _ => {
                best.insert(mint.clone(), (price, liquidity));
            }
        }
    }

    best.into_iter()
        .map(|(mint, (price, _))| (mint, price))
        .collect()
}

/// DexScreener price provider
pub struct DexScreenerProvider {
    client: reqwest::Client,
    base_url: String,
    batch_size: usize,
}

impl DexScreenerProvider {
    pub fn new(client: reqwest::Client, config: &ProviderConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            batch_size: config.batch_size,
        }
    }
}

#[async_trait]
impl PriceProvider for DexScreenerProvider {
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

        let url = format!("{}/latest/dex/tokens/{}", self.base_url, ids.join(","));
        debug!("Fetching DexScreener pairs for {} tokens", ids.len());

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(IndexerError::provider(
                PROVIDER_NAME,
                format!("HTTP {}", response.status()),
            ));
        }

        let body: TokensResponse = response
            .json()
            .await
            .map_err(|e| IndexerError::provider(PROVIDER_NAME, format!("parse error: {}", e)))?;

        Ok(best_prices_by_liquidity(&body.pairs.unwrap_or_default()))
    }
}

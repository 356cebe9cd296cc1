//! Jupiter Price API v2
//!
//! Endpoint: `GET {base}/price/v2?ids=mint1,mint2`
//! Response: `{"data": {"<mint>": {"id": "...", "price": "123.45"} | null}}`

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::debug;

use super::{parse_price, PriceProvider, ProviderQuotes};
use crate::config::ProviderConfig;
use crate::error::{IndexerError, Result};

pub const PROVIDER_NAME: &str = "jupiter";

#[derive(Debug, Deserialize)]
struct PriceResponse {
    #[serde(default)]
    data: Option<HashMap<String, Option<PriceEntry>>>,
}

#[derive(Debug, Deserialize)]
struct PriceEntry {
    #[serde(default)]
    price: Value,
}

/// Jupiter price provider
pub struct JupiterProvider {
    client: reqwest::Client,
    base_url: String,
    batch_size: usize,
    api_key: Option<String>,
}

impl JupiterProvider {
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
impl PriceProvider for JupiterProvider {
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

        let url = format!("{}/price/v2?ids={}", self.base_url, ids.join(","));
        debug!("Fetching Jupiter prices for {} tokens", ids.len());

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }
        let response = request.send().await?;

        if !response.status().is_success() {
            return Err(IndexerError::provider(
                PROVIDER_NAME,
                format!("HTTP {}", response.status()),
            ));
        }

        let body: PriceResponse = response
            .json()
            .await
            .map_err(|e| IndexerError::provider(PROVIDER_NAME, format!("parse error: {}", e)))?;

        let quotes = body
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(mint, entry)| {
                let price = parse_price(&entry?.price)?;
                Some((mint, price))
            })
            .collect();

        Ok(quotes)
    }
}

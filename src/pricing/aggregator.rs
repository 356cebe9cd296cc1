use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{CoinGeckoProvider, DexScreenerProvider, JupiterProvider, PriceProvider, ProviderQuotes};
use crate::config::ProvidersConfig;
use crate::domain::{is_valid_price, PriceMap, PriceQuote};
use crate::error::{IndexerError, Result};

/// Queries providers in order and merges their answers.
///
/// The first provider sees every id; each later one only sees ids that are
/// still unpriced. A failed or timed-out chunk contributes nothing and never
/// aborts the fetch.
pub struct PriceAggregator {
    providers: Vec<Arc<dyn PriceProvider>>,
    request_timeout: Duration,
}

impl PriceAggregator {
    pub fn new(request_timeout: Duration) -> Self {
        Self {
            providers: Vec::new(),
            request_timeout,
        }
    }

    /// Append a provider at the lowest priority
    pub fn with_provider(mut self, provider: Arc<dyn PriceProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Build the configured provider chain: DexScreener, Jupiter, CoinGecko
    pub fn from_config(config: &ProvidersConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        let mut aggregator = Self::new(config.request_timeout());

        if config.dexscreener.enabled {
            aggregator = aggregator.with_provider(Arc::new(DexScreenerProvider::new(
                client.clone(),
                &config.dexscreener,
            )));
        }
        if config.jupiter.enabled {
            aggregator = aggregator.with_provider(Arc::new(JupiterProvider::new(
                client.clone(),
                &config.jupiter,
            )));
        }
        if config.coingecko.enabled {
            aggregator = aggregator.with_provider(Arc::new(CoinGeckoProvider::new(
                client,
                &config.coingecko,
            )));
        }

        info!(
            "Price providers: [{}]",
            aggregator.provider_names().join(", ")
        );
        Ok(aggregator)
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Price every id. The result always holds an entry per requested id;
    /// ids nobody could price keep `PriceQuote::unknown()`.
    pub async fn fetch_prices(&self, ids: &BTreeSet<String>) -> PriceMap {
        let mut results: PriceMap = ids
            .iter()
            .map(|id| (id.clone(), PriceQuote::unknown()))
            .collect();

        for provider in &self.providers {
            let pending: Vec<String> = results
                .iter()
                .filter(|(_, quote)| !quote.is_priced())
                .map(|(id, _)| id.clone())
                .collect();

            if pending.is_empty() {
                break;
            }

            let mut priced = 0usize;
            let batch_size = provider.batch_size().max(1);

            for (chunk_index, chunk) in pending.chunks(batch_size).enumerate() {
                match self.fetch_chunk(provider.as_ref(), chunk).await {
                    Ok(quotes) => {
                        for id in chunk {
                            let price = quotes.get(id).copied().filter(|p| is_valid_price(*p));
                            if let Some(price) = price {
                                results.insert(id.clone(), PriceQuote::from_provider(provider.name(), price));
                                priced += 1;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(
                            provider = provider.name(),
                            chunk = chunk_index,
                            chunk_size = chunk.len(),
                            "Price chunk failed: {}",
                            e
                        );
                    }
                }
            }

            debug!(
                provider = provider.name(),
                requested = pending.len(),
                priced,
                "Provider pass complete"
            );
        }

        results
    }

    async fn fetch_chunk(&self, provider: &dyn PriceProvider, chunk: &[String]) -> Result<ProviderQuotes> {
        match tokio::time::timeout(self.request_timeout, provider.fetch(chunk)).await {
            Ok(result) => result,
            Err(_) => Err(IndexerError::ProviderTimeout {
                provider: provider.name().to_string(),
                timeout_ms: self.request_timeout.as_millis() as u64,
            }),
        }
    }
}

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::domain::{
    Confidence, PriceMap, PriceSource, SnapshotMetadata, SnapshotRecord, TokenEntry,
    SNAPSHOT_VERSION,
};

/// Value one strategy's basket against a shared price map.
///
/// Weights are normalized over every entry, priced or not, so the weight map
/// sums to 1 whenever the total weight is positive. Entries that share a key
/// accumulate their weights.
pub fn build_snapshot(
    strategy_id: &str,
    ts_bucket_utc: i64,
    tokens: &[TokenEntry],
    prices: &PriceMap,
    created_at: DateTime<Utc>,
) -> SnapshotRecord {
    let failed = |code: &str| SnapshotRecord {
        strategy_id: strategy_id.to_string(),
        ts_bucket_utc,
        index_price: 0.0,
        prices: BTreeMap::new(),
        weights: BTreeMap::new(),
        sources: BTreeMap::new(),
        confidence: Confidence::Fail,
        version: SNAPSHOT_VERSION,
        metadata: Some(SnapshotMetadata::error(code)),
        created_at,
    };

    if tokens.is_empty() {
        return failed(SnapshotMetadata::NO_TOKENS);
    }

    // Scaled by the largest weight so the sum stays finite for any finite input.
    let max_weight = tokens.iter().map(|t| t.weight).fold(0.0_f64, f64::max);
    if max_weight <= 0.0 {
        return failed(SnapshotMetadata::ZERO_TOTAL_WEIGHT);
    }
    let total_weight: f64 = tokens.iter().map(|t| t.weight / max_weight).sum();

    let mut price_map = BTreeMap::new();
    let mut weights: BTreeMap<String, f64> = BTreeMap::new();
    let mut sources = BTreeMap::new();
    let mut missing = Vec::new();
    let mut index_price = 0.0;

    for token in tokens {
        let normalized_weight = token.weight / max_weight / total_weight;
        let key = token.key().to_string();

        *weights.entry(key.clone()).or_insert(0.0) += normalized_weight;

        let Some(mint) = token.mint.as_ref() else {
            price_map.insert(key.clone(), 0.0);
            sources.insert(key, PriceSource::NoMint);
            missing.push(token.symbol.clone());
            continue;
        };

        let quote = prices.get(mint).copied().unwrap_or_default();
        price_map.insert(key.clone(), quote.price_usd);
        sources.insert(key, quote.source);

        if !quote.is_priced() {
            missing.push(token.symbol.clone());
            continue;
        }

        index_price += normalized_weight * quote.price_usd;
    }

    let confidence = Confidence::classify(missing.len(), tokens.len());
    let metadata = if missing.is_empty() {
        None
    } else {
        Some(SnapshotMetadata {
            error: None,
            missing_mints: missing,
        })
    };

    SnapshotRecord {
        strategy_id: strategy_id.to_string(),
        ts_bucket_utc,
        index_price,
        prices: price_map,
        weights,
        sources,
        confidence,
        version: SNAPSHOT_VERSION,
        metadata,
        created_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PriceQuote;

    const SOL: &str = "So11111111111111111111111111111111111111112";
    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";
    const BONK: &str = "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263";
    const BUCKET: i64 = 1_700_000_100;

    fn token(symbol: &str, weight: f64, mint: Option<&str>) -> TokenEntry {
        TokenEntry::new(symbol, weight, mint.map(str::to_string))
    }

    fn prices(list: &[(&str, f64)]) -> PriceMap {
        list.iter()
            .map(|(mint, p)| (mint.to_string(), PriceQuote::from_provider("dexscreener", *p)))
            .collect()
    }

    fn build(tokens: &[TokenEntry], prices: &PriceMap) -> SnapshotRecord {
        build_snapshot("s", BUCKET, tokens, prices, Utc::now())
    }

    #[test]
    fn test_fully_priced_basket() {
        let tokens = [token("SOL", 60.0, Some(SOL)), token("USDC", 40.0, Some(USDC))];
        let snapshot = build(&tokens, &prices(&[(SOL, 150.0), (USDC, 1.0)]));

        assert!((snapshot.index_price - 90.4).abs() < 1e-9);
        assert_eq!(snapshot.confidence, Confidence::Ok);
        assert_eq!(snapshot.metadata, None);
        assert_eq!(snapshot.ts_bucket_utc, BUCKET);
        assert_eq!(snapshot.sources[SOL], PriceSource::Provider("dexscreener"));
        assert!((snapshot.weights[SOL] - 0.6).abs() < 1e-12);
        assert!((snapshot.weights[USDC] - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_unresolved_token_fails() {
        let tokens = [token("UNKNOWNSYM", 100.0, None)];
        let snapshot = build(&tokens, &PriceMap::new());

        assert_eq!(snapshot.confidence, Confidence::Fail);
        assert_eq!(snapshot.index_price, 0.0);
        assert_eq!(snapshot.sources["UNKNOWNSYM"], PriceSource::NoMint);
        assert_eq!(snapshot.prices["UNKNOWNSYM"], 0.0);
        assert_eq!(snapshot.weights["UNKNOWNSYM"], 1.0);
        assert_eq!(
            snapshot.metadata.unwrap().missing_mints,
            vec!["UNKNOWNSYM".to_string()]
        );
    }

    #[test]
    fn test_empty_basket() {
        let snapshot = build(&[], &PriceMap::new());

        assert_eq!(snapshot.confidence, Confidence::Fail);
        assert_eq!(snapshot.index_price, 0.0);
        assert!(snapshot.prices.is_empty() && snapshot.weights.is_empty() && snapshot.sources.is_empty());
        assert_eq!(snapshot.metadata_json().unwrap(), Some(serde_json::json!({"error": "no_tokens"})));
    }

    #[test]
    fn test_zero_total_weight() {
        let tokens = [token("SOL", 0.0, Some(SOL)), token("USDC", 0.0, Some(USDC))];
        let snapshot = build(&tokens, &prices(&[(SOL, 150.0), (USDC, 1.0)]));

        assert_eq!(snapshot.confidence, Confidence::Fail);
        assert_eq!(snapshot.index_price, 0.0);
        assert!(snapshot.weights.is_empty());
        assert_eq!(
            snapshot.metadata.unwrap().error.as_deref(),
            Some("zero_total_weight")
        );
    }

    #[test]
    fn test_huge_weights_still_normalize() {
        let tokens = [token("SOL", 1e308, Some(SOL)), token("USDC", 1e308, Some(USDC))];
        let snapshot = build(&tokens, &prices(&[(SOL, 150.0), (USDC, 1.0)]));

        let sum: f64 = snapshot.weights.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!((snapshot.weights[SOL] - 0.5).abs() < 1e-12);
        assert!((snapshot.index_price - 75.5).abs() < 1e-9);
        assert_eq!(snapshot.confidence, Confidence::Ok);
    }

    #[test]
    fn test_partial_basket() {
        let tokens = [
            token("SOL", 50.0, Some(SOL)),
            token("BONK", 25.0, Some(BONK)),
            token("FOO", 25.0, None),
        ];
        let mut map = prices(&[(SOL, 100.0)]);
        map.insert(BONK.to_string(), PriceQuote::unknown());

        let snapshot = build(&tokens, &map);

        assert_eq!(snapshot.confidence, Confidence::Partial);
        assert!((snapshot.index_price - 50.0).abs() < 1e-9);
        assert_eq!(snapshot.sources[BONK], PriceSource::None);
        assert_eq!(snapshot.sources["FOO"], PriceSource::NoMint);
        assert_eq!(
            snapshot.metadata.unwrap().missing_mints,
            vec!["BONK".to_string(), "FOO".to_string()]
        );
    }

    #[test]
    fn test_mint_absent_from_price_map_counts_as_missing() {
        let tokens = [token("SOL", 1.0, Some(SOL)), token("USDC", 1.0, Some(USDC))];
        let snapshot = build(&tokens, &prices(&[(SOL, 100.0)]));

        assert_eq!(snapshot.confidence, Confidence::Partial);
        assert_eq!(snapshot.sources[USDC], PriceSource::None);
        assert_eq!(snapshot.prices[USDC], 0.0);
    }

    #[test]
    fn test_all_resolved_but_unpriced_fails_regardless_of_index() {
        let tokens = [token("SOL", 1.0, Some(SOL))];
        let snapshot = build(&tokens, &PriceMap::new());
        assert_eq!(snapshot.confidence, Confidence::Fail);
    }

    #[test]
    fn test_duplicate_keys_accumulate_weight() {
        let tokens = [
            token("SOL", 30.0, Some(SOL)),
            token("SOL", 30.0, Some(SOL)),
            token("USDC", 40.0, Some(USDC)),
        ];
        let snapshot = build(&tokens, &prices(&[(SOL, 150.0), (USDC, 1.0)]));

        assert_eq!(snapshot.weights.len(), 2);
        assert!((snapshot.weights[SOL] - 0.6).abs() < 1e-12);
        assert!((snapshot.index_price - 90.4).abs() < 1e-9);
    }

    #[test]
    fn test_weights_normalize_and_index_is_weighted_sum() {
        let baskets: Vec<Vec<TokenEntry>> = vec![
            vec![token("SOL", 1.0, Some(SOL))],
            vec![token("SOL", 3.0, Some(SOL)), token("USDC", 7.0, Some(USDC))],
            vec![
                token("SOL", 0.1, Some(SOL)),
                token("USDC", 0.2, Some(USDC)),
                token("BONK", 0.3, Some(BONK)),
                token("NOPE", 0.4, None),
            ],
            vec![token("BONK", 12.5, Some(BONK)), token("USDC", 0.0, Some(USDC))],
        ];
        let map = prices(&[(SOL, 151.3), (USDC, 0.9998), (BONK, 0.000021)]);

        for tokens in baskets {
            let snapshot = build(&tokens, &map);
            let sum: f64 = snapshot.weights.values().sum();
            assert!((sum - 1.0).abs() < 1e-9, "weights sum to {}", sum);

            let expected: f64 = snapshot
                .weights
                .iter()
                .map(|(key, w)| w * snapshot.prices[key])
                .sum();
            assert!((snapshot.index_price - expected).abs() < 1e-9);
        }
    }
}

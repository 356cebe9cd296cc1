use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::price::PriceSource;

/// Width of a snapshot bucket in seconds
pub const BUCKET_SECONDS: i64 = 300;

/// Current layout version of persisted snapshot rows
pub const SNAPSHOT_VERSION: i32 = 1;

/// Round a unix timestamp down to the start of its bucket
pub fn bucket_start(unix_secs: i64, bucket_seconds: i64) -> i64 {
    unix_secs.div_euclid(bucket_seconds) * bucket_seconds
}

/// How completely a snapshot's inputs were priced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Ok,
    Partial,
    Fail,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Ok => "OK",
            Confidence::Partial => "PARTIAL",
            Confidence::Fail => "FAIL",
        }
    }

    /// Classify from counts alone; the index value plays no part.
    pub fn classify(missing: usize, total: usize) -> Self {
        if total == 0 || missing >= total {
            Confidence::Fail
        } else if missing == 0 {
            Confidence::Ok
        } else {
            Confidence::Partial
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Confidence {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.to_uppercase().as_str() {
            "OK" => Ok(Confidence::Ok),
            "PARTIAL" => Ok(Confidence::Partial),
            "FAIL" => Ok(Confidence::Fail),
            _ => Err(format!("Unknown confidence: {}", s)),
        }
    }
}

/// Diagnostics attached to a snapshot row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Symbols that could not be priced
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_mints: Vec<String>,
}

impl SnapshotMetadata {
    pub const NO_TOKENS: &'static str = "no_tokens";
    pub const ZERO_TOTAL_WEIGHT: &'static str = "zero_total_weight";

    pub fn error(code: &str) -> Self {
        Self {
            error: Some(code.to_string()),
            missing_mints: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.error.is_none() && self.missing_mints.is_empty()
    }
}

/// One strategy's valuation for one bucket.
///
/// Keyed on `(strategy_id, ts_bucket_utc)`; a rerun of the same bucket
/// replaces the row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotRecord {
    pub strategy_id: String,
    pub ts_bucket_utc: i64,
    pub index_price: f64,
    pub prices: BTreeMap<String, f64>,
    pub weights: BTreeMap<String, f64>,
    pub sources: BTreeMap<String, PriceSource>,
    pub confidence: Confidence,
    pub version: i32,
    pub metadata: Option<SnapshotMetadata>,
    pub created_at: DateTime<Utc>,
}

impl SnapshotRecord {
    /// Baseline row this snapshot would become if none exists yet
    pub fn baseline_candidate(&self) -> BaselineRecord {
        BaselineRecord {
            strategy_id: self.strategy_id.clone(),
            baseline_ts_bucket_utc: self.ts_bucket_utc,
            baseline_price: self.index_price,
            baseline_confidence: self.confidence,
            created_at: self.created_at,
        }
    }

    pub fn prices_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(&self.prices)
    }

    pub fn weights_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(&self.weights)
    }

    pub fn sources_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(&self.sources)
    }

    /// `None` when there is nothing worth storing
    pub fn metadata_json(&self) -> serde_json::Result<Option<serde_json::Value>> {
        match &self.metadata {
            Some(metadata) if !metadata.is_empty() => serde_json::to_value(metadata).map(Some),
            _ => Ok(None),
        }
    }
}

/// First-ever valuation of a strategy. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineRecord {
    pub strategy_id: String,
    pub baseline_ts_bucket_utc: i64,
    pub baseline_price: f64,
    pub baseline_confidence: Confidence,
    pub created_at: DateTime<Utc>,
}

/// Percent change of `latest_price` against the baseline.
///
/// `None` when the baseline was never priced.
pub fn performance_pct(baseline: &BaselineRecord, latest_price: f64) -> Option<f64> {
    if baseline.baseline_price > 0.0 && latest_price.is_finite() {
        Some((latest_price / baseline.baseline_price - 1.0) * 100.0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn baseline(price: f64) -> BaselineRecord {
        BaselineRecord {
            strategy_id: "s".into(),
            baseline_ts_bucket_utc: 0,
            baseline_price: price,
            baseline_confidence: Confidence::Ok,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_bucket_start_rounds_down() {
        assert_eq!(bucket_start(1_700_000_123, BUCKET_SECONDS), 1_700_000_100);
        assert_eq!(bucket_start(1_700_000_100, BUCKET_SECONDS), 1_700_000_100);
        assert_eq!(bucket_start(1_700_000_399, BUCKET_SECONDS), 1_700_000_100);
        assert_eq!(bucket_start(-1, BUCKET_SECONDS), -300);
    }

    #[test]
    fn test_confidence_classification() {
        assert_eq!(Confidence::classify(0, 3), Confidence::Ok);
        assert_eq!(Confidence::classify(1, 3), Confidence::Partial);
        assert_eq!(Confidence::classify(3, 3), Confidence::Fail);
        assert_eq!(Confidence::classify(0, 0), Confidence::Fail);
    }

    #[test]
    fn test_confidence_round_trips_through_str() {
        for c in [Confidence::Ok, Confidence::Partial, Confidence::Fail] {
            assert_eq!(Confidence::try_from(c.as_str()), Ok(c));
        }
        assert_eq!(serde_json::to_string(&Confidence::Partial).unwrap(), r#""PARTIAL""#);
        assert!(Confidence::try_from("maybe").is_err());
    }

    #[test]
    fn test_metadata_serialization_omits_empty_fields() {
        let meta = SnapshotMetadata::error(SnapshotMetadata::NO_TOKENS);
        assert_eq!(serde_json::to_string(&meta).unwrap(), r#"{"error":"no_tokens"}"#);

        let meta = SnapshotMetadata {
            error: None,
            missing_mints: vec!["BONK".into()],
        };
        assert_eq!(serde_json::to_string(&meta).unwrap(), r#"{"missing_mints":["BONK"]}"#);
        assert!(SnapshotMetadata::default().is_empty());
    }

    #[test]
    fn test_performance_pct() {
        let pct = performance_pct(&baseline(100.0), 110.0).unwrap();
        assert!((pct - 10.0).abs() < 1e-9);
        assert!(performance_pct(&baseline(0.0), 110.0).is_none());
    }
}

use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// Where a price came from.
///
/// `None` marks a requested asset no provider could price; `NoMint` marks a
/// token that never resolved to an asset id and so was never requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceSource {
    Provider(&'static str),
    None,
    NoMint,
}

impl PriceSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceSource::Provider(name) => *name,
            PriceSource::None => "none",
            PriceSource::NoMint => "no_mint",
        }
    }

    pub fn is_provider(&self) -> bool {
        matches!(self, PriceSource::Provider(_))
    }
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for PriceSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Best-effort USD price for one asset
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceQuote {
    /// USD price; `0.0` when unknown
    pub price_usd: f64,
    pub source: PriceSource,
}

impl PriceQuote {
    pub fn unknown() -> Self {
        Self {
            price_usd: 0.0,
            source: PriceSource::None,
        }
    }

    pub fn from_provider(provider: &'static str, price_usd: f64) -> Self {
        Self {
            price_usd,
            source: PriceSource::Provider(provider),
        }
    }

    /// A quote counts as priced only when a provider supplied a positive value
    pub fn is_priced(&self) -> bool {
        self.source.is_provider() && self.price_usd > 0.0
    }
}

impl Default for PriceQuote {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Asset id -> quote, ordered for deterministic iteration and serialization
pub type PriceMap = BTreeMap<String, PriceQuote>;

/// Check that an upstream price is usable: finite and strictly positive
pub fn is_valid_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

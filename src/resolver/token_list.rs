//! Curated Solana asset list used for symbol fallback resolution.

/// A curated asset: display symbol and mint address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CuratedToken {
    pub symbol: &'static str,
    pub mint: &'static str,
}

const fn token(symbol: &'static str, mint: &'static str) -> CuratedToken {
    CuratedToken { symbol, mint }
}

pub const STRICT_LIST: &[CuratedToken] = &[
    // Majors
    token("SOL", "So11111111111111111111111111111111111111112"),
    token("USDC", "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"),
    token("USDT", "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB"),
    token("WBTC", "3NZ9JMVBmGAqocyBIC2c7LQCJScmgsAZ6vQqTDzcqmJh"),
    token("WETH", "7vfCXTUXx5WJV5JADk17DUJ4ksgau7utNKj4b963voxs"),
    // DeFi
    token("JUP", "JUPyiwrYJFskUPiHa7hkeR8VUtkOp66YWug2yPnTxk3"),
    token("RAY", "4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R"),
    token("ORCA", "orcaEKTdK7LKz57vaAYr9QeNsVEPfiu6QeMU1kektZE"),
    token("PYTH", "HzwqbKZw8RnJC2SHW4Mg8BJyEZ56m47y59ccJeSDexi3"),
    token("RENDER", "rndrizKT3MK1iimdxRdWabcF7Zg7AR5T4nud4EkHBof"),
    token("HNT", "hntyVP6YFm1Hg25TN9WGLqM12b8TQmcknKrdu1oxWux"),
    // Liquid staking
    token("mSOL", "mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So"),
    token("jitoSOL", "J1toso1uCk3RLmjorhTtrVwY9HJ7X8V9yYac6Y7kGCPn"),
    token("bSOL", "bSo13r4TkiE4KumL71LsHTPpL2euBYLFx6h9HP3piy1"),
    // Memes
    token("BONK", "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263"),
    token("WIF", "EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm"),
    token("POPCAT", "7GCihgDB8fe6KNjn2MYtkzZcRjQy3t9GHdC8uHYmW2hr"),
];

pub mod coingecko;
pub mod defillama;
pub mod fx;

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;
use crate::models::{
    ChainHistoricalSample, CurrentChainPrice, FiatExchangeRate, Stablecoin,
    StablecoinLiquiditySnapshot,
};

#[async_trait]
pub trait HistoricalSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch_history(&self, chain: &str, days: u32) -> Result<Vec<ChainHistoricalSample>, FetchError>;
    async fn fetch_current(&self, chain: &str) -> Result<CurrentChainPrice, FetchError>;
}

#[async_trait]
pub trait LiquiditySource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch_liquidity(&self) -> Result<BTreeMap<Stablecoin, StablecoinLiquiditySnapshot>, FetchError>;
}

#[async_trait]
pub trait FiatRateSource: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch_rate(&self, currency: &str) -> Result<FiatExchangeRate, FetchError>;
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Rate limited by upstream API; try again in a minute")]
    RateLimit,
    #[error("Upstream returned HTTP {0}")]
    Status(u16),
    #[error("Unknown chain: {0}")]
    UnknownChain(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Required chain {chain} unavailable: {reason}")]
    RequiredChain { chain: String, reason: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            FetchError::Parse(e.to_string())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

/// Maps a non-success response to the matching error.
pub(crate) fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    let status = resp.status();
    if status.as_u16() == 429 {
        return Err(FetchError::RateLimit);
    }
    if !status.is_success() {
        return Err(FetchError::Status(status.as_u16()));
    }
    Ok(resp)
}

pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, FetchError> {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .user_agent("stable-allocator/0.1")
        .build()
        .map_err(|e| FetchError::Network(e.to_string()))
}

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use crate::models::{ChainHistoricalSample, CurrentChainPrice, Stablecoin};
use crate::services::{stats, tables};
use super::{check_status, http_client, FetchError, HistoricalSource};

const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";

/// Congestion multiplier bounds applied to the base transfer fee.
const MIN_CONGESTION: f64 = 0.5;
const MAX_CONGESTION: f64 = 2.0;

/// CoinGecko public API: native-token history for gas estimates and stablecoin market data.
pub struct CoinGeckoClient {
    client: Client,
}

#[derive(Debug, Deserialize)]
struct MarketChart {
    prices: Vec<[f64; 2]>,
    #[serde(default)]
    total_volumes: Vec<[f64; 2]>,
}

/// Market figures for one stablecoin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StablecoinMarket {
    pub price: f64,
    pub volume_24h: f64,
    pub market_cap: f64,
}

type SimplePrice = HashMap<String, HashMap<String, f64>>;

impl CoinGeckoClient {
    pub fn new(timeout_secs: u64) -> Result<Self, FetchError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
        })
    }

    async fn simple_price(&self, ids: &str, extra: &str) -> Result<SimplePrice, FetchError> {
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies=usd{}",
            COINGECKO_BASE_URL, ids, extra
        );
        let resp = self.client.get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;
        let data: SimplePrice = check_status(resp)?.json().await?;
        Ok(data)
    }

    pub async fn fetch_stablecoin_markets(&self) -> Result<BTreeMap<Stablecoin, StablecoinMarket>, FetchError> {
        let ids: Vec<&str> = Stablecoin::ALL.iter().map(|c| c.coingecko_id()).collect();
        let data = self
            .simple_price(&ids.join(","), "&include_market_cap=true&include_24hr_vol=true")
            .await?;
        Ok(parse_stablecoin_markets(&data))
    }
}

#[async_trait]
impl HistoricalSource for CoinGeckoClient {
    fn name(&self) -> &'static str {
        "CoinGecko"
    }

    async fn fetch_history(&self, chain: &str, days: u32) -> Result<Vec<ChainHistoricalSample>, FetchError> {
        let profile = tables::chain_profile(chain).ok_or_else(|| FetchError::UnknownChain(chain.to_string()))?;
        let url = format!(
            "{}/coins/{}/market_chart?vs_currency=usd&days={}&interval=daily",
            COINGECKO_BASE_URL, profile.coingecko_id, days
        );

        let resp = self.client.get(&url)
            .header("Accept", "application/json")
            .send()
            .await?;
        let chart: MarketChart = check_status(resp)?.json().await?;

        let samples = build_samples(profile.native_fee, &chart.prices, &chart.total_volumes);
        if samples.is_empty() {
            return Err(FetchError::NotFound(format!("no price history for {}", chain)));
        }
        tracing::debug!("{}: {} daily samples from CoinGecko", chain, samples.len());
        Ok(samples)
    }

    async fn fetch_current(&self, chain: &str) -> Result<CurrentChainPrice, FetchError> {
        let profile = tables::chain_profile(chain).ok_or_else(|| FetchError::UnknownChain(chain.to_string()))?;
        let data = self.simple_price(profile.coingecko_id, "").await?;
        let token_price = data
            .get(profile.coingecko_id)
            .and_then(|p| p.get("usd"))
            .copied()
            .ok_or_else(|| FetchError::NotFound(format!("current price for {}", profile.coingecko_id)))?;

        Ok(CurrentChainPrice {
            token_price,
            estimated_gas_cost_usd: token_price * profile.native_fee,
        })
    }
}

/// Turns a CoinGecko market chart into one sample per UTC day, oldest first.
///
/// The gas estimate scales the chain's base transfer fee by how busy the day
/// was relative to the period average.
pub fn build_samples(native_fee: f64, prices: &[[f64; 2]], volumes: &[[f64; 2]]) -> Vec<ChainHistoricalSample> {
    let by_day = |points: &[[f64; 2]]| -> BTreeMap<NaiveDate, f64> {
        points
            .iter()
            .filter_map(|[ts, value]| {
                DateTime::from_timestamp_millis(*ts as i64).map(|dt| (dt.date_naive(), *value))
            })
            .collect()
    };
    let daily_prices = by_day(prices);
    let daily_volumes = by_day(volumes);

    let all_volumes: Vec<f64> = daily_volumes.values().copied().collect();
    let avg_volume = stats::mean(&all_volumes);

    daily_prices
        .into_iter()
        .filter(|(_, price)| *price > 0.0)
        .map(|(date, price)| {
            let volume = daily_volumes.get(&date).copied().unwrap_or(0.0);
            let congestion = if avg_volume > 0.0 && volume > 0.0 {
                (volume / avg_volume).clamp(MIN_CONGESTION, MAX_CONGESTION)
            } else {
                1.0
            };
            ChainHistoricalSample {
                date,
                token_price: price,
                estimated_gas_cost_usd: price * native_fee * congestion,
                volume,
            }
        })
        .collect()
}

fn parse_stablecoin_markets(data: &SimplePrice) -> BTreeMap<Stablecoin, StablecoinMarket> {
    Stablecoin::ALL
        .iter()
        .filter_map(|coin| {
            data.get(coin.coingecko_id()).map(|fields| {
                (
                    *coin,
                    StablecoinMarket {
                        price: fields.get("usd").copied().unwrap_or(1.0),
                        volume_24h: fields.get("usd_24h_vol").copied().unwrap_or(0.0),
                        market_cap: fields.get("usd_market_cap").copied().unwrap_or(0.0),
                    },
                )
            })
        })
        .collect()
}

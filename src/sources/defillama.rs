use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use crate::models::{Stablecoin, StablecoinLiquiditySnapshot};
use crate::services::tables;
use super::coingecko::{CoinGeckoClient, StablecoinMarket};
use super::{check_status, http_client, FetchError, LiquiditySource};

const DEFILLAMA_STABLECOINS_URL: &str = "https://stablecoins.llama.fi/stablecoins?includePrices=true";

const MIN_FEE: f64 = 0.015;
const FEE_SPREAD: f64 = 0.015;

/// Per-chain stablecoin depth from DefiLlama, priced with CoinGecko market data.
pub struct DefiLlamaClient {
    client: Client,
    markets: Arc<CoinGeckoClient>,
    chains: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StablecoinsResponse {
    #[serde(rename = "peggedAssets")]
    pegged_assets: Vec<PeggedAsset>,
}

#[derive(Debug, Deserialize)]
struct PeggedAsset {
    symbol: String,
    #[serde(rename = "chainCirculating", default)]
    chain_circulating: HashMap<String, ChainCirculating>,
}

#[derive(Debug, Deserialize)]
struct ChainCirculating {
    current: Option<PeggedAmount>,
}

#[derive(Debug, Deserialize)]
struct PeggedAmount {
    #[serde(rename = "peggedUSD")]
    pegged_usd: Option<f64>,
}

/// chain label -> circulating USD, per stablecoin
pub type Circulation = BTreeMap<Stablecoin, HashMap<String, f64>>;

impl DefiLlamaClient {
    pub fn new(markets: Arc<CoinGeckoClient>, chains: Vec<String>, timeout_secs: u64) -> Result<Self, FetchError> {
        Ok(Self {
            client: http_client(timeout_secs)?,
            markets,
            chains,
        })
    }

    async fn fetch_circulation(&self) -> Result<Circulation, FetchError> {
        let resp = self.client.get(DEFILLAMA_STABLECOINS_URL)
            .header("Accept", "application/json")
            .send()
            .await?;
        let data: StablecoinsResponse = check_status(resp)?.json().await?;
        Ok(parse_circulation(data))
    }
}

#[async_trait]
impl LiquiditySource for DefiLlamaClient {
    fn name(&self) -> &'static str {
        "DefiLlama"
    }

    async fn fetch_liquidity(&self) -> Result<BTreeMap<Stablecoin, StablecoinLiquiditySnapshot>, FetchError> {
        let (circulation, markets) = futures::try_join!(
            self.fetch_circulation(),
            self.markets.fetch_stablecoin_markets()
        )?;

        let liquidity = derive_liquidity(&circulation, &markets, &self.chains);
        if liquidity.is_empty() {
            return Err(FetchError::NotFound("stablecoin liquidity".to_string()));
        }
        tracing::debug!("Liquidity snapshot for {} stablecoins", liquidity.len());
        Ok(liquidity)
    }
}

fn parse_circulation(data: StablecoinsResponse) -> Circulation {
    let mut circulation = Circulation::new();
    for asset in data.pegged_assets {
        let coin = match Stablecoin::parse(&asset.symbol) {
            Some(coin) => coin,
            None => continue,
        };
        // the first listing of a symbol is the canonical one
        if circulation.contains_key(&coin) {
            continue;
        }
        let by_chain = asset
            .chain_circulating
            .into_iter()
            .filter_map(|(label, c)| c.current.and_then(|a| a.pegged_usd).map(|usd| (label, usd)))
            .collect();
        circulation.insert(coin, by_chain);
    }
    circulation
}

/// Scores each coin's depth on a chain against the deepest coin there, and
/// maps depth to a fee in the 1.5%-3% range.
pub fn derive_liquidity(
    circulation: &Circulation,
    markets: &BTreeMap<Stablecoin, StablecoinMarket>,
    chains: &[String],
) -> BTreeMap<Stablecoin, StablecoinLiquiditySnapshot> {
    let mut out = BTreeMap::new();

    for coin in Stablecoin::ALL {
        let market = markets.get(&coin);
        let coin_circulation = circulation.get(&coin);
        if market.is_none() && coin_circulation.is_none() {
            continue;
        }

        let mut snapshot = StablecoinLiquiditySnapshot {
            price: market.map(|m| m.price).unwrap_or(1.0),
            volume_24h: market.map(|m| m.volume_24h).unwrap_or(0.0),
            market_cap: market.map(|m| m.market_cap).unwrap_or(0.0),
            ..Default::default()
        };

        for chain in chains {
            let label = match tables::chain_profile(chain) {
                Some(profile) => profile.defillama_label,
                None => continue,
            };
            let deepest = circulation
                .values()
                .filter_map(|c| c.get(label).copied())
                .fold(0.0_f64, f64::max);
            let own = coin_circulation.and_then(|c| c.get(label)).copied().unwrap_or(0.0);
            let score = if deepest > 0.0 { own / deepest } else { 0.0 };

            snapshot.chain_scores.insert(chain.clone(), score);
            snapshot.conversion_fees.insert(chain.clone(), MIN_FEE + (1.0 - score) * FEE_SPREAD);
        }

        out.insert(coin, snapshot);
    }

    out
}

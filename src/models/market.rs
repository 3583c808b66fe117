use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stablecoin {
    Usdc,
    Usdt,
    Dai,
}

impl Stablecoin {
    /// Candidate order. Also the tie-break order when scores are equal.
    pub const ALL: [Stablecoin; 3] = [Stablecoin::Usdc, Stablecoin::Usdt, Stablecoin::Dai];

    pub fn symbol(&self) -> &'static str {
        match self {
            Stablecoin::Usdc => "USDC",
            Stablecoin::Usdt => "USDT",
            Stablecoin::Dai => "DAI",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        match token.to_uppercase().as_str() {
            "USDC" => Some(Stablecoin::Usdc),
            "USDT" => Some(Stablecoin::Usdt),
            "DAI" => Some(Stablecoin::Dai),
            _ => None,
        }
    }

    pub fn coingecko_id(&self) -> &'static str {
        match self {
            Stablecoin::Usdc => "usd-coin",
            Stablecoin::Usdt => "tether",
            Stablecoin::Dai => "dai",
        }
    }
}

impl fmt::Display for Stablecoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserBalance {
    pub chain: String,
    pub token: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiatBalance {
    pub currency: String,
    pub amount: f64,
}

/// One day of market data for a chain's native gas token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainHistoricalSample {
    pub date: NaiveDate,
    pub token_price: f64,
    pub estimated_gas_cost_usd: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentChainPrice {
    pub token_price: f64,
    pub estimated_gas_cost_usd: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StablecoinLiquiditySnapshot {
    pub price: f64,
    pub volume_24h: f64,
    pub market_cap: f64,
    /// chain -> normalized liquidity depth in [0, 1]
    #[serde(default)]
    pub chain_scores: BTreeMap<String, f64>,
    /// chain -> conversion fee as a fraction
    #[serde(default)]
    pub conversion_fees: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiatExchangeRate {
    pub fiat_currency: String,
    /// USD per one unit of fiat
    pub usd_rate: f64,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpcomingExpense {
    pub description: String,
    pub amount: f64,
    pub due_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryUse {
    DailyExpenses,
    Savings,
    Remittances,
    Trading,
    Business,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub country: String,
    pub primary_use: PrimaryUse,
    pub monthly_transaction_volume: f64,
    #[serde(default)]
    pub monthly_transaction_frequency: Option<u32>,
    #[serde(default)]
    pub monthly_expenses: Option<f64>,
    #[serde(default)]
    pub upcoming_expenses: Vec<UpcomingExpense>,
}

/// Everything the optimizer reads from the outside world, fetched up front.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub as_of: DateTime<Utc>,
    pub historical: BTreeMap<String, Vec<ChainHistoricalSample>>,
    #[serde(default)]
    pub current_prices: BTreeMap<String, CurrentChainPrice>,
    pub liquidity: BTreeMap<Stablecoin, StablecoinLiquiditySnapshot>,
    #[serde(default)]
    pub fiat_rate: Option<FiatExchangeRate>,
}

impl MarketSnapshot {
    pub fn history(&self, chain: &str) -> Option<&[ChainHistoricalSample]> {
        self.historical
            .get(chain)
            .map(|samples| samples.as_slice())
            .filter(|samples| !samples.is_empty())
    }
}

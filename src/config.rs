use serde::Deserialize;
use std::fs;
use std::path::Path;
use crate::models::{FiatBalance, UserBalance, UserContext};
use crate::services::fiat::PLAN_CHAINS;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub user: UserContext,
    #[serde(default)]
    pub balances: Vec<UserBalance>,
    #[serde(default)]
    pub fiat_balances: Vec<FiatBalance>,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_chains")]
    pub chains: Vec<String>,
    #[serde(default = "default_required_chains")]
    pub required_chains: Vec<String>,
    #[serde(default = "default_history_days")]
    pub history_days: u32,
    /// Pause between upstream calls to stay under free-tier rate limits.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub fiat_currency: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OptimizerConfig {
    #[serde(default = "default_switch_cost")]
    pub switch_cost: f64,
    #[serde(default = "default_monthly_frequency")]
    pub default_monthly_frequency: u32,
    #[serde(default = "default_expense_horizon_days")]
    pub expense_horizon_days: i64,
    #[serde(default = "default_min_bridge_amount")]
    pub min_bridge_amount: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_chains() -> Vec<String> {
    ["ethereum", "polygon", "arbitrum", "solana"].iter().map(|s| s.to_string()).collect()
}
fn default_required_chains() -> Vec<String> {
    vec!["ethereum".to_string(), "polygon".to_string()]
}
fn default_history_days() -> u32 { 30 }
fn default_delay_ms() -> u64 { 1200 }
fn default_timeout_secs() -> u64 { 15 }
fn default_switch_cost() -> f64 { 10.0 }
fn default_monthly_frequency() -> u32 { 15 }
fn default_expense_horizon_days() -> i64 { 14 }
fn default_min_bridge_amount() -> f64 { 100.0 }
fn default_host() -> String { "127.0.0.1".to_string() }
fn default_port() -> u16 { 8080 }
fn default_cache_ttl_secs() -> u64 { 300 }
fn default_enabled() -> bool { true }
fn default_data_dir() -> String { "./data".to_string() }

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            chains: default_chains(),
            required_chains: default_required_chains(),
            history_days: default_history_days(),
            delay_ms: default_delay_ms(),
            timeout_secs: default_timeout_secs(),
            fiat_currency: None,
        }
    }
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            switch_cost: default_switch_cost(),
            default_monthly_frequency: default_monthly_frequency(),
            expense_horizon_days: default_expense_horizon_days(),
            min_bridge_amount: default_min_bridge_amount(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            data_dir: default_data_dir(),
        }
    }
}

impl FetchConfig {
    /// Chains to collect history for: required chains first, then the rest.
    pub fn all_chains(&self) -> Vec<String> {
        let mut chains = self.required_chains.clone();
        for chain in &self.chains {
            if !chains.contains(chain) {
                chains.push(chain.clone());
            }
        }
        chains
    }

    /// Chains that need liquidity scores: everything collected plus the
    /// chains a fiat plan allocates to.
    pub fn liquidity_chains(&self) -> Vec<String> {
        let mut chains = self.all_chains();
        for chain in PLAN_CHAINS {
            if !chains.iter().any(|c| c == chain) {
                chains.push(chain.to_string());
            }
        }
        chains
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PrimaryUse;

    #[test]
    fn minimal_config_fills_defaults() {
        let config = Config::parse(
            r#"
            [user]
            country = "argentina"
            primary_use = "savings"
            monthly_transaction_volume = 800.0
            "#,
        )
        .unwrap();

        assert_eq!(config.user.primary_use, PrimaryUse::Savings);
        assert!(config.balances.is_empty());
        assert_eq!(config.fetch.required_chains, vec!["ethereum", "polygon"]);
        assert_eq!(config.fetch.history_days, 30);
        assert_eq!(config.optimizer.switch_cost, 10.0);
        assert_eq!(config.optimizer.default_monthly_frequency, 15);
        assert_eq!(config.server.port, 8080);
        assert!(config.storage.enabled);
    }

    #[test]
    fn full_config_parses_balances_and_expenses() {
        let config = Config::parse(
            r#"
            [user]
            country = "brazil"
            primary_use = "daily_expenses"
            monthly_transaction_volume = 1200.0
            monthly_transaction_frequency = 30
            monthly_expenses = 900.0

            [[user.upcoming_expenses]]
            description = "Rent"
            amount = 450.0
            due_date = "2025-03-01"

            [[balances]]
            chain = "ethereum"
            token = "USDT"
            amount = 500.0

            [[balances]]
            chain = "polygon"
            token = "USDC"
            amount = 250.0

            [[fiat_balances]]
            currency = "BRL"
            amount = 3000.0

            [fetch]
            chains = ["ethereum", "polygon"]
            delay_ms = 0
            fiat_currency = "BRL"

            [optimizer]
            switch_cost = 5.0
            "#,
        )
        .unwrap();

        assert_eq!(config.user.monthly_transaction_frequency, Some(30));
        assert_eq!(config.user.upcoming_expenses.len(), 1);
        assert_eq!(config.balances.len(), 2);
        assert_eq!(config.fiat_balances[0].currency, "BRL");
        assert_eq!(config.fetch.fiat_currency.as_deref(), Some("BRL"));
        assert_eq!(config.fetch.history_days, 30);
        assert_eq!(config.optimizer.switch_cost, 5.0);
        assert_eq!(config.optimizer.min_bridge_amount, 100.0);
    }

    #[test]
    fn required_chains_are_collected_even_when_not_listed() {
        let fetch = FetchConfig {
            chains: vec!["arbitrum".to_string(), "polygon".to_string()],
            ..FetchConfig::default()
        };
        assert_eq!(fetch.all_chains(), vec!["ethereum", "polygon", "arbitrum"]);
    }

    #[test]
    fn liquidity_covers_collected_and_fiat_plan_chains() {
        let fetch = FetchConfig {
            chains: vec!["solana".to_string()],
            ..FetchConfig::default()
        };
        let chains = fetch.liquidity_chains();
        assert_eq!(chains, vec!["ethereum", "polygon", "solana", "arbitrum"]);
        for chain in fetch.all_chains() {
            assert!(chains.contains(&chain));
        }
    }

    #[test]
    fn missing_user_section_is_an_error() {
        assert!(Config::parse("[server]\nport = 9000\n").is_err());
    }
}

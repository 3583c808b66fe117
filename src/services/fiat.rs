use std::collections::BTreeMap;
use crate::models::{
    FiatAllocation, FiatBalance, FiatExchangeRate, PrimaryUse, Stablecoin, StablecoinScore,
    UserContext,
};

/// Below this USD value a conversion plan is not worth producing.
pub const MIN_USD_VALUE: f64 = 10.0;
/// Average fee of a conventional fiat on-ramp.
pub const BASELINE_FEE: f64 = 0.025;
const FALLBACK_FEE: f64 = 0.02;

const DAILY_CHAIN: &str = "polygon";
const SAVINGS_CHAIN: &str = "ethereum";
const ACTIVE_CHAIN: &str = "arbitrum";

const DAILY_MIN: f64 = 0.30;
const DAILY_MAX: f64 = 0.40;
const MIN_ACTIVE_SHARE: f64 = 0.05;
/// Share of the converted value assumed to move every month when expenses are unknown.
const DEFAULT_MONTHLY_TURNOVER: f64 = 0.3;

/// The chains a fiat plan allocates to.
pub const PLAN_CHAINS: [&str; 3] = [DAILY_CHAIN, SAVINGS_CHAIN, ACTIVE_CHAIN];

#[derive(Debug, Clone)]
pub struct FiatPlan {
    pub fiat_currency: String,
    pub fiat_amount: f64,
    pub usd_value: f64,
    pub exchange_rate: f64,
    pub allocations: Vec<FiatAllocation>,
    pub blended_fee_percent: f64,
    pub six_month_savings: f64,
}

/// Splits a fiat balance into daily, savings and active-use stablecoin positions.
///
/// `chain_picks` holds the recommended stablecoin per chain; missing chains
/// fall back to USDC at a 2% fee. Returns `None` when the converted value is
/// under [`MIN_USD_VALUE`].
pub fn analyze_fiat_distribution(
    fiat: &FiatBalance,
    rate: &FiatExchangeRate,
    user: &UserContext,
    chain_picks: &BTreeMap<String, StablecoinScore>,
) -> Option<FiatPlan> {
    let usd_value = fiat.amount * rate.usd_rate;
    if usd_value < MIN_USD_VALUE {
        tracing::debug!(
            "{} {:.2} is only ${:.2}; no conversion plan",
            fiat.currency,
            fiat.amount,
            usd_value
        );
        return None;
    }

    let daily_share = match user.monthly_expenses {
        Some(expenses) if expenses > 0.0 => (expenses / usd_value).clamp(DAILY_MIN, DAILY_MAX),
        _ => DAILY_MIN,
    };
    let savings_share = if user.primary_use == PrimaryUse::Savings { 0.50 } else { 0.40 };
    let active_share = 1.0 - daily_share - savings_share;

    let mut allocations = vec![
        allocation("daily_expenses", DAILY_CHAIN, daily_share, usd_value, chain_picks,
            "Low fees for frequent everyday payments"),
        allocation("savings", SAVINGS_CHAIN, savings_share, usd_value, chain_picks,
            "Deepest liquidity and security for long-term holdings"),
    ];
    if active_share > MIN_ACTIVE_SHARE {
        allocations.push(allocation("active_use", ACTIVE_CHAIN, active_share, usd_value, chain_picks,
            "Cheap L2 transfers for trading and DeFi"));
    }

    let blended_fee: f64 = allocations.iter().map(|a| a.percentage / 100.0 * a.conversion_fee).sum();
    let monthly_volume = user
        .monthly_expenses
        .filter(|e| *e > 0.0)
        .unwrap_or(usd_value * DEFAULT_MONTHLY_TURNOVER);
    let six_month_savings = (monthly_volume * (BASELINE_FEE - blended_fee) * 6.0).max(0.0);

    Some(FiatPlan {
        fiat_currency: fiat.currency.to_uppercase(),
        fiat_amount: fiat.amount,
        usd_value,
        exchange_rate: rate.usd_rate,
        allocations,
        blended_fee_percent: blended_fee * 100.0,
        six_month_savings,
    })
}

fn allocation(
    purpose: &str,
    chain: &str,
    share: f64,
    usd_value: f64,
    chain_picks: &BTreeMap<String, StablecoinScore>,
    reason: &str,
) -> FiatAllocation {
    let (stablecoin, conversion_fee) = chain_picks
        .get(chain)
        .map(|s| (s.symbol, s.conversion_fee))
        .unwrap_or((Stablecoin::Usdc, FALLBACK_FEE));

    FiatAllocation {
        purpose: purpose.to_string(),
        chain: chain.to_string(),
        stablecoin,
        percentage: share * 100.0,
        amount_usd: usd_value * share,
        conversion_fee,
        reason: reason.to_string(),
    }
}

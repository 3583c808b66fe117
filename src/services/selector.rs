use std::collections::BTreeMap;
use crate::models::{
    Stablecoin, StablecoinLiquiditySnapshot, StablecoinScore, StablecoinSelection,
    SwitchAnalysis, UserContext,
};
use super::tables;

const LIQUIDITY_WEIGHT: f64 = 40.0;
const FEE_WEIGHT: f64 = 30.0;
const REGIONAL_WEIGHT: f64 = 20.0;
const STABILITY_WEIGHT: f64 = 10.0;

/// Expected conversion fee range.
const MAX_FEE: f64 = 0.03;
const FEE_RANGE: f64 = 0.015;

/// Fee assumed for a holding we have no score for.
const UNKNOWN_CURRENT_FEE: f64 = 0.025;
const SWITCH_MAX_BREAK_EVEN_MONTHS: f64 = 6.0;
const SWITCH_MIN_SCORE_GAIN: f64 = 10.0;
/// Share of the balance assumed to be converted every month.
const MONTHLY_CONVERSION_SHARE: f64 = 0.5;

pub fn score_stablecoin(
    user: &UserContext,
    coin: Stablecoin,
    snapshot: &StablecoinLiquiditySnapshot,
    target_chain: &str,
) -> StablecoinScore {
    let mut reasons = Vec::new();

    let liquidity_score = snapshot.chain_scores.get(target_chain).copied().unwrap_or(0.0);
    let liquidity_term = liquidity_score * LIQUIDITY_WEIGHT;
    let tier = if liquidity_score > 0.8 {
        "Excellent"
    } else if liquidity_score > 0.5 {
        "Good"
    } else {
        "Limited"
    };
    reasons.push(format!("{} liquidity on {}", tier, target_chain));

    let conversion_fee = snapshot.conversion_fees.get(target_chain).copied().unwrap_or(MAX_FEE);
    let fee_term = ((MAX_FEE - conversion_fee) / FEE_RANGE).max(0.0) * FEE_WEIGHT;
    reasons.push(format!("Conversion fee: {:.2}%", conversion_fee * 100.0));

    let regional_fit = tables::regional_multiplier(&user.country, coin);
    let regional_term = (regional_fit - 0.7) * REGIONAL_WEIGHT;
    if regional_fit > 1.0 {
        reasons.push(format!("Popular in {}", user.country));
    }

    let stability_term = tables::stability(coin) * STABILITY_WEIGHT;

    StablecoinScore {
        symbol: coin,
        chain: target_chain.to_string(),
        total_score: liquidity_term + fee_term + regional_term + stability_term,
        liquidity_score,
        conversion_fee,
        regional_fit,
        reasons,
        price: snapshot.price,
        volume_24h: snapshot.volume_24h,
    }
}

/// Ranks the candidates for `target_chain`. Equal scores keep the
/// `Stablecoin::ALL` order.
pub fn select_optimal_stablecoin(
    user: &UserContext,
    liquidity: &BTreeMap<Stablecoin, StablecoinLiquiditySnapshot>,
    target_chain: &str,
) -> Option<StablecoinSelection> {
    let mut comparison: Vec<StablecoinScore> = Stablecoin::ALL
        .iter()
        .filter_map(|coin| {
            liquidity
                .get(coin)
                .map(|snapshot| score_stablecoin(user, *coin, snapshot, target_chain))
        })
        .collect();

    if comparison.is_empty() {
        tracing::warn!("No liquidity data to score stablecoins on {}", target_chain);
        return None;
    }

    comparison.sort_by(|a, b| b.total_score.total_cmp(&a.total_score));

    let recommended = comparison[0].clone();
    let alternatives = comparison[1..].to_vec();
    tracing::debug!(
        "Stablecoin pick for {}: {} ({:.1})",
        target_chain,
        recommended.symbol,
        recommended.total_score
    );

    Some(StablecoinSelection {
        recommended,
        alternatives,
        comparison,
    })
}

pub fn should_switch_stablecoin(
    current: Option<&StablecoinScore>,
    recommended: &StablecoinScore,
    current_balance: f64,
    switch_cost: f64,
) -> SwitchAnalysis {
    let score_difference = recommended.total_score - current.map(|c| c.total_score).unwrap_or(0.0);
    let fee_difference =
        current.map(|c| c.conversion_fee).unwrap_or(UNKNOWN_CURRENT_FEE) - recommended.conversion_fee;
    let monthly_savings = MONTHLY_CONVERSION_SHARE * current_balance * fee_difference;
    let break_even_months = if monthly_savings > 0.0 {
        switch_cost / monthly_savings
    } else {
        f64::INFINITY
    };

    let should_switch =
        break_even_months < SWITCH_MAX_BREAK_EVEN_MONTHS && score_difference > SWITCH_MIN_SCORE_GAIN;
    let six_month_savings = monthly_savings * 6.0 - switch_cost;

    let reason = if should_switch {
        format!(
            "Switching to {} saves ~${:.2}/month in conversion fees and pays back the ${:.2} switch in {:.1} months",
            recommended.symbol, monthly_savings, switch_cost, break_even_months
        )
    } else if monthly_savings <= 0.0 {
        format!("{} offers no fee advantage over your current holding", recommended.symbol)
    } else if break_even_months >= SWITCH_MAX_BREAK_EVEN_MONTHS {
        format!(
            "Savings of ${:.2}/month take {:.1} months to recover the switch cost",
            monthly_savings, break_even_months
        )
    } else {
        format!(
            "{} scores only {:.1} points higher; not worth switching",
            recommended.symbol, score_difference
        )
    };

    SwitchAnalysis {
        should_switch,
        reason,
        score_difference,
        fee_difference,
        monthly_savings,
        break_even_months,
        six_month_savings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PrimaryUse;

    fn user(country: &str) -> UserContext {
        UserContext {
            country: country.to_string(),
            primary_use: PrimaryUse::DailyExpenses,
            monthly_transaction_volume: 1000.0,
            monthly_transaction_frequency: None,
            monthly_expenses: None,
            upcoming_expenses: vec![],
        }
    }

    fn snapshot(chain: &str, liquidity: f64, fee: f64) -> StablecoinLiquiditySnapshot {
        StablecoinLiquiditySnapshot {
            price: 1.0,
            volume_24h: 1_000_000.0,
            market_cap: 10_000_000.0,
            chain_scores: [(chain.to_string(), liquidity)].into_iter().collect(),
            conversion_fees: [(chain.to_string(), fee)].into_iter().collect(),
        }
    }

    fn score(symbol: Stablecoin, total: f64, fee: f64) -> StablecoinScore {
        StablecoinScore {
            symbol,
            chain: "ethereum".to_string(),
            total_score: total,
            liquidity_score: 1.0,
            conversion_fee: fee,
            regional_fit: 1.0,
            reasons: vec![],
            price: 1.0,
            volume_24h: 0.0,
        }
    }

    #[test]
    fn score_combines_all_four_terms() {
        // liquidity 1.0*40 + fee (0.03-0.015)/0.015*30 + (1.2-0.7)*20 + 0.95*10
        let s = score_stablecoin(&user("argentina"), Stablecoin::Usdt, &snapshot("ethereum", 1.0, 0.015), "ethereum");
        assert!((s.total_score - (40.0 + 30.0 + 10.0 + 9.5)).abs() < 1e-9);
        assert_eq!(s.regional_fit, 1.2);
        assert!(s.reasons.iter().any(|r| r.starts_with("Excellent liquidity")));
        assert!(s.reasons.iter().any(|r| r == "Conversion fee: 1.50%"));
        assert!(s.reasons.iter().any(|r| r == "Popular in argentina"));
    }

    #[test]
    fn missing_fee_defaults_to_max_and_earns_nothing() {
        let snap = StablecoinLiquiditySnapshot {
            chain_scores: [("polygon".to_string(), 0.6)].into_iter().collect(),
            ..Default::default()
        };
        let s = score_stablecoin(&user("nowhere"), Stablecoin::Usdc, &snap, "polygon");
        assert_eq!(s.conversion_fee, 0.03);
        // 0.6*40 + 0 + 0.3*20 + 10
        assert!((s.total_score - 40.0).abs() < 1e-9);
        assert!(s.reasons.iter().any(|r| r.starts_with("Good liquidity")));
    }

    #[test]
    fn fee_above_range_is_clamped_to_zero() {
        let s = score_stablecoin(&user("nowhere"), Stablecoin::Dai, &snapshot("ethereum", 0.0, 0.05), "ethereum");
        // 0 + 0 + 0.3*20 + 0.9*10
        assert!((s.total_score - 15.0).abs() < 1e-9);
    }

    #[test]
    fn selection_ranks_descending() {
        let mut liquidity = BTreeMap::new();
        liquidity.insert(Stablecoin::Usdc, snapshot("ethereum", 0.5, 0.02));
        liquidity.insert(Stablecoin::Usdt, snapshot("ethereum", 1.0, 0.015));
        liquidity.insert(Stablecoin::Dai, snapshot("ethereum", 0.1, 0.03));

        let sel = select_optimal_stablecoin(&user("argentina"), &liquidity, "ethereum").unwrap();
        assert_eq!(sel.recommended.symbol, Stablecoin::Usdt);
        assert_eq!(sel.alternatives.len(), 2);
        assert_eq!(sel.comparison.len(), 3);
        assert!(sel.comparison.windows(2).all(|w| w[0].total_score >= w[1].total_score));
        assert_eq!(sel.score_for(Stablecoin::Dai).map(|s| s.symbol), Some(Stablecoin::Dai));
    }

    #[test]
    fn regional_preference_can_outweigh_stability() {
        // united states: USDT 0.9 -> 0.2*20 + 9.5 = 13.5 on top of equal terms, DAI 1.0 -> 0.3*20 + 9 = 15
        let mut liquidity = BTreeMap::new();
        liquidity.insert(Stablecoin::Dai, snapshot("base", 0.5, 0.02));
        liquidity.insert(Stablecoin::Usdt, snapshot("base", 0.5, 0.02));
        let sel = select_optimal_stablecoin(&user("united states"), &liquidity, "base").unwrap();
        assert_eq!(sel.recommended.symbol, Stablecoin::Dai);
        assert_eq!(sel.alternatives[0].symbol, Stablecoin::Usdt);
    }

    #[test]
    fn empty_liquidity_yields_no_selection() {
        assert!(select_optimal_stablecoin(&user("brazil"), &BTreeMap::new(), "ethereum").is_none());
    }

    #[test]
    fn switch_scenario_breaks_even_in_four_months() {
        let current = score(Stablecoin::Usdt, 60.0, 0.025);
        let recommended = score(Stablecoin::Usdc, 80.0, 0.015);
        let a = should_switch_stablecoin(Some(&current), &recommended, 500.0, 10.0);

        assert!((a.monthly_savings - 2.5).abs() < 1e-9);
        assert!((a.break_even_months - 4.0).abs() < 1e-9);
        assert!((a.six_month_savings - 5.0).abs() < 1e-9);
        assert!((a.score_difference - 20.0).abs() < 1e-9);
        assert!(a.should_switch);
        assert!(a.reason.contains("USDC"));
    }

    #[test]
    fn equal_scores_never_switch() {
        let current = score(Stablecoin::Usdt, 70.0, 0.03);
        let recommended = score(Stablecoin::Usdc, 70.0, 0.015);
        let a = should_switch_stablecoin(Some(&current), &recommended, 100_000.0, 10.0);
        assert_eq!(a.score_difference, 0.0);
        assert!(!a.should_switch);
    }

    #[test]
    fn no_fee_advantage_never_switches() {
        let current = score(Stablecoin::Usdt, 10.0, 0.015);
        let recommended = score(Stablecoin::Usdc, 90.0, 0.02);
        let a = should_switch_stablecoin(Some(&current), &recommended, 10_000.0, 10.0);
        assert!(a.monthly_savings <= 0.0);
        assert!(a.break_even_months.is_infinite());
        assert!(!a.should_switch);
    }

    #[test]
    fn unknown_current_uses_default_fee_and_zero_score() {
        let recommended = score(Stablecoin::Usdc, 50.0, 0.015);
        let a = should_switch_stablecoin(None, &recommended, 1000.0, 10.0);
        assert!((a.fee_difference - 0.01).abs() < 1e-12);
        assert!((a.monthly_savings - 5.0).abs() < 1e-9);
        assert!(a.should_switch);
    }
}

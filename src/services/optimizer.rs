use std::collections::{BTreeMap, BTreeSet};
use crate::config::OptimizerConfig;
use crate::models::{
    AnalysisItem, ChainHistoricalSample, ChainTimingInsight, ConversionTiming, FiatBalance,
    MarketSnapshot, MostEfficientChain, OptimizationResult, Priority, Recommendation, Stablecoin,
    StablecoinScore, StablecoinSelection, TimingAnalysis, UserBalance, UserContext,
};
use super::fiat::{self, BASELINE_FEE, PLAN_CHAINS};
use super::{selector, stats, tables, timing};

/// Fee assumed when the held token has no fee quote on its chain.
const FALLBACK_CONVERSION_FEE: f64 = 0.02;

const BRIDGE_MAX_BREAK_EVEN_MONTHS: f64 = 4.0;
const BRIDGE_HIGH_PRIORITY_MONTHS: f64 = 2.0;
const BRIDGE_MIN_MONTHLY_SAVINGS: f64 = 2.0;
const SWITCH_HIGH_PRIORITY_SAVINGS: f64 = 50.0;

const URGENT_DAYS: i64 = 2;
const MIN_WAIT_DAYS: i64 = 3;

/// Outcome of weighing a one-off bridge cost against monthly savings.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgePlan {
    pub bridge_cost: f64,
    pub monthly_savings: f64,
    pub break_even_months: f64,
    pub six_month_savings: f64,
    pub priority: Priority,
}

/// Returns a plan only when the bridge pays for itself in under four months
/// and saves more than $2 a month.
pub fn evaluate_bridge(from_chain: &str, to_chain: &str, monthly_savings: f64) -> Option<BridgePlan> {
    let bridge_cost = tables::bridge_cost(from_chain, to_chain);
    let break_even_months = if monthly_savings > 0.0 {
        bridge_cost / monthly_savings
    } else {
        f64::INFINITY
    };

    if break_even_months < BRIDGE_MAX_BREAK_EVEN_MONTHS && monthly_savings > BRIDGE_MIN_MONTHLY_SAVINGS {
        Some(BridgePlan {
            bridge_cost,
            monthly_savings,
            break_even_months,
            six_month_savings: monthly_savings * 6.0 - bridge_cost,
            priority: if break_even_months < BRIDGE_HIGH_PRIORITY_MONTHS {
                Priority::High
            } else {
                Priority::Medium
            },
        })
    } else {
        None
    }
}

pub struct Optimizer {
    config: OptimizerConfig,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    /// Builds the full report. Pure: the same inputs always give the same result.
    pub fn analyze_and_optimize(
        &self,
        balances: &[UserBalance],
        snapshot: &MarketSnapshot,
        user: &UserContext,
        fiat_balances: Option<&[FiatBalance]>,
    ) -> OptimizationResult {
        let mut selections: BTreeMap<String, StablecoinSelection> = BTreeMap::new();
        let mut timings: BTreeMap<String, TimingAnalysis> = BTreeMap::new();
        let mut analysis = Vec::new();

        for balance in balances {
            let history = match snapshot.history(&balance.chain) {
                Some(history) => history,
                None => {
                    tracing::warn!(
                        "No historical data for {}; skipping {} {}",
                        balance.chain,
                        balance.amount,
                        balance.token
                    );
                    continue;
                }
            };

            let item = self.analyze_position(balance, history, snapshot, user, &mut selections);
            timings
                .entry(balance.chain.clone())
                .or_insert_with(|| item.timing.clone());
            analysis.push(item);
        }

        let most_efficient_chain = most_efficient(&analysis);

        let mut recommendations = self.switch_recommendations(&analysis);
        recommendations.extend(self.conversion_recommendations(&analysis, snapshot, user));
        if let Some(best) = &most_efficient_chain {
            recommendations.extend(self.bridge_recommendations(&analysis, best));
        }
        if let (Some(fiats), Some(_)) = (fiat_balances, &snapshot.fiat_rate) {
            recommendations.extend(self.fiat_recommendations(fiats, snapshot, user, &selections));
        }
        recommendations.push(Recommendation::TimingInsight {
            insights: timing_insights(&analysis),
        });

        let total_potential_savings: f64 = recommendations.iter().map(|r| r.counted_savings()).sum();

        tracing::info!(
            "Optimization complete: {} positions, {} recommendations, ${:.2} potential savings",
            analysis.len(),
            recommendations.len(),
            total_potential_savings
        );

        OptimizationResult {
            generated_at: snapshot.as_of,
            analysis,
            recommendations,
            timing_recommendations: timings,
            stablecoin_recommendations: selections,
            most_efficient_chain,
            total_potential_savings,
        }
    }

    fn analyze_position(
        &self,
        balance: &UserBalance,
        history: &[ChainHistoricalSample],
        snapshot: &MarketSnapshot,
        user: &UserContext,
        selections: &mut BTreeMap<String, StablecoinSelection>,
    ) -> AnalysisItem {
        let chain = balance.chain.as_str();
        let costs: Vec<f64> = history.iter().map(|s| s.estimated_gas_cost_usd).collect();

        let avg_gas_cost = stats::mean(&costs);
        let frequency = user
            .monthly_transaction_frequency
            .unwrap_or(self.config.default_monthly_frequency);
        let avg_monthly_cost = avg_gas_cost * frequency as f64;
        let current_gas_cost = snapshot
            .current_prices
            .get(chain)
            .map(|p| p.estimated_gas_cost_usd)
            .unwrap_or(avg_gas_cost);
        let volatility = stats::coefficient_of_variation(&costs);

        let timing = timing::analyze_optimal_timing(chain, history, current_gas_cost);

        if !selections.contains_key(chain) {
            if let Some(selection) = selector::select_optimal_stablecoin(user, &snapshot.liquidity, chain) {
                selections.insert(chain.to_string(), selection);
            }
        }
        let selection = selections.get(chain);
        let held = Stablecoin::parse(&balance.token);
        let recommended_stablecoin = selection.map(|s| s.recommended.clone());
        let current_stablecoin = held.and_then(|coin| selection.and_then(|s| s.score_for(coin).cloned()));

        let fee = held
            .and_then(|coin| snapshot.liquidity.get(&coin))
            .and_then(|l| l.conversion_fees.get(chain).copied())
            .unwrap_or(FALLBACK_CONVERSION_FEE);
        let monthly_conversion_cost = user.monthly_expenses.unwrap_or(0.0) / 12.0 * fee;

        let predicted_monthly_cost = avg_monthly_cost + monthly_conversion_cost;
        let cost_percentage = if balance.amount > 0.0 {
            predicted_monthly_cost / balance.amount * 100.0
        } else {
            0.0
        };
        let efficiency = if predicted_monthly_cost > 0.0 {
            1.0 / predicted_monthly_cost
        } else {
            f64::INFINITY
        };

        tracing::debug!(
            "{} {} on {}: ${:.2}/month predicted, efficiency {:.4}",
            balance.amount,
            balance.token,
            chain,
            predicted_monthly_cost,
            efficiency
        );

        AnalysisItem {
            balance: balance.clone(),
            avg_gas_cost,
            current_gas_cost,
            volatility,
            avg_monthly_cost,
            monthly_conversion_cost,
            predicted_monthly_cost,
            cost_percentage,
            efficiency,
            timing,
            current_stablecoin,
            recommended_stablecoin,
        }
    }

    fn switch_recommendations(&self, analysis: &[AnalysisItem]) -> Vec<Recommendation> {
        let mut recs = Vec::new();

        for item in analysis {
            let recommended = match &item.recommended_stablecoin {
                Some(r) => r,
                None => continue,
            };
            if Stablecoin::parse(&item.balance.token) == Some(recommended.symbol) {
                continue;
            }

            let switch = selector::should_switch_stablecoin(
                item.current_stablecoin.as_ref(),
                recommended,
                item.balance.amount,
                self.config.switch_cost,
            );
            if !switch.should_switch {
                tracing::debug!("Keeping {} on {}: {}", item.balance.token, item.balance.chain, switch.reason);
                continue;
            }

            recs.push(Recommendation::SwitchStablecoin {
                chain: item.balance.chain.clone(),
                from_token: item.balance.token.clone(),
                to_token: recommended.symbol,
                amount: item.balance.amount,
                priority: if switch.six_month_savings > SWITCH_HIGH_PRIORITY_SAVINGS {
                    Priority::High
                } else {
                    Priority::Medium
                },
                reason: switch.reason,
                reasons: recommended.reasons.clone(),
                score_difference: switch.score_difference,
                monthly_savings: switch.monthly_savings,
                break_even_months: switch.break_even_months,
                six_month_savings: switch.six_month_savings,
            });
        }

        recs
    }

    fn conversion_recommendations(
        &self,
        analysis: &[AnalysisItem],
        snapshot: &MarketSnapshot,
        user: &UserContext,
    ) -> Vec<Recommendation> {
        let today = snapshot.as_of.date_naive();
        let mut recs = Vec::new();

        for expense in &user.upcoming_expenses {
            let days = (expense.due_date - today).num_days();
            if days < 0 || days > self.config.expense_horizon_days {
                continue;
            }

            // cheapest chain that can cover the expense; first wins ties
            let source = analysis
                .iter()
                .filter(|i| i.balance.amount >= expense.amount)
                .fold(None::<&AnalysisItem>, |best, item| match best {
                    Some(b) if b.current_gas_cost <= item.current_gas_cost => Some(b),
                    _ => Some(item),
                });
            let item = match source {
                Some(item) => item,
                None => {
                    tracing::warn!(
                        "No balance covers '{}' (${:.2}) due {}",
                        expense.description,
                        expense.amount,
                        expense.due_date
                    );
                    continue;
                }
            };

            let good_now = item.timing.current_status.is_good_time_now;
            let timing = if days < URGENT_DAYS {
                ConversionTiming::Urgent
            } else if !good_now && days > MIN_WAIT_DAYS {
                ConversionTiming::Wait
            } else {
                ConversionTiming::Now
            };
            let best_day = item.timing.best_day_of_week.as_ref().map(|d| d.day_name.clone());
            let potential_savings = match timing {
                ConversionTiming::Wait => Some(item.timing.potential_savings.amount),
                _ => None,
            };

            let reason = match timing {
                ConversionTiming::Urgent => format!("Due in {} day(s); convert now regardless of fees", days),
                ConversionTiming::Wait => format!(
                    "Fees on {} are above average; waiting for {} saves ~${:.2}",
                    item.balance.chain,
                    best_day.as_deref().unwrap_or("a cheaper day"),
                    item.timing.potential_savings.amount
                ),
                ConversionTiming::Now => format!("Fees on {} are favorable right now", item.balance.chain),
            };

            recs.push(Recommendation::ConvertWithTiming {
                expense: expense.description.clone(),
                amount: expense.amount,
                due_date: expense.due_date,
                days_until_due: days,
                chain: item.balance.chain.clone(),
                token: item.balance.token.clone(),
                estimated_cost: item.current_gas_cost,
                timing,
                best_day,
                potential_savings,
                priority: match timing {
                    ConversionTiming::Urgent => Priority::High,
                    ConversionTiming::Now if days > MIN_WAIT_DAYS => Priority::Low,
                    _ => Priority::Medium,
                },
                reason,
            });
        }

        recs
    }

    fn bridge_recommendations(
        &self,
        analysis: &[AnalysisItem],
        best: &MostEfficientChain,
    ) -> Vec<Recommendation> {
        let mut recs = Vec::new();

        for item in analysis {
            if item.balance.chain == best.chain || item.balance.amount < self.config.min_bridge_amount {
                continue;
            }

            let monthly_savings = item.predicted_monthly_cost - best.predicted_monthly_cost;
            let plan = match evaluate_bridge(&item.balance.chain, &best.chain, monthly_savings) {
                Some(plan) => plan,
                None => continue,
            };

            recs.push(Recommendation::Bridge {
                from_chain: item.balance.chain.clone(),
                to_chain: best.chain.clone(),
                token: item.balance.token.clone(),
                amount: item.balance.amount,
                bridge_cost: plan.bridge_cost,
                monthly_savings: plan.monthly_savings,
                break_even_months: plan.break_even_months,
                six_month_savings: plan.six_month_savings,
                priority: plan.priority,
                reason: format!(
                    "Moving to {} saves ${:.2}/month; the ${:.2} bridge pays back in {:.1} months",
                    best.chain, plan.monthly_savings, plan.bridge_cost, plan.break_even_months
                ),
            });
        }

        recs
    }

    fn fiat_recommendations(
        &self,
        fiats: &[FiatBalance],
        snapshot: &MarketSnapshot,
        user: &UserContext,
        selections: &BTreeMap<String, StablecoinSelection>,
    ) -> Vec<Recommendation> {
        let rate = match &snapshot.fiat_rate {
            Some(rate) => rate,
            None => return vec![],
        };

        let picks: BTreeMap<String, StablecoinScore> = PLAN_CHAINS
            .iter()
            .filter_map(|chain| {
                let pick = match selections.get(*chain) {
                    Some(sel) => Some(sel.recommended.clone()),
                    None => selector::select_optimal_stablecoin(user, &snapshot.liquidity, chain)
                        .map(|sel| sel.recommended),
                };
                pick.map(|p| (chain.to_string(), p))
            })
            .collect();

        let mut recs = Vec::new();
        for fiat in fiats {
            if !fiat.currency.eq_ignore_ascii_case(&rate.fiat_currency) {
                tracing::warn!("No {} exchange rate (have {}); skipping", fiat.currency, rate.fiat_currency);
                continue;
            }
            let plan = match fiat::analyze_fiat_distribution(fiat, rate, user, &picks) {
                Some(plan) => plan,
                None => continue,
            };

            recs.push(Recommendation::FiatToStablecoin {
                reason: format!(
                    "Convert {:.2} {} (${:.2}) across {} positions at a {:.2}% blended fee",
                    plan.fiat_amount,
                    plan.fiat_currency,
                    plan.usd_value,
                    plan.allocations.len(),
                    plan.blended_fee_percent
                ),
                fiat_currency: plan.fiat_currency,
                fiat_amount: plan.fiat_amount,
                usd_value: plan.usd_value,
                exchange_rate: plan.exchange_rate,
                allocations: plan.allocations,
                blended_fee_percent: plan.blended_fee_percent,
                baseline_fee_percent: BASELINE_FEE * 100.0,
                six_month_savings: plan.six_month_savings,
                priority: Priority::High,
            });
        }

        recs
    }
}

fn most_efficient(analysis: &[AnalysisItem]) -> Option<MostEfficientChain> {
    let mut best: Option<&AnalysisItem> = None;
    for item in analysis {
        if best.map_or(true, |b| item.efficiency > b.efficiency) {
            best = Some(item);
        }
    }
    best.map(|item| MostEfficientChain {
        chain: item.balance.chain.clone(),
        token: item.balance.token.clone(),
        efficiency: item.efficiency,
        predicted_monthly_cost: item.predicted_monthly_cost,
    })
}

fn timing_insights(analysis: &[AnalysisItem]) -> Vec<ChainTimingInsight> {
    let mut seen = BTreeSet::new();
    analysis
        .iter()
        .filter(|item| seen.insert(item.balance.chain.clone()))
        .map(|item| {
            let t = &item.timing;
            ChainTimingInsight {
                chain: t.chain.clone(),
                best_day: t.best_day_of_week.as_ref().map(|d| d.day_name.clone()),
                worst_day: t.worst_day_of_week.as_ref().map(|d| d.day_name.clone()),
                time_of_day: t.time_of_day_recommendations.clone(),
                weekend_vs_weekday: t.weekend_vs_weekday.recommendation.clone(),
                volatility_warning: t.volatility_warning,
                is_good_time_now: t.current_status.is_good_time_now,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use crate::models::market::UpcomingExpense;
    use crate::models::{CurrentChainPrice, FiatExchangeRate, PrimaryUse, StablecoinLiquiditySnapshot};

    fn history(costs: &[f64]) -> Vec<ChainHistoricalSample> {
        costs
            .iter()
            .enumerate()
            .map(|(i, cost)| ChainHistoricalSample {
                date: NaiveDate::from_ymd_opt(2024, 1, 7).unwrap() + chrono::Duration::days(i as i64),
                token_price: 1.0,
                estimated_gas_cost_usd: *cost,
                volume: 1.0,
            })
            .collect()
    }

    fn liquidity(chains: &[&str]) -> BTreeMap<Stablecoin, StablecoinLiquiditySnapshot> {
        let entry = |score: f64, fee: f64| StablecoinLiquiditySnapshot {
            price: 1.0,
            volume_24h: 1e9,
            market_cap: 1e10,
            chain_scores: chains.iter().map(|c| (c.to_string(), score)).collect(),
            conversion_fees: chains.iter().map(|c| (c.to_string(), fee)).collect(),
        };
        let mut m = BTreeMap::new();
        m.insert(Stablecoin::Usdc, entry(1.0, 0.015));
        m.insert(Stablecoin::Usdt, entry(0.6, 0.025));
        m.insert(Stablecoin::Dai, entry(0.2, 0.03));
        m
    }

    fn snapshot() -> MarketSnapshot {
        let mut historical = BTreeMap::new();
        historical.insert("ethereum".to_string(), history(&[4.0; 14]));
        historical.insert("polygon".to_string(), history(&[0.01; 14]));
        historical.insert("arbitrum".to_string(), history(&[0.05; 14]));

        let mut current_prices = BTreeMap::new();
        current_prices.insert(
            "ethereum".to_string(),
            CurrentChainPrice { token_price: 3000.0, estimated_gas_cost_usd: 6.0 },
        );

        MarketSnapshot {
            as_of: Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap(),
            historical,
            current_prices,
            liquidity: liquidity(&["ethereum", "polygon", "arbitrum"]),
            fiat_rate: None,
        }
    }

    fn user() -> UserContext {
        UserContext {
            country: "mexico".to_string(),
            primary_use: PrimaryUse::DailyExpenses,
            monthly_transaction_volume: 1000.0,
            monthly_transaction_frequency: None,
            monthly_expenses: Some(1200.0),
            upcoming_expenses: vec![],
        }
    }

    fn balance(chain: &str, token: &str, amount: f64) -> UserBalance {
        UserBalance { chain: chain.to_string(), token: token.to_string(), amount }
    }

    fn optimizer() -> Optimizer {
        Optimizer::new(OptimizerConfig::default())
    }

    #[test]
    fn chains_without_history_are_skipped() {
        let balances = [balance("ethereum", "USDC", 500.0), balance("fantom", "USDC", 500.0)];
        let result = optimizer().analyze_and_optimize(&balances, &snapshot(), &user(), None);
        assert_eq!(result.analysis.len(), 1);
        assert_eq!(result.analysis[0].balance.chain, "ethereum");
    }

    #[test]
    fn position_costs_follow_history_and_frequency() {
        let result = optimizer().analyze_and_optimize(&[balance("ethereum", "USDC", 1000.0)], &snapshot(), &user(), None);
        let item = &result.analysis[0];

        assert_eq!(item.avg_gas_cost, 4.0);
        assert_eq!(item.current_gas_cost, 6.0);
        assert_eq!(item.avg_monthly_cost, 60.0);
        // 1200/12 * 1.5%
        assert!((item.monthly_conversion_cost - 1.5).abs() < 1e-9);
        assert!((item.predicted_monthly_cost - 61.5).abs() < 1e-9);
        assert!((item.cost_percentage - 6.15).abs() < 1e-9);
        assert!((item.efficiency - 1.0 / 61.5).abs() < 1e-12);
        assert_eq!(item.volatility, 0.0);
        assert!(!item.timing.current_status.is_good_time_now);
    }

    #[test]
    fn current_cost_falls_back_to_mean() {
        let result = optimizer().analyze_and_optimize(&[balance("polygon", "USDC", 100.0)], &snapshot(), &user(), None);
        let item = &result.analysis[0];
        assert_eq!(item.current_gas_cost, item.avg_gas_cost);
        assert!((item.current_gas_cost - 0.01).abs() < 1e-12);
    }

    #[test]
    fn most_efficient_is_cheapest_chain() {
        let balances = [
            balance("ethereum", "USDC", 1000.0),
            balance("polygon", "USDC", 50.0),
            balance("arbitrum", "USDC", 50.0),
        ];
        let result = optimizer().analyze_and_optimize(&balances, &snapshot(), &user(), None);
        assert_eq!(result.most_efficient_chain.unwrap().chain, "polygon");
    }

    #[test]
    fn usdt_holder_is_told_to_switch() {
        let result = optimizer().analyze_and_optimize(&[balance("ethereum", "USDT", 5000.0)], &snapshot(), &user(), None);
        let switches = result.recommendations_of("switch_stablecoin");
        assert_eq!(switches.len(), 1);
        match switches[0] {
            Recommendation::SwitchStablecoin { to_token, monthly_savings, six_month_savings, priority, .. } => {
                assert_eq!(*to_token, Stablecoin::Usdc);
                // 0.5 * 5000 * (0.025 - 0.015)
                assert!((monthly_savings - 25.0).abs() < 1e-9);
                assert!((six_month_savings - 140.0).abs() < 1e-9);
                assert_eq!(*priority, Priority::High);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn bridge_recommended_from_expensive_chain() {
        let balances = [balance("ethereum", "USDC", 1000.0), balance("polygon", "USDC", 200.0)];
        let result = optimizer().analyze_and_optimize(&balances, &snapshot(), &user(), None);
        let bridges = result.recommendations_of("bridge");
        assert_eq!(bridges.len(), 1);
        match bridges[0] {
            Recommendation::Bridge { from_chain, to_chain, bridge_cost, priority, .. } => {
                assert_eq!(from_chain, "ethereum");
                assert_eq!(to_chain, "polygon");
                assert_eq!(*bridge_cost, 15.0);
                assert_eq!(*priority, Priority::High);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn small_balances_are_not_bridged() {
        let balances = [balance("ethereum", "USDC", 99.0), balance("polygon", "USDC", 200.0)];
        let result = optimizer().analyze_and_optimize(&balances, &snapshot(), &user(), None);
        assert!(result.recommendations_of("bridge").is_empty());
    }

    #[test]
    fn bridge_requires_savings_strictly_above_two() {
        assert!(evaluate_bridge("arbitrum", "polygon", 2.0).is_none());
        let plan = evaluate_bridge("arbitrum", "polygon", 2.5).unwrap();
        assert_eq!(plan.bridge_cost, 3.0);
        assert!((plan.break_even_months - 1.2).abs() < 1e-9);
        assert_eq!(plan.priority, Priority::High);
    }

    #[test]
    fn bridge_rejected_when_break_even_too_long() {
        // 10 / 2.5 = 4 months, not strictly below 4
        assert!(evaluate_bridge("bsc", "solana", 2.5).is_none());
        assert!(evaluate_bridge("bsc", "solana", -5.0).is_none());
        let plan = evaluate_bridge("bsc", "solana", 4.0).unwrap();
        assert_eq!(plan.priority, Priority::Medium);
        assert!((plan.six_month_savings - 14.0).abs() < 1e-9);
    }

    #[test]
    fn upcoming_expense_timing() {
        let mut u = user();
        u.upcoming_expenses = vec![
            UpcomingExpense { description: "Rent".into(), amount: 400.0, due_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap() },
            UpcomingExpense { description: "Tuition".into(), amount: 800.0, due_date: NaiveDate::from_ymd_opt(2024, 3, 10).unwrap() },
            UpcomingExpense { description: "Later".into(), amount: 100.0, due_date: NaiveDate::from_ymd_opt(2024, 4, 30).unwrap() },
            UpcomingExpense { description: "Past".into(), amount: 100.0, due_date: NaiveDate::from_ymd_opt(2024, 2, 20).unwrap() },
            UpcomingExpense { description: "Too big".into(), amount: 50_000.0, due_date: NaiveDate::from_ymd_opt(2024, 3, 5).unwrap() },
        ];
        let balances = [balance("ethereum", "USDC", 1000.0), balance("polygon", "USDC", 500.0)];
        let result = optimizer().analyze_and_optimize(&balances, &snapshot(), &u, None);
        let converts = result.recommendations_of("convert_with_timing");
        assert_eq!(converts.len(), 2);

        match converts[0] {
            Recommendation::ConvertWithTiming { chain, timing, days_until_due, potential_savings, .. } => {
                assert_eq!(chain, "polygon");
                assert_eq!(*days_until_due, 1);
                assert_eq!(*timing, ConversionTiming::Urgent);
                assert!(potential_savings.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        match converts[1] {
            // only ethereum covers 800, and its current cost is 50% above average
            Recommendation::ConvertWithTiming { chain, timing, potential_savings, .. } => {
                assert_eq!(chain, "ethereum");
                assert_eq!(*timing, ConversionTiming::Wait);
                assert_eq!(*potential_savings, Some(2.0));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn favorable_conversion_with_time_to_spare_is_low_priority() {
        let mut u = user();
        let due = |day| NaiveDate::from_ymd_opt(2024, 3, day).unwrap();
        u.upcoming_expenses = vec![
            UpcomingExpense { description: "Groceries".into(), amount: 100.0, due_date: due(10) },
            UpcomingExpense { description: "Phone".into(), amount: 100.0, due_date: due(3) },
        ];
        // polygon's current cost equals its mean, so now is a good time
        let result = optimizer().analyze_and_optimize(&[balance("polygon", "USDC", 500.0)], &snapshot(), &u, None);
        let converts = result.recommendations_of("convert_with_timing");
        assert_eq!(converts.len(), 2);

        match converts[0] {
            Recommendation::ConvertWithTiming { timing, priority, .. } => {
                assert_eq!(*timing, ConversionTiming::Now);
                assert_eq!(*priority, Priority::Low);
            }
            other => panic!("unexpected {:?}", other),
        }
        match converts[1] {
            Recommendation::ConvertWithTiming { timing, priority, days_until_due, .. } => {
                assert_eq!(*days_until_due, 2);
                assert_eq!(*timing, ConversionTiming::Now);
                assert_eq!(*priority, Priority::Medium);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn categories_come_in_fixed_order_and_timing_insight_is_last() {
        let mut snap = snapshot();
        snap.fiat_rate = Some(FiatExchangeRate { fiat_currency: "MXN".into(), usd_rate: 0.05, timestamp: 0 });
        let mut u = user();
        u.upcoming_expenses = vec![UpcomingExpense {
            description: "Rent".into(),
            amount: 400.0,
            due_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
        }];
        let balances = [balance("ethereum", "USDT", 5000.0), balance("polygon", "USDC", 500.0)];
        let fiats = [FiatBalance { currency: "MXN".into(), amount: 20_000.0 }];

        let result = optimizer().analyze_and_optimize(&balances, &snap, &u, Some(&fiats));
        let kinds: Vec<&str> = result.recommendations.iter().map(|r| r.kind()).collect();
        assert_eq!(
            kinds,
            vec!["switch_stablecoin", "convert_with_timing", "bridge", "fiat_to_stablecoin", "timing_insight"]
        );

        match result.recommendations.last().unwrap() {
            Recommendation::TimingInsight { insights } => {
                let chains: Vec<&str> = insights.iter().map(|i| i.chain.as_str()).collect();
                assert_eq!(chains, vec!["ethereum", "polygon"]);
            }
            other => panic!("unexpected {:?}", other),
        }

        let expected: f64 = result.recommendations.iter().map(|r| r.counted_savings()).sum();
        assert!((result.total_potential_savings - expected).abs() < 1e-9);
        assert!(result.total_potential_savings > 0.0);
    }

    #[test]
    fn fiat_needs_matching_rate() {
        let mut snap = snapshot();
        snap.fiat_rate = Some(FiatExchangeRate { fiat_currency: "BRL".into(), usd_rate: 0.2, timestamp: 0 });
        let fiats = [FiatBalance { currency: "MXN".into(), amount: 20_000.0 }];
        let result = optimizer().analyze_and_optimize(&[], &snap, &user(), Some(&fiats));
        assert!(result.recommendations_of("fiat_to_stablecoin").is_empty());
    }

    #[test]
    fn empty_input_still_has_timing_insight() {
        let result = optimizer().analyze_and_optimize(&[], &snapshot(), &user(), None);
        assert!(result.analysis.is_empty());
        assert!(result.most_efficient_chain.is_none());
        assert_eq!(result.recommendations.len(), 1);
        assert_eq!(result.recommendations[0].kind(), "timing_insight");
        assert_eq!(result.total_potential_savings, 0.0);
    }

    #[test]
    fn identical_inputs_give_identical_reports() {
        let balances = [
            balance("ethereum", "USDT", 5000.0),
            balance("polygon", "DAI", 500.0),
            balance("arbitrum", "USDC", 300.0),
        ];
        let a = optimizer().analyze_and_optimize(&balances, &snapshot(), &user(), None);
        let b = optimizer().analyze_and_optimize(&balances, &snapshot(), &user(), None);
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());
    }
}

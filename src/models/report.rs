use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use super::{Stablecoin, UserBalance};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StablecoinScore {
    pub symbol: Stablecoin,
    pub chain: String,
    pub total_score: f64,
    pub liquidity_score: f64,
    pub conversion_fee: f64,
    pub regional_fit: f64,
    pub reasons: Vec<String>,
    pub price: f64,
    pub volume_24h: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StablecoinSelection {
    pub recommended: StablecoinScore,
    pub alternatives: Vec<StablecoinScore>,
    pub comparison: Vec<StablecoinScore>,
}

impl StablecoinSelection {
    pub fn score_for(&self, symbol: Stablecoin) -> Option<&StablecoinScore> {
        self.comparison.iter().find(|s| s.symbol == symbol)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchAnalysis {
    pub should_switch: bool,
    pub reason: String,
    pub score_difference: f64,
    pub fee_difference: f64,
    pub monthly_savings: f64,
    pub break_even_months: f64,
    pub six_month_savings: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayStat {
    /// 0 = Sunday .. 6 = Saturday
    pub day: u32,
    pub day_name: String,
    pub avg_cost: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeekendVsWeekday {
    pub weekend_avg: f64,
    pub weekday_avg: f64,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentStatus {
    pub is_good_time_now: bool,
    pub percentile: f64,
    pub current_cost: f64,
    pub historical_avg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PotentialSavings {
    pub amount: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimingAnalysis {
    pub chain: String,
    pub best_day_of_week: Option<DayStat>,
    pub worst_day_of_week: Option<DayStat>,
    pub day_stats: Vec<DayStat>,
    pub weekend_vs_weekday: WeekendVsWeekday,
    pub current_status: CurrentStatus,
    pub potential_savings: PotentialSavings,
    pub time_of_day_recommendations: Vec<String>,
    pub volatility_warning: bool,
}

/// Per-position cost analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisItem {
    pub balance: UserBalance,
    pub avg_gas_cost: f64,
    pub current_gas_cost: f64,
    pub volatility: f64,
    pub avg_monthly_cost: f64,
    pub monthly_conversion_cost: f64,
    pub predicted_monthly_cost: f64,
    /// predicted monthly cost as a percentage of the balance
    pub cost_percentage: f64,
    /// 1 / predicted monthly cost
    pub efficiency: f64,
    pub timing: TimingAnalysis,
    pub current_stablecoin: Option<StablecoinScore>,
    pub recommended_stablecoin: Option<StablecoinScore>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversionTiming {
    Urgent,
    Wait,
    Now,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FiatAllocation {
    pub purpose: String,
    pub chain: String,
    pub stablecoin: Stablecoin,
    pub percentage: f64,
    pub amount_usd: f64,
    pub conversion_fee: f64,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainTimingInsight {
    pub chain: String,
    pub best_day: Option<String>,
    pub worst_day: Option<String>,
    pub time_of_day: Vec<String>,
    pub weekend_vs_weekday: String,
    pub volatility_warning: bool,
    pub is_good_time_now: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Recommendation {
    SwitchStablecoin {
        chain: String,
        from_token: String,
        to_token: Stablecoin,
        amount: f64,
        priority: Priority,
        reason: String,
        reasons: Vec<String>,
        score_difference: f64,
        monthly_savings: f64,
        break_even_months: f64,
        six_month_savings: f64,
    },
    ConvertWithTiming {
        expense: String,
        amount: f64,
        due_date: NaiveDate,
        days_until_due: i64,
        chain: String,
        token: String,
        estimated_cost: f64,
        timing: ConversionTiming,
        best_day: Option<String>,
        potential_savings: Option<f64>,
        priority: Priority,
        reason: String,
    },
    Bridge {
        from_chain: String,
        to_chain: String,
        token: String,
        amount: f64,
        bridge_cost: f64,
        monthly_savings: f64,
        break_even_months: f64,
        six_month_savings: f64,
        priority: Priority,
        reason: String,
    },
    FiatToStablecoin {
        fiat_currency: String,
        fiat_amount: f64,
        usd_value: f64,
        exchange_rate: f64,
        allocations: Vec<FiatAllocation>,
        blended_fee_percent: f64,
        baseline_fee_percent: f64,
        six_month_savings: f64,
        priority: Priority,
        reason: String,
    },
    TimingInsight {
        insights: Vec<ChainTimingInsight>,
    },
}

impl Recommendation {
    pub fn kind(&self) -> &'static str {
        match self {
            Recommendation::SwitchStablecoin { .. } => "switch_stablecoin",
            Recommendation::ConvertWithTiming { .. } => "convert_with_timing",
            Recommendation::Bridge { .. } => "bridge",
            Recommendation::FiatToStablecoin { .. } => "fiat_to_stablecoin",
            Recommendation::TimingInsight { .. } => "timing_insight",
        }
    }

    /// Savings that count toward the report total.
    pub fn counted_savings(&self) -> f64 {
        match self {
            Recommendation::SwitchStablecoin { six_month_savings, .. }
            | Recommendation::Bridge { six_month_savings, .. } => *six_month_savings,
            Recommendation::ConvertWithTiming { potential_savings, .. } => {
                potential_savings.unwrap_or(0.0)
            }
            _ => 0.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MostEfficientChain {
    pub chain: String,
    pub token: String,
    pub efficiency: f64,
    pub predicted_monthly_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub generated_at: DateTime<Utc>,
    pub analysis: Vec<AnalysisItem>,
    pub recommendations: Vec<Recommendation>,
    pub timing_recommendations: BTreeMap<String, TimingAnalysis>,
    pub stablecoin_recommendations: BTreeMap<String, StablecoinSelection>,
    pub most_efficient_chain: Option<MostEfficientChain>,
    pub total_potential_savings: f64,
}

impl OptimizationResult {
    pub fn recommendations_of(&self, kind: &str) -> Vec<&Recommendation> {
        self.recommendations.iter().filter(|r| r.kind() == kind).collect()
    }
}

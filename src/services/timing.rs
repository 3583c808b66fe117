use chrono::Datelike;
use crate::models::{
    ChainHistoricalSample, CurrentStatus, DayStat, PotentialSavings, TimingAnalysis,
    WeekendVsWeekday,
};
use super::{stats, tables};

const DAY_NAMES: [&str; 7] = [
    "Sunday", "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday",
];

/// Current cost may exceed the historical mean by this factor and still count as a good time.
const GOOD_TIME_TOLERANCE: f64 = 1.05;
const VOLATILITY_THRESHOLD: f64 = 0.3;

pub fn analyze_optimal_timing(
    chain: &str,
    history: &[ChainHistoricalSample],
    current_cost: f64,
) -> TimingAnalysis {
    let costs: Vec<f64> = history.iter().map(|s| s.estimated_gas_cost_usd).collect();

    let mut buckets: [Vec<f64>; 7] = Default::default();
    for sample in history {
        let day = sample.date.weekday().num_days_from_sunday() as usize;
        buckets[day].push(sample.estimated_gas_cost_usd);
    }

    let day_stats: Vec<DayStat> = buckets
        .iter()
        .enumerate()
        .filter(|(_, b)| !b.is_empty())
        .map(|(day, b)| DayStat {
            day: day as u32,
            day_name: DAY_NAMES[day].to_string(),
            avg_cost: stats::mean(b),
            samples: b.len(),
        })
        .collect();

    // first minimum / first maximum in Sunday..Saturday order
    let mut best: Option<&DayStat> = None;
    let mut worst: Option<&DayStat> = None;
    for stat in &day_stats {
        if best.map_or(true, |b| stat.avg_cost < b.avg_cost) {
            best = Some(stat);
        }
        if worst.map_or(true, |w| stat.avg_cost > w.avg_cost) {
            worst = Some(stat);
        }
    }
    let best_day_of_week = best.cloned();
    let worst_day_of_week = worst.cloned();

    let weekend: Vec<f64> = buckets[0].iter().chain(buckets[6].iter()).copied().collect();
    let weekday: Vec<f64> = buckets[1..6].iter().flatten().copied().collect();
    let weekend_vs_weekday = compare_weekend(&weekend, &weekday);

    let historical_avg = stats::mean(&costs);
    let is_good_time_now = current_cost < historical_avg * GOOD_TIME_TOLERANCE;

    let savings_amount = best_day_of_week
        .as_ref()
        .map(|b| (current_cost - b.avg_cost).max(0.0))
        .unwrap_or(0.0);
    let savings_percent = if current_cost > 0.0 {
        (savings_amount / current_cost * 100.0).max(0.0)
    } else {
        0.0
    };

    let volatility_warning = stats::coefficient_of_variation(&costs) > VOLATILITY_THRESHOLD;

    tracing::trace!(
        "{}: {} samples, avg ${:.4}, current ${:.4}, good_now={}",
        chain,
        costs.len(),
        historical_avg,
        current_cost,
        is_good_time_now
    );

    TimingAnalysis {
        chain: chain.to_string(),
        best_day_of_week,
        worst_day_of_week,
        day_stats,
        weekend_vs_weekday,
        current_status: CurrentStatus {
            is_good_time_now,
            percentile: stats::percentile_rank(current_cost, &costs),
            current_cost,
            historical_avg,
        },
        potential_savings: PotentialSavings {
            amount: savings_amount,
            percent: savings_percent,
        },
        time_of_day_recommendations: tables::time_of_day_hints(chain),
        volatility_warning,
    }
}

fn compare_weekend(weekend: &[f64], weekday: &[f64]) -> WeekendVsWeekday {
    let weekend_avg = stats::mean(weekend);
    let weekday_avg = stats::mean(weekday);

    let recommendation = if weekend.is_empty() || weekday.is_empty() {
        "Not enough data to compare weekends and weekdays".to_string()
    } else if weekend_avg < weekday_avg {
        format!(
            "Weekends are {:.1}% cheaper than weekdays",
            (weekday_avg - weekend_avg) / weekday_avg * 100.0
        )
    } else if weekday_avg < weekend_avg {
        format!(
            "Weekdays are {:.1}% cheaper than weekends",
            (weekend_avg - weekday_avg) / weekend_avg * 100.0
        )
    } else {
        "Weekends and weekdays cost the same".to_string()
    };

    WeekendVsWeekday {
        weekend_avg,
        weekday_avg,
        recommendation,
    }
}

pub mod market;
pub mod report;

pub use market::{
    ChainHistoricalSample, CurrentChainPrice, FiatBalance, FiatExchangeRate, MarketSnapshot,
    PrimaryUse, Stablecoin, StablecoinLiquiditySnapshot, UserBalance, UserContext,
};
pub use report::{
    AnalysisItem, ChainTimingInsight, ConversionTiming, CurrentStatus, DayStat, FiatAllocation,
    MostEfficientChain, OptimizationResult, PotentialSavings, Priority, Recommendation,
    StablecoinScore, StablecoinSelection, SwitchAnalysis, TimingAnalysis, WeekendVsWeekday,
};

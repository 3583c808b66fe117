use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use crate::config::FetchConfig;
use crate::models::MarketSnapshot;
use crate::sources::{FetchError, FiatRateSource, HistoricalSource, LiquiditySource};

#[derive(Default)]
pub struct CollectorStats {
    pub total_requests: AtomicU64,
    pub successful: AtomicU64,
    pub failed: AtomicU64,
    pub snapshots: AtomicU64,
}

impl CollectorStats {
    fn record<T, E>(&self, result: &Result<T, E>) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if result.is_ok() {
            self.successful.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Gathers everything the optimizer needs into one `MarketSnapshot`.
pub struct SnapshotCollector {
    history: Arc<dyn HistoricalSource>,
    liquidity: Arc<dyn LiquiditySource>,
    fiat: Option<Arc<dyn FiatRateSource>>,
    config: FetchConfig,
    stats: CollectorStats,
}

impl SnapshotCollector {
    pub fn new(
        history: Arc<dyn HistoricalSource>,
        liquidity: Arc<dyn LiquiditySource>,
        fiat: Option<Arc<dyn FiatRateSource>>,
        config: FetchConfig,
    ) -> Self {
        Self {
            history,
            liquidity,
            fiat,
            config,
            stats: CollectorStats::default(),
        }
    }

    pub fn get_stats(&self) -> &CollectorStats {
        &self.stats
    }

    pub fn chains(&self) -> Vec<String> {
        self.config.all_chains()
    }

    fn is_required(&self, chain: &str) -> bool {
        self.config.required_chains.iter().any(|c| c == chain)
    }

    async fn pause(&self) {
        if self.config.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.delay_ms)).await;
        }
    }

    /// Fetches chain histories one at a time with a pause between calls.
    ///
    /// Fails if a required chain or the liquidity data cannot be fetched;
    /// optional chains, current prices and the fiat rate are best effort.
    pub async fn collect(&self) -> Result<MarketSnapshot, FetchError> {
        let mut historical = BTreeMap::new();
        let mut current_prices = BTreeMap::new();

        for (i, chain) in self.chains().iter().enumerate() {
            if i > 0 {
                self.pause().await;
            }

            let result = self.history.fetch_history(chain, self.config.history_days).await;
            self.stats.record(&result);
            match result {
                Ok(samples) => {
                    tracing::info!("✓ {}: {} days of history", chain, samples.len());
                    historical.insert(chain.clone(), samples);
                }
                Err(e) if self.is_required(chain) => {
                    tracing::error!("✗ {} ({}) failed: {}", chain, self.history.name(), e);
                    return Err(FetchError::RequiredChain {
                        chain: chain.clone(),
                        reason: e.to_string(),
                    });
                }
                Err(e) => {
                    tracing::warn!("Skipping {}: {}", chain, e);
                    continue;
                }
            }

            self.pause().await;
            let current = self.history.fetch_current(chain).await;
            self.stats.record(&current);
            match current {
                Ok(price) => {
                    current_prices.insert(chain.clone(), price);
                }
                Err(e) => tracing::warn!("No current price for {} ({}); using history", chain, e),
            }
        }

        let liquidity = self.liquidity.fetch_liquidity().await;
        self.stats.record(&liquidity);
        let liquidity = liquidity.map_err(|e| {
            tracing::error!("✗ {} liquidity failed: {}", self.liquidity.name(), e);
            e
        })?;

        let fiat_rate = match (&self.fiat, &self.config.fiat_currency) {
            (Some(source), Some(currency)) => {
                let rate = source.fetch_rate(currency).await;
                self.stats.record(&rate);
                match rate {
                    Ok(rate) => Some(rate),
                    Err(e) => {
                        tracing::warn!("No {} rate from {}: {}", currency, source.name(), e);
                        None
                    }
                }
            }
            _ => None,
        };

        self.stats.snapshots.fetch_add(1, Ordering::Relaxed);
        Ok(MarketSnapshot {
            as_of: Utc::now(),
            historical,
            current_prices,
            liquidity,
            fiat_rate,
        })
    }
}

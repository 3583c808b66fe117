mod api;
mod config;
mod models;
mod services;
mod sources;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::Duration;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use models::{MarketSnapshot, OptimizationResult, Recommendation};
use services::{LocalStorage, Optimizer, SnapshotCache, SnapshotCollector};
use sources::{coingecko::CoinGeckoClient, defillama::DefiLlamaClient, fx::ExchangeRateClient};
use sources::FiatRateSource;

fn arg_value<'a>(args: &'a [String], flags: &[&str]) -> Option<&'a str> {
    args.iter()
        .position(|a| flags.contains(&a.as_str()))
        .and_then(|i| args.get(i + 1))
        .map(|s| s.as_str())
}

fn build_collector(config: &Config) -> Result<SnapshotCollector, Box<dyn std::error::Error>> {
    let timeout = config.fetch.timeout_secs;
    let gecko = Arc::new(CoinGeckoClient::new(timeout)?);
    let llama = Arc::new(DefiLlamaClient::new(gecko.clone(), config.fetch.liquidity_chains(), timeout)?);
    let fx: Option<Arc<dyn FiatRateSource>> = match config.fetch.fiat_currency {
        Some(_) => Some(Arc::new(ExchangeRateClient::new(timeout)?)),
        None => None,
    };
    Ok(SnapshotCollector::new(gecko, llama, fx, config.fetch.clone()))
}

fn print_report(report: &OptimizationResult) {
    println!("\n📊 Allocation report ({})", report.generated_at.format("%Y-%m-%d %H:%M UTC"));
    println!("─────────────────────────────────────────────────────────");
    println!("   {:10} {:6} {:>10} {:>10} {:>12} {:>8}", "chain", "token", "amount", "gas now", "monthly", "% bal");
    for item in &report.analysis {
        println!(
            "   {:10} {:6} {:>10.2} {:>10.4} {:>12.2} {:>7.2}%",
            item.balance.chain,
            item.balance.token,
            item.balance.amount,
            item.current_gas_cost,
            item.predicted_monthly_cost,
            item.cost_percentage
        );
    }
    if let Some(best) = &report.most_efficient_chain {
        println!("\n🏆 Most efficient: {} (${:.2}/month)", best.chain, best.predicted_monthly_cost);
    }

    println!("\n💡 Recommendations");
    for rec in &report.recommendations {
        match rec {
            Recommendation::SwitchStablecoin { chain, from_token, to_token, reason, .. } => {
                println!("   🔁 [{}] {} → {}: {}", chain, from_token, to_token, reason);
            }
            Recommendation::ConvertWithTiming { expense, chain, timing, reason, .. } => {
                println!("   ⏰ {} via {} ({:?}): {}", expense, chain, timing, reason);
            }
            Recommendation::Bridge { from_chain, to_chain, reason, .. } => {
                println!("   🌉 {} → {}: {}", from_chain, to_chain, reason);
            }
            Recommendation::FiatToStablecoin { allocations, reason, .. } => {
                println!("   💵 {}", reason);
                for a in allocations {
                    println!("      {:>5.1}% {} on {} (${:.2})", a.percentage, a.stablecoin, a.chain, a.amount_usd);
                }
            }
            Recommendation::TimingInsight { insights } => {
                for i in insights {
                    println!(
                        "   📅 {}: best {} / worst {}; {}{}",
                        i.chain,
                        i.best_day.as_deref().unwrap_or("-"),
                        i.worst_day.as_deref().unwrap_or("-"),
                        i.weekend_vs_weekday,
                        if i.volatility_warning { " ⚠️ volatile" } else { "" }
                    );
                }
            }
        }
    }
    println!("\n💰 Potential 6-month savings: ${:.2}\n", report.total_potential_savings);
}

fn run_report(config: &Config, snapshot: &MarketSnapshot, storage: Option<&LocalStorage>) {
    let optimizer = Optimizer::new(config.optimizer.clone());
    let fiat = if config.fiat_balances.is_empty() {
        None
    } else {
        Some(config.fiat_balances.as_slice())
    };
    let report = optimizer.analyze_and_optimize(&config.balances, snapshot, &config.user, fiat);
    print_report(&report);

    if let Some(storage) = storage {
        if let Err(e) = storage.save_report(&report) {
            tracing::warn!("Could not save report: {}", e);
        }
    }
}

#[tokio::main(worker_threads = 4)]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,stable_allocator=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = PathBuf::from(arg_value(&args, &["--config", "-c"]).unwrap_or("config.toml"));
    let config = Config::load(&config_path)?;
    tracing::info!("✓ Configuration loaded from {}", config_path.display());

    let storage = if config.storage.enabled {
        Some(LocalStorage::new(&config.storage.data_dir))
    } else {
        None
    };

    // Offline: replay a saved snapshot
    if let Some(path) = arg_value(&args, &["--snapshot", "-s"]) {
        let snapshot = LocalStorage::load_snapshot(Path::new(path))?;
        tracing::info!("✓ Snapshot loaded ({} chains, as of {})", snapshot.historical.len(), snapshot.as_of);
        run_report(&config, &snapshot, storage.as_ref());
        return Ok(());
    }

    let collector = build_collector(&config)?;

    if args.contains(&"--serve".to_string()) {
        let addr = format!("{}:{}", config.server.host, config.server.port);
        let cache = Arc::new(SnapshotCache::new(config.server.cache_ttl_secs));
        let state = Arc::new(api::AppState::new(Arc::new(collector), cache, storage, config));
        let app = api::create_rest_router(state).layer(CorsLayer::permissive());

        println!("\n✓ Server ready on http://{}\n", addr);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        axum::serve(listener, app).await?;
        return Ok(());
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")?);
    spinner.set_message(format!("Fetching market data for {} chains", collector.chains().len()));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let snapshot = collector.collect().await;
    spinner.finish_and_clear();
    let snapshot = snapshot?;

    if let Some(storage) = &storage {
        if let Err(e) = storage.save_snapshot(&snapshot) {
            tracing::warn!("Could not save snapshot: {}", e);
        }
    }
    run_report(&config, &snapshot, storage.as_ref());

    Ok(())
}

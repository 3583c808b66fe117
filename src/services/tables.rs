//! Hardcoded market knowledge used by the optimizer and the collectors.
//!
//! Every table has an explicit fallback so lookups never fail.

use lazy_static::lazy_static;
use std::collections::HashMap;
use crate::models::Stablecoin;

pub const DEFAULT_REGIONAL_MULTIPLIER: f64 = 1.0;
pub const DEFAULT_BRIDGE_COST: f64 = 10.0;

/// Static facts about a chain's native gas token.
#[derive(Debug, Clone, Copy)]
pub struct ChainProfile {
    pub coingecko_id: &'static str,
    /// Native-token fee of a typical stablecoin transfer.
    pub native_fee: f64,
    /// Chain label in DefiLlama's `chainCirculating` map.
    pub defillama_label: &'static str,
}

lazy_static! {
    static ref REGIONAL_PREFERENCES: HashMap<&'static str, [(Stablecoin, f64); 3]> = {
        use Stablecoin::*;
        let mut m = HashMap::new();
        m.insert("argentina", [(Usdt, 1.2), (Usdc, 1.0), (Dai, 0.8)]);
        m.insert("brazil", [(Usdt, 1.15), (Usdc, 1.05), (Dai, 0.85)]);
        m.insert("nigeria", [(Usdt, 1.25), (Usdc, 0.95), (Dai, 0.8)]);
        m.insert("turkey", [(Usdt, 1.2), (Usdc, 1.0), (Dai, 0.85)]);
        m.insert("venezuela", [(Usdt, 1.3), (Usdc, 0.9), (Dai, 0.8)]);
        m.insert("mexico", [(Usdc, 1.1), (Usdt, 1.05), (Dai, 0.9)]);
        m.insert("philippines", [(Usdt, 1.1), (Usdc, 1.05), (Dai, 0.85)]);
        m.insert("united states", [(Usdc, 1.2), (Usdt, 0.9), (Dai, 1.0)]);
        m
    };

    /// from chain -> to chain -> one-off bridge cost in USD
    static ref BRIDGE_COSTS: HashMap<&'static str, HashMap<&'static str, f64>> = {
        let routes: [(&str, &str, f64); 15] = [
            ("ethereum", "polygon", 15.0),
            ("ethereum", "arbitrum", 8.0),
            ("ethereum", "optimism", 8.0),
            ("ethereum", "base", 8.0),
            ("ethereum", "solana", 20.0),
            ("polygon", "ethereum", 25.0),
            ("polygon", "arbitrum", 5.0),
            ("polygon", "solana", 12.0),
            ("arbitrum", "ethereum", 20.0),
            ("arbitrum", "polygon", 3.0),
            ("arbitrum", "optimism", 2.0),
            ("optimism", "arbitrum", 2.0),
            ("base", "arbitrum", 2.0),
            ("solana", "ethereum", 25.0),
            ("solana", "polygon", 10.0),
        ];
        let mut m: HashMap<&'static str, HashMap<&'static str, f64>> = HashMap::new();
        for (from, to, cost) in routes {
            m.entry(from).or_default().insert(to, cost);
        }
        m
    };

    static ref TIME_OF_DAY_HINTS: HashMap<&'static str, Vec<&'static str>> = {
        let mut m = HashMap::new();
        m.insert("ethereum", vec![
            "Best window: 2am-6am UTC while US and EU are offline",
            "Avoid 2pm-6pm UTC when US markets open and gas spikes",
        ]);
        m.insert("polygon", vec![
            "Fees stay low most of the day",
            "Occasional spikes 1pm-5pm UTC during NFT mints and airdrops",
        ]);
        m.insert("arbitrum", vec![
            "Consistently cheap; L1 data costs follow Ethereum's 2pm-6pm UTC peak",
        ]);
        m.insert("optimism", vec![
            "Consistently cheap; L1 data costs follow Ethereum's 2pm-6pm UTC peak",
        ]);
        m.insert("base", vec![
            "Cheapest late night US time (4am-8am UTC)",
        ]);
        m.insert("solana", vec![
            "Base fees are flat; priority fees are lowest 0am-6am UTC",
        ]);
        m.insert("bsc", vec![
            "Fees are flat; congestion is highest 12pm-4pm UTC during Asian trading",
        ]);
        m
    };

    static ref CHAIN_PROFILES: HashMap<&'static str, ChainProfile> = {
        let mut m = HashMap::new();
        m.insert("ethereum", ChainProfile { coingecko_id: "ethereum", native_fee: 0.0013, defillama_label: "Ethereum" });
        m.insert("polygon", ChainProfile { coingecko_id: "polygon-ecosystem-token", native_fee: 0.002, defillama_label: "Polygon" });
        m.insert("arbitrum", ChainProfile { coingecko_id: "ethereum", native_fee: 0.000005, defillama_label: "Arbitrum" });
        m.insert("optimism", ChainProfile { coingecko_id: "ethereum", native_fee: 0.000003, defillama_label: "OP Mainnet" });
        m.insert("base", ChainProfile { coingecko_id: "ethereum", native_fee: 0.000002, defillama_label: "Base" });
        m.insert("solana", ChainProfile { coingecko_id: "solana", native_fee: 0.000005, defillama_label: "Solana" });
        m.insert("bsc", ChainProfile { coingecko_id: "binancecoin", native_fee: 0.0002, defillama_label: "BSC" });
        m
    };
}

pub fn regional_multiplier(country: &str, coin: Stablecoin) -> f64 {
    REGIONAL_PREFERENCES
        .get(country.trim().to_lowercase().as_str())
        .and_then(|prefs| prefs.iter().find(|(c, _)| *c == coin).map(|(_, m)| *m))
        .unwrap_or(DEFAULT_REGIONAL_MULTIPLIER)
}

pub fn stability(coin: Stablecoin) -> f64 {
    match coin {
        Stablecoin::Usdc => 1.0,
        Stablecoin::Usdt => 0.95,
        Stablecoin::Dai => 0.9,
    }
}

pub fn bridge_cost(from: &str, to: &str) -> f64 {
    BRIDGE_COSTS
        .get(from)
        .and_then(|routes| routes.get(to))
        .copied()
        .unwrap_or(DEFAULT_BRIDGE_COST)
}

pub fn time_of_day_hints(chain: &str) -> Vec<String> {
    match TIME_OF_DAY_HINTS.get(chain) {
        Some(hints) => hints.iter().map(|h| h.to_string()).collect(),
        None => vec!["No known time-of-day pattern for this chain".to_string()],
    }
}

pub fn chain_profile(chain: &str) -> Option<ChainProfile> {
    CHAIN_PROFILES.get(chain).copied()
}

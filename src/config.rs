use alloy::primitives::{address, Address};
use dotenvy::dotenv;
use eyre::{ensure, Result, WrapErr};
use std::{env, str::FromStr, time::Duration};
use tracing::info;

// uint256 has at most 78 decimal digits
const MAX_NATIVE_DECIMALS: u32 = 77;

/// Percentages the L2 deposit total is compared against, relative to L1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    /// L2 above this share of L1 is a possible hack (100 = any excess)
    pub hack_ratio_percent: u32,
    /// L2 below this share of L1 means the bridge is lagging
    pub slow_ratio_percent: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            hack_ratio_percent: 100,
            slow_ratio_percent: 90,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub l1_rpc_url: String,
    pub l2_rpc_url: String,
    pub l1_proxy: Address,          // contract exposing paused()
    pub l1_bridge: Address,
    pub l2_bridge: Address,
    pub native_asset: Address,      // L2 token address standing for ETH
    pub l1_lookback_blocks: u64,
    pub l2_lookback_blocks: u64,
    pub thresholds: Thresholds,
    pub native_decimals: u32,
    pub rpc_timeout: Duration,
}

impl Default for Config {
    /// Optimism mainnet
    fn default() -> Self {
        Self {
            l1_rpc_url: "https://ethereum-rpc.publicnode.com".to_string(),
            l2_rpc_url: "https://mainnet.optimism.io".to_string(),
            l1_proxy: address!("25ace71c97B33Cc4729CF772ae268934F7ab5fA1"),
            l1_bridge: address!("99C9fc46f92E8a1c0deC1b1747d010903E884bE1"),
            l2_bridge: address!("4200000000000000000000000000000000000010"),
            native_asset: address!("DeadDeAddeAddEAddeadDEaDDEAdDeaDDeAD0000"),
            // ~12s L1 blocks, ~2s L2 blocks: one day each
            l1_lookback_blocks: 7_200,
            l2_lookback_blocks: 43_200,
            thresholds: Thresholds::default(),
            native_decimals: 18,
            rpc_timeout: Duration::from_secs(15),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        ensure!(
            t.slow_ratio_percent <= t.hack_ratio_percent,
            "SLOW_RATIO_PERCENT ({}) must not exceed HACK_RATIO_PERCENT ({})",
            t.slow_ratio_percent,
            t.hack_ratio_percent
        );
        ensure!(self.l1_lookback_blocks > 0, "L1_LOOKBACK_BLOCKS must be positive");
        ensure!(self.l2_lookback_blocks > 0, "L2_LOOKBACK_BLOCKS must be positive");
        ensure!(
            self.native_decimals <= MAX_NATIVE_DECIMALS,
            "NATIVE_DECIMALS ({}) must not exceed {}",
            self.native_decimals,
            MAX_NATIVE_DECIMALS
        );
        ensure!(!self.rpc_timeout.is_zero(), "RPC_TIMEOUT_SECS must be positive");
        Ok(())
    }
}

/// Value of the first variable in `keys` that is set
fn var(keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| env::var(k).ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match var(&[key]) {
        Some(raw) => raw
            .parse()
            .wrap_err_with(|| format!("invalid {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

pub fn load() -> Result<Config> {
    dotenv().ok(); // Load from .env file

    let defaults = Config::default();

    let cfg = Config {
        l1_rpc_url: var(&["L1_RPC_URL", "ETHEREUM_RPC"]).unwrap_or(defaults.l1_rpc_url),
        l2_rpc_url: var(&["L2_RPC_URL", "OPTIMISM_RPC"]).unwrap_or(defaults.l2_rpc_url),
        l1_proxy: parsed("L1_PROXY_ADDRESS", defaults.l1_proxy)?,
        l1_bridge: parsed("L1_BRIDGE_ADDRESS", defaults.l1_bridge)?,
        l2_bridge: parsed("L2_BRIDGE_ADDRESS", defaults.l2_bridge)?,
        native_asset: parsed("NATIVE_ASSET_ADDRESS", defaults.native_asset)?,
        l1_lookback_blocks: parsed("L1_LOOKBACK_BLOCKS", defaults.l1_lookback_blocks)?,
        l2_lookback_blocks: parsed("L2_LOOKBACK_BLOCKS", defaults.l2_lookback_blocks)?,
        thresholds: Thresholds {
            hack_ratio_percent: parsed(
                "HACK_RATIO_PERCENT",
                defaults.thresholds.hack_ratio_percent,
            )?,
            slow_ratio_percent: parsed(
                "SLOW_RATIO_PERCENT",
                defaults.thresholds.slow_ratio_percent,
            )?,
        },
        native_decimals: parsed("NATIVE_DECIMALS", defaults.native_decimals)?,
        rpc_timeout: Duration::from_secs(parsed(
            "RPC_TIMEOUT_SECS",
            defaults.rpc_timeout.as_secs(),
        )?),
    };

    cfg.validate()?;

    info!("Loaded config: {:?}", cfg);

    Ok(cfg)
}

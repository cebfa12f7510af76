//! Configuration for the structure engine

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Detection windows and scoring thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Trailing candles scanned for sweeps (default: 8)
    pub sweep_lookback: usize,
    /// Candles before the sweep candle forming the swing high/low (default: 10)
    pub swing_lookback: usize,
    /// Trailing candles for the average volume (default: 50)
    pub volume_lookback: usize,
    /// Last volume above avg * this is a surge (default: 1.5)
    pub volume_surge_mult: f64,
    /// Trailing candles measured for compression (default: 20)
    pub compression_lookback: usize,
    /// Half-width of the rebalance band as a share of range (default: 0.05)
    pub rebalance_band: f64,
    /// ATR period used when levels are built from history (default: 14)
    pub atr_period: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sweep_lookback: 8,
            swing_lookback: 10,
            volume_lookback: 50,
            volume_surge_mult: 1.5,
            compression_lookback: 20,
            rebalance_band: 0.05,
            atr_period: 14,
        }
    }
}

impl EngineConfig {
    /// Load from a JSON file; missing fields keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read engine config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Invalid engine config {}", path.display()))
    }

    /// Default config unless a path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }
}

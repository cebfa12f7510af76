//! Buy-side / sell-side / rebalance price bands around structural levels

use super::levels::StructuralLevels;
use serde::{Deserialize, Serialize};

/// Zone floor as a share of price
const PRICE_FLOOR_PCT: f64 = 0.002;
/// Zone size as a share of ATR (or range when ATR is unavailable)
const ATR_ZONE_MULT: f64 = 0.15;
/// Rebalance half-width as a share of range
const REBALANCE_HALF_WIDTH: f64 = 0.1;

/// Closed price interval [low, high]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBand {
    pub low: f64,
    pub high: f64,
}

impl PriceBand {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.low && price <= self.high
    }

    pub fn width(&self) -> f64 {
        self.high - self.low
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityZones {
    pub buy_side: PriceBand,
    pub sell_side: PriceBand,
    pub rebalance: PriceBand,
    pub zone_size: f64,
}

/// max(price * 0.2%, 0.15 * ATR), with range standing in for a zero ATR
pub fn zone_size(levels: &StructuralLevels, price: f64, atr: f64) -> f64 {
    let volatility = if atr > 0.0 { atr } else { levels.range.max(0.0) };
    (price.abs() * PRICE_FLOOR_PCT).max(ATR_ZONE_MULT * volatility)
}

pub fn liquidity_zones(levels: &StructuralLevels, price: f64, atr: f64) -> LiquidityZones {
    let size = zone_size(levels, price, atr);
    let delta = REBALANCE_HALF_WIDTH * levels.range;

    LiquidityZones {
        buy_side: PriceBand {
            low: levels.upper,
            high: levels.upper + size,
        },
        sell_side: PriceBand {
            low: levels.lower - size,
            high: levels.lower,
        },
        rebalance: PriceBand {
            low: levels.mid - delta,
            high: levels.mid + delta,
        },
        zone_size: size,
    }
}

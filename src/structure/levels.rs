//! Structural reference levels
//!
//! Two anchor variants feed the same pipeline:
//! - Prior Day: PDH/PDL/open/close of yesterday's candle
//! - Weekly VWAP: band between the extreme daily VWAPs since the week's anchor
//!   day, centred on the live VWAP
//!
//! Levels are frozen for the lifetime of their anchor period and replaced
//! wholesale on rollover.

use crate::types::Candle;
use serde::{Deserialize, Serialize};

/// Body below this share of the range makes a compression day
const COMPRESSION_BODY_RATIO: f64 = 0.2;

/// |normalized slope| beyond this is a directional week
const SLOPE_TREND_THRESHOLD: f64 = 0.15;

/// Frozen reference band derived from an anchor period
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralLevels {
    pub upper: f64,
    pub lower: f64,
    pub mid: f64,
    /// upper - lower
    pub range: f64,
    pub slope: f64,
    pub normalized_slope: f64,
}

impl StructuralLevels {
    /// Build from two bounds in either order; `upper >= lower` always holds
    pub fn new(a: f64, b: f64, mid: f64, slope: f64, normalized_slope: f64) -> Self {
        let upper = a.max(b);
        let lower = a.min(b);
        Self {
            upper,
            lower,
            mid,
            range: upper - lower,
            slope,
            normalized_slope,
        }
    }

    /// Levels with `mid` at the centre of the band
    pub fn centred(upper: f64, lower: f64, slope: f64, normalized_slope: f64) -> Self {
        Self::new(upper, lower, (upper + lower) / 2.0, slope, normalized_slope)
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.lower && price <= self.upper
    }
}

/// Label of the anchor period itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AnchorTrend {
    Bullish,
    Bearish,
    /// Prior day with a small body relative to its range
    Compression,
    /// Weekly VWAP without a meaningful slope
    Neutral,
}

impl std::fmt::Display for AnchorTrend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnchorTrend::Bullish => write!(f, "BULLISH"),
            AnchorTrend::Bearish => write!(f, "BEARISH"),
            AnchorTrend::Compression => write!(f, "COMPRESSION"),
            AnchorTrend::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Which anchor produced the levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum LevelSourceKind {
    #[serde(alias = "pd")]
    PriorDay,
    #[serde(alias = "vwap")]
    WeeklyVwap,
}

impl std::fmt::Display for LevelSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LevelSourceKind::PriorDay => write!(f, "PD"),
            LevelSourceKind::WeeklyVwap => write!(f, "W-VWAP"),
        }
    }
}

/// Variant-specific bonuses applied by the probability engine
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringProfile {
    /// Last-N range below `compression_ratio * range` counts as compression
    pub compression_ratio: f64,
    /// Extra continuation score when compressed
    pub compression_continuation_bonus: u32,
    /// Extra continuation score when the anchor slope agrees with acceptance
    pub slope_alignment_bonus: u32,
    /// |normalized slope| required for the alignment bonus
    pub slope_alignment_threshold: f64,
}

/// Capability shared by every anchor variant
pub trait LevelSource {
    fn kind(&self) -> LevelSourceKind;

    fn levels(&self) -> StructuralLevels;

    fn trend(&self) -> AnchorTrend;

    /// ATR of the anchor resolution, 0.0 when unavailable
    fn atr(&self) -> f64;

    fn scoring(&self) -> ScoringProfile;
}

/// Prior day anchor (PDH / PDL)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorDayLevels {
    pub pdh: f64,
    pub pdl: f64,
    pub open: f64,
    pub close: f64,
    pub body_size: f64,
    pub upper_wick: f64,
    pub lower_wick: f64,
    /// ATR14 over daily candles ending with the reference day
    pub atr14: f64,
}

impl PriorDayLevels {
    pub fn from_candle(reference: &Candle, atr14: f64) -> Self {
        Self {
            pdh: reference.high.max(reference.low),
            pdl: reference.high.min(reference.low),
            open: reference.open,
            close: reference.close,
            body_size: reference.body_size(),
            upper_wick: reference.upper_wick(),
            lower_wick: reference.lower_wick(),
            atr14,
        }
    }

    pub fn range(&self) -> f64 {
        self.pdh - self.pdl
    }
}

impl LevelSource for PriorDayLevels {
    fn kind(&self) -> LevelSourceKind {
        LevelSourceKind::PriorDay
    }

    fn levels(&self) -> StructuralLevels {
        let slope = self.close - self.open;
        let range = self.range();
        let normalized = if range > 0.0 { slope / range } else { 0.0 };
        StructuralLevels::centred(self.pdh, self.pdl, slope, normalized)
    }

    fn trend(&self) -> AnchorTrend {
        if self.body_size < COMPRESSION_BODY_RATIO * self.range() {
            AnchorTrend::Compression
        } else if self.close > self.open {
            AnchorTrend::Bullish
        } else {
            AnchorTrend::Bearish
        }
    }

    fn atr(&self) -> f64 {
        self.atr14
    }

    fn scoring(&self) -> ScoringProfile {
        ScoringProfile {
            compression_ratio: 0.6,
            compression_continuation_bonus: 10,
            slope_alignment_bonus: 0,
            slope_alignment_threshold: f64::INFINITY,
        }
    }
}

/// Weekly VWAP anchor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyVwapLevels {
    /// Completed daily VWAPs since the week's anchor day, oldest first
    pub daily_vwaps: Vec<f64>,
    /// VWAP of the current, still-open day
    pub live_vwap: f64,
    /// ATR14 over daily candles
    pub atr14: f64,
}

impl WeeklyVwapLevels {
    pub fn new(daily_vwaps: Vec<f64>, live_vwap: f64, atr14: f64) -> Self {
        let daily_vwaps = daily_vwaps.into_iter().filter(|v| v.is_finite()).collect();
        Self {
            daily_vwaps,
            live_vwap,
            atr14,
        }
    }

    /// Same completed days with a fresh live VWAP
    pub fn with_live_vwap(&self, live_vwap: f64) -> Self {
        Self {
            live_vwap,
            ..self.clone()
        }
    }

    /// Per-day VWAP drift from the first anchor day to the live day
    fn slope(&self) -> f64 {
        match self.daily_vwaps.first() {
            Some(first) => (self.live_vwap - first) / self.daily_vwaps.len() as f64,
            None => 0.0,
        }
    }
}

impl LevelSource for WeeklyVwapLevels {
    fn kind(&self) -> LevelSourceKind {
        LevelSourceKind::WeeklyVwap
    }

    fn levels(&self) -> StructuralLevels {
        let all = self.daily_vwaps.iter().copied().chain(std::iter::once(self.live_vwap));
        let upper = all.clone().fold(f64::NEG_INFINITY, f64::max);
        let lower = all.fold(f64::INFINITY, f64::min);

        let slope = self.slope();
        let range = upper - lower;
        let normalized = if self.atr14 > 0.0 {
            slope / self.atr14
        } else if range > 0.0 {
            slope / range
        } else {
            0.0
        };

        StructuralLevels::new(upper, lower, self.live_vwap, slope, normalized)
    }

    fn trend(&self) -> AnchorTrend {
        let normalized = self.levels().normalized_slope;
        if normalized > SLOPE_TREND_THRESHOLD {
            AnchorTrend::Bullish
        } else if normalized < -SLOPE_TREND_THRESHOLD {
            AnchorTrend::Bearish
        } else {
            AnchorTrend::Neutral
        }
    }

    fn atr(&self) -> f64 {
        self.atr14
    }

    fn scoring(&self) -> ScoringProfile {
        ScoringProfile {
            compression_ratio: 0.5,
            compression_continuation_bonus: 0,
            slope_alignment_bonus: 15,
            slope_alignment_threshold: 0.3,
        }
    }
}

/// Either anchor variant, for callers that pick the variant at runtime
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AnchorSource {
    PriorDay(PriorDayLevels),
    WeeklyVwap(WeeklyVwapLevels),
}

impl LevelSource for AnchorSource {
    fn kind(&self) -> LevelSourceKind {
        match self {
            AnchorSource::PriorDay(s) => s.kind(),
            AnchorSource::WeeklyVwap(s) => s.kind(),
        }
    }

    fn levels(&self) -> StructuralLevels {
        match self {
            AnchorSource::PriorDay(s) => s.levels(),
            AnchorSource::WeeklyVwap(s) => s.levels(),
        }
    }

    fn trend(&self) -> AnchorTrend {
        match self {
            AnchorSource::PriorDay(s) => s.trend(),
            AnchorSource::WeeklyVwap(s) => s.trend(),
        }
    }

    fn atr(&self) -> f64 {
        match self {
            AnchorSource::PriorDay(s) => s.atr(),
            AnchorSource::WeeklyVwap(s) => s.atr(),
        }
    }

    fn scoring(&self) -> ScoringProfile {
        match self {
            AnchorSource::PriorDay(s) => s.scoring(),
            AnchorSource::WeeklyVwap(s) => s.scoring(),
        }
    }
}

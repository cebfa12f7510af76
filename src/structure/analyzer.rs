//! Intraday State Analyzer
//!
//! Walks the current (still open) anchor period against frozen levels:
//! 1. LIQUIDITY - has any wick crossed upper/lower in the whole window?
//! 2. SWEEP - wick beyond a level with the close back inside, last N candles
//! 3. ACCEPTANCE - two consecutive closes beyond a level, whole window
//! 4. MSS - after a sweep, last close breaks the swing before the sweep candle
//!
//! All detectors always run. Only the final state uses a fixed priority:
//! acceptance > sweep > rebalancing > inside range.

use super::config::EngineConfig;
use super::levels::StructuralLevels;
use crate::types::Candle;
use serde::{Deserialize, Serialize};

/// Mutually exclusive classification of the current period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntradayState {
    InsideRange,
    SweepingUpper,
    SweepingLower,
    AcceptedAbove,
    AcceptedBelow,
    Rebalancing,
}

impl std::fmt::Display for IntradayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntradayState::InsideRange => write!(f, "INSIDE_RANGE"),
            IntradayState::SweepingUpper => write!(f, "SWEEPING_UPPER"),
            IntradayState::SweepingLower => write!(f, "SWEEPING_LOWER"),
            IntradayState::AcceptedAbove => write!(f, "ACCEPTED_ABOVE"),
            IntradayState::AcceptedBelow => write!(f, "ACCEPTED_BELOW"),
            IntradayState::Rebalancing => write!(f, "REBALANCING"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SweepSide {
    Upper,
    Lower,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AcceptanceSide {
    Above,
    Below,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MssDirection {
    Long,
    Short,
}

impl std::fmt::Display for SweepSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SweepSide::Upper => write!(f, "UPPER"),
            SweepSide::Lower => write!(f, "LOWER"),
        }
    }
}

impl std::fmt::Display for AcceptanceSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcceptanceSide::Above => write!(f, "ABOVE"),
            AcceptanceSide::Below => write!(f, "BELOW"),
        }
    }
}

impl std::fmt::Display for MssDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MssDirection::Long => write!(f, "LONG"),
            MssDirection::Short => write!(f, "SHORT"),
        }
    }
}

/// Wick beyond a level, body closed back inside
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepEvent {
    pub side: SweepSide,
    /// Index of the sweep candle in the window
    pub index: usize,
    pub time: i64,
    /// High (upper sweep) or low (lower sweep) of the sweep candle
    pub extreme: f64,
}

/// Two consecutive closes beyond a level
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptanceEvent {
    pub side: AcceptanceSide,
    /// Index of the second close of the pair
    pub index: usize,
    pub time: i64,
}

/// Market structure shift confirmed by the last close
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MssEvent {
    pub direction: MssDirection,
    /// Swing high (long) or swing low (short) that was broken
    pub swing_level: f64,
}

/// Cumulative over the window: true once any wick crossed the level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityTaken {
    pub upper_taken: bool,
    pub lower_taken: bool,
}

/// Percentage distance from the last close to each level
///
/// Positive `upper` means price is still below the upper level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Distances {
    pub upper: f64,
    pub lower: f64,
    pub mid: f64,
}

impl Distances {
    pub fn from_price(levels: &StructuralLevels, price: f64) -> Self {
        if price == 0.0 || !price.is_finite() {
            return Self::default();
        }
        Self {
            upper: (levels.upper - price) / price * 100.0,
            lower: (price - levels.lower) / price * 100.0,
            mid: (price - levels.mid).abs() / price * 100.0,
        }
    }
}

/// Result of one evaluation of the current window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntradayAnalysis {
    pub state: IntradayState,
    pub sweep: Option<SweepEvent>,
    pub acceptance: Option<AcceptanceEvent>,
    pub mss: Option<MssEvent>,
    pub liquidity: LiquidityTaken,
    pub distances: Distances,
    pub last_close: Option<f64>,
    /// No state rule matched; `state` is the InsideRange default
    pub fallback: bool,
}

impl IntradayAnalysis {
    /// Neutral result for an empty window
    pub fn empty() -> Self {
        Self {
            state: IntradayState::InsideRange,
            sweep: None,
            acceptance: None,
            mss: None,
            liquidity: LiquidityTaken::default(),
            distances: Distances::default(),
            last_close: None,
            fallback: true,
        }
    }
}

pub fn liquidity_taken(levels: &StructuralLevels, candles: &[Candle]) -> LiquidityTaken {
    LiquidityTaken {
        upper_taken: candles.iter().any(|c| c.high > levels.upper),
        lower_taken: candles.iter().any(|c| c.low < levels.lower),
    }
}

/// Most recent sweep within the trailing `lookback` candles
///
/// Later candles overwrite earlier ones. A single candle sweeping both sides
/// reports the lower side.
pub fn detect_sweep(levels: &StructuralLevels, candles: &[Candle], lookback: usize) -> Option<SweepEvent> {
    let start = candles.len().saturating_sub(lookback);
    let mut sweep = None;

    for (index, c) in candles.iter().enumerate().skip(start) {
        if c.high > levels.upper && c.close < levels.upper {
            sweep = Some(SweepEvent {
                side: SweepSide::Upper,
                index,
                time: c.time,
                extreme: c.high,
            });
        }
        if c.low < levels.lower && c.close > levels.lower {
            sweep = Some(SweepEvent {
                side: SweepSide::Lower,
                index,
                time: c.time,
                extreme: c.low,
            });
        }
    }

    sweep
}

/// Last pair of consecutive closes beyond a level, whole window
pub fn detect_acceptance(levels: &StructuralLevels, candles: &[Candle]) -> Option<AcceptanceEvent> {
    let mut acceptance = None;

    for (index, pair) in candles.windows(2).enumerate() {
        let (prev, curr) = (&pair[0], &pair[1]);
        let side = if prev.close > levels.upper && curr.close > levels.upper {
            AcceptanceSide::Above
        } else if prev.close < levels.lower && curr.close < levels.lower {
            AcceptanceSide::Below
        } else {
            continue;
        };
        acceptance = Some(AcceptanceEvent {
            side,
            index: index + 1,
            time: curr.time,
        });
    }

    acceptance
}

/// Structure break after a sweep, judged on the last close
///
/// Lower sweep: last close above the max high of up to `swing_lookback`
/// candles before the sweep candle. Upper sweep mirrors with the min low.
pub fn detect_mss(candles: &[Candle], sweep: &SweepEvent, swing_lookback: usize) -> Option<MssEvent> {
    let last = candles.last()?;
    let end = sweep.index.min(candles.len());
    let swing = &candles[end.saturating_sub(swing_lookback)..end];
    if swing.is_empty() {
        return None;
    }

    match sweep.side {
        SweepSide::Lower => {
            let swing_high = swing.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
            (last.close > swing_high).then_some(MssEvent {
                direction: MssDirection::Long,
                swing_level: swing_high,
            })
        }
        SweepSide::Upper => {
            let swing_low = swing.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
            (last.close < swing_low).then_some(MssEvent {
                direction: MssDirection::Short,
                swing_level: swing_low,
            })
        }
    }
}

/// Classify the current window against frozen levels
pub fn analyze(levels: &StructuralLevels, candles: &[Candle], config: &EngineConfig) -> IntradayAnalysis {
    let Some(last) = candles.last() else {
        return IntradayAnalysis::empty();
    };

    let liquidity = liquidity_taken(levels, candles);
    let sweep = detect_sweep(levels, candles, config.sweep_lookback);
    let acceptance = detect_acceptance(levels, candles);
    let mss = sweep
        .as_ref()
        .and_then(|s| detect_mss(candles, s, config.swing_lookback));

    let price = last.close;
    let state = if let Some(acc) = acceptance {
        Some(match acc.side {
            AcceptanceSide::Above => IntradayState::AcceptedAbove,
            AcceptanceSide::Below => IntradayState::AcceptedBelow,
        })
    } else if let Some(sw) = sweep {
        Some(match sw.side {
            SweepSide::Upper => IntradayState::SweepingUpper,
            SweepSide::Lower => IntradayState::SweepingLower,
        })
    } else if levels.contains(price) && (price - levels.mid).abs() <= config.rebalance_band * levels.range {
        Some(IntradayState::Rebalancing)
    } else if price > levels.lower && price < levels.upper {
        Some(IntradayState::InsideRange)
    } else {
        None
    };

    IntradayAnalysis {
        state: state.unwrap_or(IntradayState::InsideRange),
        sweep,
        acceptance,
        mss,
        liquidity,
        distances: Distances::from_price(levels, price),
        last_close: Some(price),
        fallback: state.is_none(),
    }
}

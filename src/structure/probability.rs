//! Scenario Probability Engine
//!
//! Additive heuristic scores for {reversal, continuation, range}, normalized
//! to integer percentages that always sum to 100.

use super::analyzer::{AcceptanceSide, IntradayAnalysis};
use super::config::EngineConfig;
use super::indicators::{average_volume, window_range};
use super::levels::{ScoringProfile, StructuralLevels};
use crate::types::Candle;
use serde::{Deserialize, Serialize};

const BASE_REVERSAL: u32 = 5;
const BASE_CONTINUATION: u32 = 5;
const BASE_RANGE: u32 = 10;

const SWEEP_REVERSAL: u32 = 40;
const MSS_REVERSAL: u32 = 25;
const ACCEPTANCE_CONTINUATION: u32 = 45;
const INSIDE_RANGE: u32 = 25;
const SURGE_CONTINUATION: u32 = 15;
const SURGE_REVERSAL: u32 = 10;
const COMPRESSION_RANGE: u32 = 10;

/// Raw, un-normalized score accumulators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioScores {
    pub reversal: u32,
    pub continuation: u32,
    pub range: u32,
}

impl Default for ScenarioScores {
    fn default() -> Self {
        Self {
            reversal: BASE_REVERSAL,
            continuation: BASE_CONTINUATION,
            range: BASE_RANGE,
        }
    }
}

/// Integer percentages, each in [0, 100], summing to exactly 100
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbabilityDistribution {
    pub reversal: u8,
    pub continuation: u8,
    pub range: u8,
}

impl ProbabilityDistribution {
    /// Distribution reported when there is no candle at all
    pub const EMPTY: Self = Self {
        reversal: 33,
        continuation: 33,
        range: 34,
    };

    pub fn total(&self) -> u32 {
        self.reversal as u32 + self.continuation as u32 + self.range as u32
    }
}

/// Last volume above `mult` times the trailing average
pub fn volume_surge(candles: &[Candle], lookback: usize, mult: f64) -> bool {
    let Some(last) = candles.last() else {
        return false;
    };
    let avg = average_volume(candles, lookback);
    avg > 0.0 && last.volume > mult * avg
}

/// Trailing range small relative to the structural range
pub fn is_compressed(levels: &StructuralLevels, candles: &[Candle], lookback: usize, ratio: f64) -> bool {
    if candles.is_empty() || levels.range <= 0.0 {
        return false;
    }
    window_range(candles, lookback) < ratio * levels.range
}

/// Accumulate heuristic scores; every rule is independent
pub fn score(
    levels: &StructuralLevels,
    analysis: &IntradayAnalysis,
    candles: &[Candle],
    profile: &ScoringProfile,
    config: &EngineConfig,
) -> ScenarioScores {
    let mut scores = ScenarioScores::default();

    if analysis.sweep.is_some() {
        scores.reversal += SWEEP_REVERSAL;
    }
    if analysis.mss.is_some() {
        scores.reversal += MSS_REVERSAL;
    }
    if analysis.acceptance.is_some() {
        scores.continuation += ACCEPTANCE_CONTINUATION;
    }
    if let Some(price) = analysis.last_close {
        if price > levels.lower && price < levels.upper {
            scores.range += INSIDE_RANGE;
        }
    }

    if volume_surge(candles, config.volume_lookback, config.volume_surge_mult) {
        if analysis.acceptance.is_some() {
            scores.continuation += SURGE_CONTINUATION;
        }
        if analysis.sweep.is_some() {
            scores.reversal += SURGE_REVERSAL;
        }
    }

    if let Some(acceptance) = analysis.acceptance {
        let aligned = match acceptance.side {
            AcceptanceSide::Above => levels.normalized_slope > profile.slope_alignment_threshold,
            AcceptanceSide::Below => levels.normalized_slope < -profile.slope_alignment_threshold,
        };
        if aligned {
            scores.continuation += profile.slope_alignment_bonus;
        }
    }

    if is_compressed(levels, candles, config.compression_lookback, profile.compression_ratio) {
        scores.range += COMPRESSION_RANGE;
        scores.continuation += profile.compression_continuation_bonus;
    }

    scores
}

/// Round each share to a percentage, then give the residue to the largest bucket
///
/// Ties for the largest bucket go to range, then continuation, then reversal.
pub fn normalize(scores: &ScenarioScores) -> ProbabilityDistribution {
    let total = (scores.reversal + scores.continuation + scores.range) as f64;
    if total <= 0.0 {
        return ProbabilityDistribution::EMPTY;
    }

    let pct = |x: u32| (100.0 * x as f64 / total).round() as i32;
    let mut buckets = [pct(scores.reversal), pct(scores.continuation), pct(scores.range)];
    let raw = [scores.reversal, scores.continuation, scores.range];

    let residue = 100 - buckets.iter().sum::<i32>();
    if residue != 0 {
        let largest = (0..3)
            .max_by(|&a, &b| raw[a].cmp(&raw[b]).then(a.cmp(&b)))
            .unwrap_or(2);
        buckets[largest] += residue;
    }

    let clamp = |v: i32| v.clamp(0, 100) as u8;
    ProbabilityDistribution {
        reversal: clamp(buckets[0]),
        continuation: clamp(buckets[1]),
        range: clamp(buckets[2]),
    }
}

pub fn scenario_probabilities(
    levels: &StructuralLevels,
    analysis: &IntradayAnalysis,
    candles: &[Candle],
    profile: &ScoringProfile,
    config: &EngineConfig,
) -> ProbabilityDistribution {
    if candles.is_empty() {
        return ProbabilityDistribution::EMPTY;
    }
    normalize(&score(levels, analysis, candles, profile, config))
}

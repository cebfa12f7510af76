//! Structure Engine
//!
//! One pipeline for every anchor variant:
//! LevelSource -> frozen levels + trend -> IntradayStateAnalyzer -> scenario
//! probabilities. Evaluation is a pure function of the candle window.

use super::analyzer::{analyze, IntradayAnalysis, IntradayState};
use super::config::EngineConfig;
use super::levels::{AnchorTrend, LevelSource, LevelSourceKind, StructuralLevels};
use super::probability::{scenario_probabilities, ProbabilityDistribution};
use super::zones::{liquidity_zones, LiquidityZones};
use crate::types::Candle;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Everything the presentation layer needs for one evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureReport {
    pub source: LevelSourceKind,
    pub levels: StructuralLevels,
    pub trend: AnchorTrend,
    /// `None` for an empty window
    pub zones: Option<LiquidityZones>,
    pub analysis: IntradayAnalysis,
    pub probabilities: ProbabilityDistribution,
    /// Probability (0-100) of the scenario the state points to
    pub confidence: u8,
}

/// Probability of the scenario aligned with the state, 0 when no rule matched
pub fn state_confidence(analysis: &IntradayAnalysis, probabilities: &ProbabilityDistribution) -> u8 {
    if analysis.fallback {
        return 0;
    }
    match analysis.state {
        IntradayState::AcceptedAbove | IntradayState::AcceptedBelow => probabilities.continuation,
        IntradayState::SweepingUpper | IntradayState::SweepingLower => probabilities.reversal,
        IntradayState::Rebalancing | IntradayState::InsideRange => probabilities.range,
    }
}

/// Engine bound to one frozen anchor period
#[derive(Debug, Clone)]
pub struct StructureEngine<S: LevelSource> {
    source: S,
    levels: StructuralLevels,
    trend: AnchorTrend,
    config: EngineConfig,
}

impl<S: LevelSource> StructureEngine<S> {
    /// Freeze the source's levels for the lifetime of this engine
    pub fn new(source: S, config: EngineConfig) -> Self {
        let levels = source.levels();
        let trend = source.trend();
        Self {
            source,
            levels,
            trend,
            config,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn levels(&self) -> &StructuralLevels {
        &self.levels
    }

    pub fn trend(&self) -> AnchorTrend {
        self.trend
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Classify the current period's window
    pub fn evaluate(&self, candles: &[Candle]) -> StructureReport {
        let analysis = analyze(&self.levels, candles, &self.config);
        let probabilities = scenario_probabilities(
            &self.levels,
            &analysis,
            candles,
            &self.source.scoring(),
            &self.config,
        );
        let zones = analysis
            .last_close
            .map(|price| liquidity_zones(&self.levels, price, self.source.atr()));
        let confidence = state_confidence(&analysis, &probabilities);

        debug!(
            "{} evaluation: {} candles, state={}, rev/cont/range={}/{}/{}",
            self.source.kind(),
            candles.len(),
            analysis.state,
            probabilities.reversal,
            probabilities.continuation,
            probabilities.range
        );

        StructureReport {
            source: self.source.kind(),
            levels: self.levels,
            trend: self.trend,
            zones,
            analysis,
            probabilities,
            confidence,
        }
    }
}

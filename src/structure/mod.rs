//! Structure Core - market-structure decision engine
//!
//! This module contains the deterministic classifier components:
//! - Structural levels from a frozen anchor (prior day or weekly VWAP)
//! - Liquidity zones sized from ATR
//! - Intraday state analysis (sweeps, acceptance, MSS)
//! - Scenario probabilities
//! - Anchor periods, level cache and replay

pub mod indicators;
pub mod levels;
pub mod zones;
pub mod config;
pub mod analyzer;
pub mod probability;
pub mod engine;
pub mod sessions;
pub mod cache;
pub mod replay;

// Re-export commonly used types
pub use levels::{
    AnchorSource, AnchorTrend, LevelSource, LevelSourceKind, PriorDayLevels, ScoringProfile,
    StructuralLevels, WeeklyVwapLevels,
};
pub use zones::{LiquidityZones, PriceBand};
pub use config::EngineConfig;
pub use analyzer::{
    AcceptanceEvent, AcceptanceSide, Distances, IntradayAnalysis, IntradayState, LiquidityTaken,
    MssDirection, MssEvent, SweepEvent, SweepSide,
};
pub use probability::{ProbabilityDistribution, ScenarioScores};
pub use engine::{StructureEngine, StructureReport};
pub use sessions::{build_anchor, build_prior_day, build_weekly_vwap, AnchoredWindow};
pub use cache::LevelCache;
pub use replay::{replay, StateChange, Transition};

//! Replay a window candle by candle
//!
//! Each growing prefix is evaluated from scratch, exactly as a live caller
//! would on every new candle, and the differences between consecutive
//! evaluations are recorded as transitions.

use super::analyzer::{AcceptanceSide, IntradayAnalysis, IntradayState, MssDirection, SweepSide};
use super::engine::StructureEngine;
use super::levels::LevelSource;
use crate::types::Candle;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Transition {
    State { from: IntradayState, to: IntradayState },
    Sweep { side: SweepSide },
    Acceptance { side: AcceptanceSide },
    Mss { direction: MssDirection },
    UpperTaken,
    LowerTaken,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transition::State { from, to } => write!(f, "STATE {} -> {}", from, to),
            Transition::Sweep { side } => write!(f, "SWEEP {}", side),
            Transition::Acceptance { side } => write!(f, "ACCEPTANCE {}", side),
            Transition::Mss { direction } => write!(f, "MSS {}", direction),
            Transition::UpperTaken => write!(f, "UPPER LIQUIDITY TAKEN"),
            Transition::LowerTaken => write!(f, "LOWER LIQUIDITY TAKEN"),
        }
    }
}

/// A transition observed when candle `index` closed
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StateChange {
    pub index: usize,
    pub time: i64,
    pub close: f64,
    pub transition: Transition,
}

fn diff(prev: &IntradayAnalysis, next: &IntradayAnalysis) -> Vec<Transition> {
    let mut out = Vec::new();

    if next.liquidity.upper_taken && !prev.liquidity.upper_taken {
        out.push(Transition::UpperTaken);
    }
    if next.liquidity.lower_taken && !prev.liquidity.lower_taken {
        out.push(Transition::LowerTaken);
    }

    if let Some(sweep) = next.sweep {
        let is_new = prev.sweep.map_or(true, |p| p.index != sweep.index || p.side != sweep.side);
        if is_new {
            out.push(Transition::Sweep { side: sweep.side });
        }
    }
    if let Some(acc) = next.acceptance {
        if prev.acceptance.map(|p| p.side) != Some(acc.side) {
            out.push(Transition::Acceptance { side: acc.side });
        }
    }
    if let Some(mss) = next.mss {
        if prev.mss.map(|p| p.direction) != Some(mss.direction) {
            out.push(Transition::Mss {
                direction: mss.direction,
            });
        }
    }

    if next.state != prev.state {
        out.push(Transition::State {
            from: prev.state,
            to: next.state,
        });
    }

    out
}

/// Transitions produced by feeding `candles` one at a time
pub fn replay<S: LevelSource>(engine: &StructureEngine<S>, candles: &[Candle]) -> Vec<StateChange> {
    let mut changes = Vec::new();
    let mut prev = IntradayAnalysis::empty();

    for (index, candle) in candles.iter().enumerate() {
        let next = engine.evaluate(&candles[..=index]).analysis;
        changes.extend(diff(&prev, &next).into_iter().map(|transition| StateChange {
            index,
            time: candle.time,
            close: candle.close,
            transition,
        }));
        prev = next;
    }

    changes
}

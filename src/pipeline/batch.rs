use anyhow::{Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use liquidity_structure::data::{load_candles, symbol_from_path};
use liquidity_structure::structure::{
    build_anchor, EngineConfig, IntradayState, LevelSourceKind, ProbabilityDistribution, StructureEngine,
    StructureReport,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Latest evaluation for one candle file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolSummary {
    pub symbol: String,
    pub session: NaiveDate,
    pub source: LevelSourceKind,
    pub state: IntradayState,
    pub probabilities: ProbabilityDistribution,
    pub confidence: u8,
    pub candles: usize,
}

impl std::fmt::Display for SymbolSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:<10} {} {:<7} {:<15} rev {:>3}% cont {:>3}% range {:>3}% conf {:>3}",
            self.symbol,
            self.session,
            self.source.to_string(),
            self.state.to_string(),
            self.probabilities.reversal,
            self.probabilities.continuation,
            self.probabilities.range,
            self.confidence
        )
    }
}

/// Split a history file into anchor and current session, then evaluate
pub fn evaluate_file(
    path: &Path,
    kind: LevelSourceKind,
    tz: Tz,
    config: &EngineConfig,
) -> Result<(NaiveDate, StructureReport, usize)> {
    let history = load_candles(path)?;
    let anchored = build_anchor(kind, &history, tz, config.atr_period)
        .with_context(|| format!("Not enough history in {:?} to build {} levels", path, kind))?;

    let engine = StructureEngine::new(anchored.source, config.clone());
    let report = engine.evaluate(&anchored.window);
    Ok((anchored.session, report, anchored.window.len()))
}

pub fn summarize(path: &Path, kind: LevelSourceKind, tz: Tz, config: &EngineConfig) -> Result<SymbolSummary> {
    let (session, report, candles) = evaluate_file(path, kind, tz, config)?;
    Ok(SymbolSummary {
        symbol: symbol_from_path(path),
        session,
        source: report.source,
        state: report.analysis.state,
        probabilities: report.probabilities,
        confidence: report.confidence,
        candles,
    })
}

/// Evaluate files in parallel, preserving input order
pub fn summarize_parallel(
    files: &[PathBuf],
    kind: LevelSourceKind,
    tz: Tz,
    config: &EngineConfig,
) -> Vec<(PathBuf, Result<SymbolSummary>)> {
    files
        .par_iter()
        .map(|path| {
            let result = summarize(path, kind, tz, config);
            if let Ok(ref summary) = result {
                info!("Evaluated {}: {} candles", summary.symbol, summary.candles);
            }
            (path.clone(), result)
        })
        .collect()
}

/// Write summaries as zstd-compressed JSON
pub fn save_summaries(summaries: &[SymbolSummary], path: &Path) -> Result<()> {
    let json = serde_json::to_vec(summaries)?;
    let compressed = zstd::encode_all(&json[..], 3)?;
    std::fs::write(path, compressed).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use liquidity_structure::Candle;

    /// 2024-01-01T00:00:00Z, a Monday
    const MONDAY: i64 = 1_704_067_200;
    const DAY: i64 = 86_400;

    fn day_of(start: i64, base: f64) -> Vec<Candle> {
        (0..4)
            .map(|i| {
                let open = base + i as f64;
                Candle::new(start + 14 * 3_600 + i * 900, open, open + 2.0, open - 1.0, open + 1.0, 10.0)
            })
            .collect()
    }

    fn write_history(dir: &Path, name: &str, days: usize) -> PathBuf {
        let history: Vec<Candle> = (0..days)
            .flat_map(|d| day_of(MONDAY + d as i64 * DAY, 100.0 + d as f64 * 3.0))
            .collect();
        let path = dir.join(name);
        std::fs::write(&path, serde_json::to_vec(&history).unwrap()).unwrap();
        path
    }

    #[test]
    fn test_summarize_parallel_keeps_order_and_errors() {
        let dir = std::env::temp_dir().join(format!("liquidity-structure-batch-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let files = vec![
            write_history(&dir, "NQ.json", 3),
            write_history(&dir, "ES.json", 1),
        ];

        let results = summarize_parallel(&files, LevelSourceKind::PriorDay, Tz::UTC, &EngineConfig::default());
        std::fs::remove_dir_all(&dir).ok();

        assert_eq!(results.len(), 2);
        let nq = results[0].1.as_ref().unwrap();
        assert_eq!(nq.symbol, "NQ");
        assert_eq!(nq.session, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(nq.candles, 4);
        assert_eq!(
            nq.probabilities.reversal + nq.probabilities.continuation + nq.probabilities.range,
            100
        );
        // A single day has no prior day
        assert!(results[1].1.is_err());
    }
}

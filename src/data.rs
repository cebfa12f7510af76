//! Candle input
//!
//! Loads candle files handed over by the retrieval/caching side and rejects
//! windows the engine must never see: out of order, non-finite, or priced at
//! zero.
//!
//! Supported files:
//! - `.json`      array of candles
//! - `.json.zst`  zstd-compressed JSON array
//! - `.csv` / `.csv.zst`  `time,open,high,low,close,volume[,quoteVolume]`

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::types::Candle;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CandleError {
    #[error("candle {index}: time {time} is not after previous time {prev}")]
    NotAscending { index: usize, prev: i64, time: i64 },

    #[error("candle {index}: non-finite price or volume")]
    NonFinite { index: usize },

    #[error("candle {index}: close must be positive, got {close}")]
    NonPositiveClose { index: usize, close: f64 },

    #[error("candle {index}: high {high} below low {low}")]
    InvertedRange { index: usize, high: f64, low: f64 },
}

/// Check the engine's input contract
pub fn validate_candles(candles: &[Candle]) -> Result<(), CandleError> {
    for (index, c) in candles.iter().enumerate() {
        let values = [c.open, c.high, c.low, c.close, c.volume];
        if values.iter().any(|v| !v.is_finite()) || c.quote_volume.is_some_and(|q| !q.is_finite()) {
            return Err(CandleError::NonFinite { index });
        }
        if c.close <= 0.0 {
            return Err(CandleError::NonPositiveClose { index, close: c.close });
        }
        if c.high < c.low {
            return Err(CandleError::InvertedRange {
                index,
                high: c.high,
                low: c.low,
            });
        }
        if index > 0 {
            let prev = candles[index - 1].time;
            if c.time <= prev {
                return Err(CandleError::NotAscending {
                    index,
                    prev,
                    time: c.time,
                });
            }
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Csv,
}

/// Format and compression from the file name
fn detect_format(path: &Path) -> Option<(Format, bool)> {
    let name = path.file_name()?.to_string_lossy().to_lowercase();
    let (stem, compressed) = match name.strip_suffix(".zst") {
        Some(stem) => (stem.to_string(), true),
        None => (name, false),
    };
    if stem.ends_with(".json") {
        Some((Format::Json, compressed))
    } else if stem.ends_with(".csv") {
        Some((Format::Csv, compressed))
    } else {
        None
    }
}

/// Parse `time,open,high,low,close,volume[,quoteVolume]` rows
pub fn parse_csv<R: Read>(reader: R) -> Result<Vec<Candle>> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut candles = Vec::new();
    for (row, result) in csv_reader.deserialize().enumerate() {
        let candle: Candle = result.with_context(|| format!("Failed to parse CSV row {}", row + 1))?;
        candles.push(candle);
    }
    Ok(candles)
}

fn parse_json<R: Read>(reader: R) -> Result<Vec<Candle>> {
    serde_json::from_reader(reader).context("Failed to parse candle JSON")
}

/// Load and validate a candle file
pub fn load_candles(path: &Path) -> Result<Vec<Candle>> {
    let (format, compressed) = detect_format(path)
        .with_context(|| format!("Unsupported candle file: {:?}", path))?;

    let file = File::open(path).with_context(|| format!("Failed to open file: {:?}", path))?;

    let reader: Box<dyn Read> = if compressed {
        let decoder = zstd::stream::Decoder::new(file)
            .with_context(|| format!("Failed to create zstd decoder for: {:?}", path))?;
        Box::new(BufReader::new(decoder))
    } else {
        Box::new(BufReader::new(file))
    };

    let candles = match format {
        Format::Json => parse_json(reader),
        Format::Csv => parse_csv(reader),
    }
    .with_context(|| format!("Failed to read candles from {:?}", path))?;

    validate_candles(&candles).with_context(|| format!("Invalid candles in {:?}", path))?;

    debug!("Loaded {} candles from {:?}", candles.len(), path);
    Ok(candles)
}

/// Symbol implied by a file name: `NQ.json.zst` -> `NQ`
pub fn symbol_from_path(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .and_then(|n| n.split('.').next().map(str::to_string))
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "UNKNOWN".to_string())
}

/// All supported candle files in a directory, sorted by name
pub fn find_candle_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read directory: {:?}", dir))? {
        let path = entry?.path();
        if path.is_file() && detect_format(&path).is_some() {
            files.push(path);
        }
    }

    files.sort();
    info!("Found {} candle files in {:?}", files.len(), dir);
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candle(time: i64, close: f64) -> Candle {
        Candle::new(time, close, close + 1.0, close - 1.0, close, 10.0)
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("liquidity-structure-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_validate_accepts_good_window() {
        assert!(validate_candles(&[]).is_ok());
        assert!(validate_candles(&[candle(0, 10.0), candle(60, 11.0)]).is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_input() {
        let err = validate_candles(&[candle(60, 10.0), candle(60, 11.0)]).unwrap_err();
        assert_eq!(
            err,
            CandleError::NotAscending {
                index: 1,
                prev: 60,
                time: 60
            }
        );

        let err = validate_candles(&[candle(0, 0.0)]).unwrap_err();
        assert!(matches!(err, CandleError::NonPositiveClose { index: 0, .. }));

        let mut nan = candle(0, 10.0);
        nan.high = f64::NAN;
        assert_eq!(validate_candles(&[nan]).unwrap_err(), CandleError::NonFinite { index: 0 });

        let inverted = Candle::new(0, 10.0, 9.0, 11.0, 10.0, 1.0);
        assert!(matches!(
            validate_candles(&[inverted]).unwrap_err(),
            CandleError::InvertedRange { .. }
        ));
    }

    #[test]
    fn test_parse_csv_with_optional_quote_volume() {
        let raw = "time,open,high,low,close,volume,quoteVolume\n\
                   0,10,11,9,10.5,100,\n\
                   60,10.5,12,10,11.5,50,575\n";
        let candles = parse_csv(raw.as_bytes()).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(candles[0].quote_volume, None);
        assert_eq!(candles[1].quote_volume, Some(575.0));
        assert_eq!(candles[1].close, 11.5);
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(detect_format(Path::new("NQ.json")), Some((Format::Json, false)));
        assert_eq!(detect_format(Path::new("NQ.JSON.zst")), Some((Format::Json, true)));
        assert_eq!(detect_format(Path::new("es.csv.zst")), Some((Format::Csv, true)));
        assert_eq!(detect_format(Path::new("notes.txt")), None);
    }

    #[test]
    fn test_symbol_from_path() {
        assert_eq!(symbol_from_path(Path::new("/data/NQ.json.zst")), "NQ");
        assert_eq!(symbol_from_path(Path::new("BTCUSDT.csv")), "BTCUSDT");
    }

    #[test]
    fn test_load_compressed_json() {
        let candles = vec![candle(0, 10.0), candle(900, 10.5)];
        let json = serde_json::to_vec(&candles).unwrap();
        let path = temp_path("window.json.zst");
        std::fs::write(&path, zstd::encode_all(&json[..], 3).unwrap()).unwrap();

        let loaded = load_candles(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, candles);
    }

    #[test]
    fn test_load_rejects_unordered_file() {
        let candles = vec![candle(900, 10.0), candle(0, 10.5)];
        let path = temp_path("unordered.json");
        std::fs::write(&path, serde_json::to_vec(&candles).unwrap()).unwrap();

        let err = load_candles(&path).unwrap_err();
        std::fs::remove_file(&path).ok();
        assert!(format!("{:#}", err).contains("not after previous time"));
    }
}

use serde::{Deserialize, Serialize};

/// One time-bucketed OHLCV point
///
/// Candles are read-only input: the engine never mutates them, and a window
/// is expected to be ordered strictly ascending by `time`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bucket open time, unix seconds
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(rename = "quoteVolume", default, skip_serializing_if = "Option::is_none")]
    pub quote_volume: Option<f64>,
}

impl Candle {
    pub fn new(time: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            time,
            open,
            high,
            low,
            close,
            volume,
            quote_volume: None,
        }
    }

    /// (high + low + close) / 3, the VWAP input price
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    pub fn body_size(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn upper_wick(&self) -> f64 {
        self.high - self.open.max(self.close)
    }

    pub fn lower_wick(&self) -> f64 {
        self.open.min(self.close) - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candle_geometry() {
        let c = Candle::new(0, 100.0, 110.0, 95.0, 104.0, 10.0);
        assert_eq!(c.body_size(), 4.0);
        assert_eq!(c.range(), 15.0);
        assert_eq!(c.upper_wick(), 6.0);
        assert_eq!(c.lower_wick(), 5.0);
        assert!(c.is_bullish());
        assert!((c.typical_price() - 103.0).abs() < 1e-9);
    }

    #[test]
    fn test_quote_volume_is_optional_on_the_wire() {
        let c = Candle::new(60, 1.0, 2.0, 0.5, 1.5, 3.0);
        let json = serde_json::to_string(&c).unwrap();
        assert!(!json.contains("quoteVolume"));

        let parsed: Candle = serde_json::from_str(
            r#"{"time":60,"open":1.0,"high":2.0,"low":0.5,"close":1.5,"volume":3.0,"quoteVolume":4.5}"#,
        )
        .unwrap();
        assert_eq!(parsed.quote_volume, Some(4.5));
        assert_eq!(parsed.time, 60);
    }
}

//! Volatility, volume and VWAP helpers shared by level builders and scoring

use crate::types::Candle;

/// Standard ATR period for zone sizing
pub const ATR_PERIOD: usize = 14;

/// True range of `candles[idx]`; the first candle has no previous close
fn true_range(candles: &[Candle], idx: usize) -> f64 {
    let bar = &candles[idx];
    let hl = bar.high - bar.low;
    if idx == 0 {
        return hl;
    }
    let prev_close = candles[idx - 1].close;
    hl.max((bar.high - prev_close).abs())
        .max((bar.low - prev_close).abs())
}

/// Simple average of the last `period` true ranges
///
/// Returns 0.0 when fewer than `period` candles are available.
pub fn atr(candles: &[Candle], period: usize) -> f64 {
    if period == 0 || candles.len() < period {
        return 0.0;
    }

    let start = candles.len() - period;
    let sum_tr: f64 = (start..candles.len()).map(|i| true_range(candles, i)).sum();
    sum_tr / period as f64
}

/// 14-period ATR
pub fn atr14(candles: &[Candle]) -> f64 {
    atr(candles, ATR_PERIOD)
}

/// Volume weighted average of typical price
///
/// `None` for an empty slice or when the slice traded no volume.
pub fn vwap(candles: &[Candle]) -> Option<f64> {
    let mut sum_pv = 0.0;
    let mut sum_v = 0.0;

    for bar in candles {
        sum_pv += bar.typical_price() * bar.volume;
        sum_v += bar.volume;
    }

    if sum_v > 0.0 {
        Some(sum_pv / sum_v)
    } else {
        None
    }
}

fn trailing(candles: &[Candle], lookback: usize) -> &[Candle] {
    &candles[candles.len().saturating_sub(lookback)..]
}

/// Mean volume over the trailing `lookback` candles
pub fn average_volume(candles: &[Candle], lookback: usize) -> f64 {
    let window = trailing(candles, lookback);
    if window.is_empty() {
        return 0.0;
    }
    window.iter().map(|c| c.volume).sum::<f64>() / window.len() as f64
}

/// max(high) - min(low) over the trailing `lookback` candles
pub fn window_range(candles: &[Candle], lookback: usize) -> f64 {
    let window = trailing(candles, lookback);
    if window.is_empty() {
        return 0.0;
    }
    let high = window.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max);
    let low = window.iter().map(|c| c.low).fold(f64::INFINITY, f64::min);
    high - low
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(open: f64, high: f64, low: f64, close: f64, volume: f64) -> Candle {
        Candle::new(0, open, high, low, close, volume)
    }

    #[test]
    fn test_atr_needs_full_period() {
        let bars: Vec<Candle> = (0..13).map(|_| bar(10.0, 11.0, 9.0, 10.0, 1.0)).collect();
        assert_eq!(atr14(&bars), 0.0);
        assert_eq!(atr(&[], 14), 0.0);
        assert_eq!(atr(&bars, 0), 0.0);
    }

    #[test]
    fn test_atr_uses_gaps_from_previous_close() {
        // Flat 2-point bars, then a gap up: TR = |high - prev close|
        let mut bars: Vec<Candle> = (0..14).map(|_| bar(10.0, 11.0, 9.0, 10.0, 1.0)).collect();
        bars.push(bar(20.0, 21.0, 19.0, 20.0, 1.0));
        let value = atr14(&bars);
        // 13 bars of TR 2, one bar of TR 11
        assert!((value - (13.0 * 2.0 + 11.0) / 14.0).abs() < 1e-9);
    }

    #[test]
    fn test_vwap() {
        let bars = vec![bar(0.0, 12.0, 6.0, 9.0, 1.0), bar(0.0, 15.0, 9.0, 12.0, 3.0)];
        // typical 9 and 12, weights 1 and 3
        assert!((vwap(&bars).unwrap() - 11.25).abs() < 1e-9);
        assert_eq!(vwap(&[]), None);
        assert_eq!(vwap(&[bar(1.0, 2.0, 0.5, 1.5, 0.0)]), None);
    }

    #[test]
    fn test_average_volume_and_range() {
        let bars = vec![
            bar(10.0, 30.0, 5.0, 10.0, 100.0),
            bar(10.0, 12.0, 9.0, 11.0, 2.0),
            bar(11.0, 13.0, 10.0, 12.0, 4.0),
        ];
        assert_eq!(average_volume(&bars, 2), 3.0);
        assert_eq!(average_volume(&bars, 50), 106.0 / 3.0);
        assert_eq!(window_range(&bars, 2), 4.0);
        assert_eq!(window_range(&[], 2), 0.0);
    }
}

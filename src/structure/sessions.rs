//! Anchor periods from a multi-day candle history
//!
//! Splits an ascending history into trading days in a session timezone and
//! derives the frozen anchor (prior day, or weekly VWAP band) together with
//! the current, still-open day's window.

use super::indicators::{atr, vwap};
use super::levels::{AnchorSource, LevelSourceKind, PriorDayLevels, WeeklyVwapLevels};
use crate::types::Candle;
use chrono::{DateTime, Datelike, Duration, NaiveDate};
use chrono_tz::Tz;
use std::collections::BTreeMap;

/// Anchor levels plus the window they apply to
#[derive(Debug, Clone, PartialEq)]
pub struct AnchoredWindow<S> {
    /// Trading date of the current window, also the level cache key
    pub session: NaiveDate,
    pub source: S,
    pub window: Vec<Candle>,
}

/// Trading date of a candle in the session timezone
pub fn trading_day(candle: &Candle, tz: Tz) -> Option<NaiveDate> {
    DateTime::from_timestamp(candle.time, 0).map(|utc| utc.with_timezone(&tz).date_naive())
}

pub fn group_by_day(candles: &[Candle], tz: Tz) -> BTreeMap<NaiveDate, Vec<Candle>> {
    let mut days: BTreeMap<NaiveDate, Vec<Candle>> = BTreeMap::new();
    for candle in candles {
        if let Some(date) = trading_day(candle, tz) {
            days.entry(date).or_default().push(*candle);
        }
    }
    days
}

/// Aggregate one day's candles into a single OHLCV candle
pub fn daily_candle(day: &[Candle]) -> Option<Candle> {
    let first = day.first()?;
    let last = day.last()?;

    let quote_volume = day
        .iter()
        .map(|c| c.quote_volume)
        .sum::<Option<f64>>();

    Some(Candle {
        time: first.time,
        open: first.open,
        high: day.iter().map(|c| c.high).fold(f64::NEG_INFINITY, f64::max),
        low: day.iter().map(|c| c.low).fold(f64::INFINITY, f64::min),
        close: last.close,
        volume: day.iter().map(|c| c.volume).sum(),
        quote_volume,
    })
}

/// Monday of the date's ISO week
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

/// Prior-day anchor for the last trading day in the history
///
/// `None` without at least one completed day before the current one.
pub fn build_prior_day(history: &[Candle], tz: Tz, atr_period: usize) -> Option<AnchoredWindow<PriorDayLevels>> {
    let days = group_by_day(history, tz);
    let (&session, window) = days.iter().next_back()?;
    let completed: Vec<Candle> = days
        .range(..session)
        .filter_map(|(_, candles)| daily_candle(candles))
        .collect();
    let reference = completed.last()?;

    Some(AnchoredWindow {
        session,
        source: PriorDayLevels::from_candle(reference, atr(&completed, atr_period)),
        window: window.clone(),
    })
}

/// Weekly VWAP anchor for the last trading day in the history
///
/// Uses the completed days of the current week; on the week's first day the
/// previous completed day stands in. `None` when the live day has no VWAP or
/// no completed day exists.
pub fn build_weekly_vwap(history: &[Candle], tz: Tz, atr_period: usize) -> Option<AnchoredWindow<WeeklyVwapLevels>> {
    let days = group_by_day(history, tz);
    let (&session, window) = days.iter().next_back()?;
    let live_vwap = vwap(window)?;
    let mut daily_vwaps: Vec<f64> = days
        .range(week_start(session)..session)
        .filter_map(|(_, candles)| vwap(candles))
        .collect();

    if daily_vwaps.is_empty() {
        let previous = days.range(..session).next_back().and_then(|(_, c)| vwap(c))?;
        daily_vwaps.push(previous);
    }

    let completed: Vec<Candle> = days
        .range(..session)
        .filter_map(|(_, candles)| daily_candle(candles))
        .collect();

    Some(AnchoredWindow {
        session,
        source: WeeklyVwapLevels::new(daily_vwaps, live_vwap, atr(&completed, atr_period)),
        window: window.clone(),
    })
}

/// Anchor of either variant, chosen at runtime
pub fn build_anchor(
    kind: LevelSourceKind,
    history: &[Candle],
    tz: Tz,
    atr_period: usize,
) -> Option<AnchoredWindow<AnchorSource>> {
    match kind {
        LevelSourceKind::PriorDay => build_prior_day(history, tz, atr_period).map(|a| AnchoredWindow {
            session: a.session,
            source: AnchorSource::PriorDay(a.source),
            window: a.window,
        }),
        LevelSourceKind::WeeklyVwap => build_weekly_vwap(history, tz, atr_period).map(|a| AnchoredWindow {
            session: a.session,
            source: AnchorSource::WeeklyVwap(a.source),
            window: a.window,
        }),
    }
}

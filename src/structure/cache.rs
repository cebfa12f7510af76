//! Anchor level cache
//!
//! Holds one frozen level source per symbol, tagged with the session it was
//! built for. A request for a different session replaces the entry
//! wholesale. The cache is owned by its caller; there is no global state.

use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::info;

#[derive(Debug, Clone)]
struct CachedLevels<S> {
    session: NaiveDate,
    source: S,
}

#[derive(Debug, Clone)]
pub struct LevelCache<S> {
    entries: HashMap<String, CachedLevels<S>>,
}

impl<S> Default for LevelCache<S> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<S> LevelCache<S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached source for `symbol` while `session` matches, else build and store
    pub fn get_or_build<F>(&mut self, symbol: &str, session: NaiveDate, build: F) -> &S
    where
        F: FnOnce() -> S,
    {
        let stale = match self.entries.get(symbol) {
            Some(entry) if entry.session == session => false,
            Some(entry) => {
                info!("{} levels rolled over: {} -> {}", symbol, entry.session, session);
                true
            }
            None => true,
        };

        if stale {
            self.entries.insert(
                symbol.to_string(),
                CachedLevels {
                    session,
                    source: build(),
                },
            );
        }

        &self.entries[symbol].source
    }

    /// Session and source currently cached for `symbol`
    pub fn get(&self, symbol: &str) -> Option<(NaiveDate, &S)> {
        self.entries.get(symbol).map(|e| (e.session, &e.source))
    }

    pub fn invalidate(&mut self, symbol: &str) -> bool {
        self.entries.remove(symbol).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_frozen_within_session() {
        let mut cache = LevelCache::new();
        assert_eq!(*cache.get_or_build("NQ", date(2), || 1), 1);
        // Same session: the builder is not consulted
        assert_eq!(*cache.get_or_build("NQ", date(2), || 2), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_rollover_replaces_entry() {
        let mut cache = LevelCache::new();
        cache.get_or_build("NQ", date(2), || 1);
        assert_eq!(*cache.get_or_build("NQ", date(3), || 2), 2);
        assert_eq!(cache.get("NQ"), Some((date(3), &2)));
    }

    #[test]
    fn test_symbols_are_independent() {
        let mut cache = LevelCache::new();
        cache.get_or_build("NQ", date(2), || 1);
        cache.get_or_build("ES", date(2), || 5);
        assert_eq!(cache.len(), 2);
        assert!(cache.invalidate("NQ"));
        assert!(!cache.invalidate("NQ"));
        assert_eq!(cache.get("NQ"), None);
        assert!(!cache.is_empty());
    }
}

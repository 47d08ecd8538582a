//! Per-session counters.
//!
//! Passed explicitly through pool and synthesizer so nothing outlives a run.

use crate::artist::artist_key;
use serde::Serialize;
use std::collections::BTreeMap;

/// End-of-session summary of what happened and what went wrong.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionStats {
    /// Candidates fetched per (group, category) pool
    pub pool_size: usize,
    /// Reference slots in the session window
    pub event_count: usize,
    /// Assignments produced, filler included
    pub emitted: usize,
    /// Slots dropped because the previous track ran into the next hour
    pub overflow_dropped: usize,
    /// Slots whose day falls outside the session dates
    pub unplaced: usize,
    /// Slots filled with the MISSING placeholder
    pub dry_pool: usize,
    /// Candidates passed over for artist separation, per artist
    pub skipped: BTreeMap<String, u32>,
    /// Candidates discarded for a non-positive length, per artist
    pub invalid_length: BTreeMap<String, u32>,
}

impl SessionStats {
    pub fn record_skipped(&mut self, artist: &str) {
        *self.skipped.entry(artist_key(artist)).or_default() += 1;
    }

    pub fn record_invalid(&mut self, artist: &str) {
        *self.invalid_length.entry(artist_key(artist)).or_default() += 1;
    }

    #[must_use]
    pub fn skipped_total(&self) -> u32 {
        self.skipped.values().sum()
    }

    #[must_use]
    pub fn invalid_total(&self) -> u32 {
        self.invalid_length.values().sum()
    }

    /// Slots accounted for: emitted, overflowed or unplaced.
    #[must_use]
    pub fn accounted(&self) -> usize {
        self.emitted + self.overflow_dropped + self.unplaced
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_keyed_case_insensitively() {
        let mut stats = SessionStats::default();
        stats.record_skipped("Prince");
        stats.record_skipped("PRINCE");
        stats.record_invalid("");

        assert_eq!(stats.skipped.get("prince"), Some(&2));
        assert_eq!(stats.skipped_total(), 2);
        assert_eq!(stats.invalid_total(), 1);
        assert!(stats.invalid_length.contains_key(crate::artist::MISSING_ARTIST));
    }

    #[test]
    fn test_serializes_to_json() {
        let stats = SessionStats { pool_size: 7, dry_pool: 1, ..Default::default() };
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["pool_size"], 7);
        assert_eq!(json["dry_pool"], 1);
    }
}

//! # Artist Separation
//!
//! Every artist carries an "age": the number of scheduling units since it was
//! last scheduled. Each assignment ages every known artist by one and resets
//! the scheduled artist to one, so an artist becomes eligible again once
//! `separation` other assignments have gone by.
//!
//! Ages live in memory for the whole session and are written back once at
//! the end through an [`ArtistStore`], so the store always reflects the state
//! at the end of a complete run.

use anyhow::{Context, Result};
use log::{debug, trace};
use std::collections::HashMap;

/// Key used for tracks without an artist.
pub const MISSING_ARTIST: &str = "xx-missing-artist-xx";

/// Persistent artist → age mapping.
pub trait ArtistStore {
    /// Read every stored artist age.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable.
    fn load_ages(&self) -> Result<HashMap<String, u32>>;

    /// Insert or overwrite the age of every artist in `ages`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is unavailable or the write fails.
    fn save_ages(&mut self, ages: &HashMap<String, u32>) -> Result<()>;
}

/// Tracks how long ago each artist was scheduled.
#[derive(Debug, Clone)]
pub struct ArtistTracker {
    ages: HashMap<String, u32>,
    separation: u32,
}

/// Lower-case the name, mapping blank names to [`MISSING_ARTIST`].
#[must_use]
pub fn artist_key(artist: &str) -> String {
    let trimmed = artist.trim();
    if trimmed.is_empty() {
        MISSING_ARTIST.to_string()
    } else {
        trimmed.to_lowercase()
    }
}

impl ArtistTracker {
    #[must_use]
    pub fn new(separation: u32) -> Self {
        Self::with_ages(HashMap::new(), separation)
    }

    /// Start from previously stored ages. Keys are normalised and ages below
    /// one are raised to one.
    #[must_use]
    pub fn with_ages(ages: HashMap<String, u32>, separation: u32) -> Self {
        let mut normalised: HashMap<String, u32> = HashMap::with_capacity(ages.len());
        for (artist, age) in ages {
            let entry = normalised.entry(artist_key(&artist)).or_insert(age.max(1));
            // Two spellings of one artist: keep the most recent sighting.
            *entry = (*entry).min(age.max(1));
        }
        Self { ages: normalised, separation }
    }

    /// Seed the tracker from `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn load(store: &impl ArtistStore, separation: u32) -> Result<Self> {
        let ages = store.load_ages().context("Failed to read stored artist ages")?;
        debug!("Loaded {} artist ages, separation {separation}", ages.len());
        Ok(Self::with_ages(ages, separation))
    }

    /// Current age, or `None` for an artist never seen.
    #[must_use]
    pub fn age_of(&self, artist: &str) -> Option<u32> {
        self.ages.get(&artist_key(artist)).copied()
    }

    /// Whether `artist` may be scheduled now.
    ///
    /// An unknown artist is eligible and is registered with age one.
    pub fn ok_to_schedule(&mut self, artist: &str) -> bool {
        let key = artist_key(artist);
        match self.ages.get(&key) {
            Some(&age) => age >= self.separation,
            None => {
                trace!("First sighting of artist '{key}'");
                self.ages.insert(key, 1);
                true
            }
        }
    }

    /// Age every artist by one, then reset `artist` to one.
    ///
    /// Call exactly once per finalised assignment.
    pub fn bump(&mut self, artist: &str) {
        for age in self.ages.values_mut() {
            *age = age.saturating_add(1);
        }
        self.ages.insert(artist_key(artist), 1);
    }

    /// Write all ages to `store`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store rejects the write.
    pub fn persist(&self, store: &mut impl ArtistStore) -> Result<()> {
        store
            .save_ages(&self.ages)
            .with_context(|| format!("Failed to store {} artist ages", self.ages.len()))?;
        debug!("Stored {} artist ages", self.ages.len());
        Ok(())
    }

    #[must_use]
    pub fn ages(&self) -> &HashMap<String, u32> {
        &self.ages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.ages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct MemoryStore {
        ages: HashMap<String, u32>,
        saves: usize,
    }

    impl ArtistStore for MemoryStore {
        fn load_ages(&self) -> Result<HashMap<String, u32>> {
            Ok(self.ages.clone())
        }

        fn save_ages(&mut self, ages: &HashMap<String, u32>) -> Result<()> {
            self.ages.extend(ages.iter().map(|(k, v)| (k.clone(), *v)));
            self.saves += 1;
            Ok(())
        }
    }

    struct BrokenStore;

    impl ArtistStore for BrokenStore {
        fn load_ages(&self) -> Result<HashMap<String, u32>> {
            anyhow::bail!("store offline")
        }

        fn save_ages(&mut self, _ages: &HashMap<String, u32>) -> Result<()> {
            anyhow::bail!("store offline")
        }
    }

    #[test]
    fn test_unknown_artist_is_eligible_and_registered() {
        let mut tracker = ArtistTracker::new(200);
        assert_eq!(tracker.age_of("Nina Simone"), None);
        assert!(tracker.ok_to_schedule("Nina Simone"));
        assert_eq!(tracker.age_of("nina simone"), Some(1));
    }

    #[test]
    fn test_bump_resets_one_and_ages_the_rest() {
        let mut tracker = ArtistTracker::new(3);
        tracker.bump("A");
        tracker.bump("B");
        assert_eq!(tracker.age_of("A"), Some(2));
        assert_eq!(tracker.age_of("B"), Some(1));

        tracker.bump("a");
        assert_eq!(tracker.age_of("A"), Some(1));
        assert_eq!(tracker.age_of("B"), Some(2));
    }

    #[test]
    fn test_not_eligible_right_after_bump() {
        let mut tracker = ArtistTracker::new(2);
        tracker.bump("X");
        assert!(!tracker.ok_to_schedule("X"));

        tracker.bump("Y");
        assert!(tracker.ok_to_schedule("X"));
    }

    #[test]
    fn test_separation_of_one_allows_back_to_back() {
        let mut tracker = ArtistTracker::new(1);
        tracker.bump("X");
        assert!(tracker.ok_to_schedule("X"));
    }

    #[test]
    fn test_blank_artist_uses_sentinel() {
        let mut tracker = ArtistTracker::new(5);
        tracker.bump("   ");
        assert_eq!(tracker.age_of(""), Some(1));
        assert_eq!(tracker.age_of(MISSING_ARTIST), Some(1));
        assert!(!tracker.ages().contains_key(""));
    }

    #[test]
    fn test_with_ages_normalises_keys() {
        let stored = HashMap::from([
            ("The Band".to_string(), 40),
            ("the band".to_string(), 12),
            ("Zero".to_string(), 0),
        ]);
        let tracker = ArtistTracker::with_ages(stored, 10);
        assert_eq!(tracker.age_of("THE BAND"), Some(12));
        assert_eq!(tracker.age_of("zero"), Some(1));
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_load_and_persist_round_trip_through_store() {
        let mut store = MemoryStore {
            ages: HashMap::from([("old".to_string(), 300)]),
            ..Default::default()
        };
        let mut tracker = ArtistTracker::load(&store, 200).unwrap();
        assert!(tracker.ok_to_schedule("Old"));
        tracker.bump("new");
        tracker.persist(&mut store).unwrap();

        assert_eq!(store.saves, 1);
        assert_eq!(store.ages.get("old"), Some(&301));
        assert_eq!(store.ages.get("new"), Some(&1));
    }

    #[test]
    fn test_store_failures_propagate() {
        assert!(ArtistTracker::load(&BrokenStore, 10).is_err());
        let tracker = ArtistTracker::new(10);
        assert!(tracker.persist(&mut BrokenStore).is_err());
    }
}

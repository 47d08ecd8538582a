//! # Candidate Pool Manager
//!
//! For every (group, category) pair the schedule needs, a bounded list of
//! candidates is fetched once per session, least recently played first.
//! Synthesis then takes tracks from the front of these lists.
//!
//! Concrete-category pools deplete: a taken track is gone for the rest of the
//! session. `NoCode` pools recycle: a taken track stays where it is and comes
//! round again as soon as its artist is eligible.

use crate::artist::ArtistTracker;
use crate::catalog::{Candidate, TrackCatalog};
use crate::schedule::{Category, CodeUsage, ReferenceSchedule};
use crate::stats::SessionStats;
use anyhow::{Context, Result};
use log::{debug, info, trace, warn};
use serde::Serialize;
use std::collections::HashMap;

/// Identifies one pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PoolKey {
    pub group: String,
    pub category: Category,
}

impl PoolKey {
    #[must_use]
    pub fn new(group: &str, category: Category) -> Self {
        Self { group: group.to_lowercase(), category }
    }
}

/// (group, category) → ordered candidates, iterated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct KeyedPools {
    entries: Vec<(PoolKey, Vec<Candidate>)>,
    index: HashMap<PoolKey, usize>,
}

impl KeyedPools {
    /// List for `key`, created empty on first use.
    pub fn entry(&mut self, key: PoolKey) -> &mut Vec<Candidate> {
        let position = match self.index.get(&key) {
            Some(&position) => position,
            None => {
                self.entries.push((key.clone(), Vec::new()));
                self.index.insert(key, self.entries.len() - 1);
                self.entries.len() - 1
            }
        };
        &mut self.entries[position].1
    }

    #[must_use]
    pub fn get(&self, key: &PoolKey) -> Option<&[Candidate]> {
        self.index.get(key).map(|&position| self.entries[position].1.as_slice())
    }

    pub fn get_mut(&mut self, key: &PoolKey) -> Option<&mut Vec<Candidate>> {
        self.index.get(key).map(|&position| &mut self.entries[position].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PoolKey, &[Candidate])> {
        self.entries.iter().map(|(key, list)| (key, list.as_slice()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Serialize for KeyedPools {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;

        #[derive(Serialize)]
        struct Entry<'a> {
            group: &'a str,
            category: String,
            tracks: &'a [Candidate],
        }

        let mut seq = serializer.serialize_seq(Some(self.entries.len()))?;
        for (key, tracks) in &self.entries {
            seq.serialize_element(&Entry {
                group: &key.group,
                category: key.category.to_string(),
                tracks,
            })?;
        }
        seq.end()
    }
}

/// Candidates per pool for one session.
///
/// Large enough for the worst-case repeated demand on either half of a
/// dual-code requirement: the most used primary code plus the most used
/// secondary code. `event_count` is only reported.
#[must_use]
pub fn pool_size(event_count: usize, usage: &CodeUsage) -> usize {
    let size = usage.max_primary() + usage.max_secondary();
    debug!(
        "Pool size {size}: most used primary code {}, secondary {}, events {event_count}",
        usage.max_primary(),
        usage.max_secondary()
    );
    size
}

/// Active and used pools of one session.
#[derive(Debug, Clone, Default)]
pub struct PoolManager {
    pool_size: usize,
    active: KeyedPools,
    used: KeyedPools,
}

impl PoolManager {
    #[must_use]
    pub fn new(pool_size: usize) -> Self {
        Self { pool_size, ..Default::default() }
    }

    /// Fill a pool for every (group, category) the schedule requires.
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be queried.
    pub fn for_schedule(
        catalog: &impl TrackCatalog,
        schedule: &ReferenceSchedule,
        pool_size: usize,
    ) -> Result<Self> {
        let mut manager = Self::new(pool_size);
        for (group, categories) in schedule.categories() {
            for category in categories {
                manager.fill(catalog, group, category.clone())?;
            }
        }
        info!("Filled {} pools of up to {pool_size} candidates", manager.active.len());
        Ok(manager)
    }

    /// Fetch up to the pool size of candidates for (group, category).
    ///
    /// # Errors
    ///
    /// Returns an error if the catalog cannot be queried.
    pub fn fill(
        &mut self,
        catalog: &impl TrackCatalog,
        group: &str,
        category: Category,
    ) -> Result<()> {
        let candidates = catalog
            .candidates(group, &category, self.pool_size)
            .with_context(|| {
                format!("Failed to fill pool for group '{group}', category '{category}'")
            })?;
        debug!("Pool {group}/{category}: {} candidates", candidates.len());

        let key = PoolKey::new(group, category);
        self.used.entry(key.clone());
        self.active.entry(key).extend(candidates);
        Ok(())
    }

    /// Take the first usable candidate for (group, category).
    ///
    /// Candidates whose artist is inside the separation window are skipped;
    /// candidates with a non-positive length are discarded for good. Returns
    /// `None` when nothing usable is left. On success the track is recorded
    /// as used and its artist is bumped.
    pub fn take(
        &mut self,
        group: &str,
        category: &Category,
        tracker: &mut ArtistTracker,
        stats: &mut SessionStats,
    ) -> Option<Candidate> {
        let key = PoolKey::new(group, category.clone());

        let Some(pool) = self.active.get_mut(&key) else {
            warn!("No pool for group '{group}', category '{category}'");
            return None;
        };
        if pool.is_empty() {
            info!("Pool for group '{group}', category '{category}' is empty");
            return None;
        }

        let mut index = 0;
        let mut chosen = None;
        while index < pool.len() {
            let candidate = &pool[index];
            trace!("Pool {group}/{category}: index {index}, cart {}", candidate.id);

            if !tracker.ok_to_schedule(&candidate.artist) {
                stats.record_skipped(&candidate.artist);
                index += 1;
                continue;
            }

            if candidate.duration_ms <= 0 {
                let invalid = pool.remove(index);
                warn!(
                    "Discarding cart {} ('{}'): invalid length {}",
                    invalid.id, invalid.title, invalid.duration_ms
                );
                stats.record_invalid(&invalid.artist);
                continue;
            }

            chosen = Some(if category.is_no_code() {
                pool[index].clone()
            } else {
                pool.remove(index)
            });
            break;
        }

        let Some(candidate) = chosen else {
            info!("No eligible candidate in pool {group}/{category} ({} left)", pool.len());
            return None;
        };

        debug!(
            "Selected cart {} '{}' by '{}', {} ms",
            candidate.id, candidate.title, candidate.artist, candidate.duration_ms
        );
        self.used.entry(key).push(candidate.clone());
        tracker.bump(&candidate.artist);
        Some(candidate)
    }

    #[must_use]
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Candidates still in the pool for (group, category).
    #[must_use]
    pub fn remaining(&self, group: &str, category: &Category) -> usize {
        self.active
            .get(&PoolKey::new(group, category.clone()))
            .map_or(0, <[Candidate]>::len)
    }

    #[must_use]
    pub fn active(&self) -> &KeyedPools {
        &self.active
    }

    /// Tracks actually assigned this session, for diagnostics.
    #[must_use]
    pub fn used(&self) -> &KeyedPools {
        &self.used
    }
}

//! Candidate tracks and the catalog they come from.

use crate::schedule::Category;
use anyhow::Result;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A schedulable track as seen by the pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Cart number
    pub id: u32,
    /// Artist as stored; matched case-insensitively
    pub artist: String,
    pub title: String,
    /// Length of the audio; non-positive values are invalid
    pub duration_ms: i64,
    /// `None` for tracks that have never aired
    pub last_played_at: Option<NaiveDateTime>,
}

/// Read-only source of candidate tracks.
pub trait TrackCatalog {
    /// Up to `limit` tracks of `group` with positive length, restricted to
    /// `category` unless it is `NoCode`, least recently played first.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be queried.
    fn candidates(&self, group: &str, category: &Category, limit: usize) -> Result<Vec<Candidate>>;
}

/// Catalog held in memory. Handy for tests, benchmarks and dry runs.
#[derive(Debug, Clone, Default)]
pub struct MemoryCatalog {
    entries: Vec<CatalogEntry>,
}

#[derive(Debug, Clone)]
struct CatalogEntry {
    group: String,
    codes: Vec<String>,
    candidate: Candidate,
}

impl MemoryCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, group: &str, codes: &[&str], candidate: Candidate) {
        self.entries.push(CatalogEntry {
            group: group.to_lowercase(),
            codes: codes.iter().map(|code| (*code).to_string()).collect(),
            candidate,
        });
    }

    #[must_use]
    pub fn with(mut self, group: &str, codes: &[&str], candidate: Candidate) -> Self {
        self.add(group, codes, candidate);
        self
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

impl TrackCatalog for MemoryCatalog {
    fn candidates(&self, group: &str, category: &Category, limit: usize) -> Result<Vec<Candidate>> {
        let group = group.to_lowercase();
        let mut matching: Vec<&Candidate> = self
            .entries
            .iter()
            .filter(|entry| entry.group == group)
            .filter(|entry| entry.candidate.duration_ms > 0)
            .filter(|entry| match category.code() {
                None => true,
                Some(code) => entry.codes.iter().any(|c| c == code),
            })
            .map(|entry| &entry.candidate)
            .collect();

        // Never-played tracks first, like NULLs in an ascending SQL sort.
        matching.sort_by_key(|candidate| candidate.last_played_at);

        Ok(matching.into_iter().take(limit).cloned().collect())
    }
}

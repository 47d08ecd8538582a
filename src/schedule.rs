//! # Reference Schedule Model
//!
//! The reference service's clocks say, hour by hour, which slots need a
//! track: when the slot starts within its hour, how long it nominally runs,
//! which group the track must come from and which scheduler codes it must
//! carry. This module turns those rows into ordered runs of [`Slot`]s for a
//! [`SessionWindow`], and counts code usage in the same pass so the pool size
//! can be computed without walking the schedule again.

use crate::clock::{SessionWindow, WeekHour};
use anyhow::{Context, Result};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::RangeInclusive;

/// Name used for slots that carry no scheduler code.
pub const NO_CODE: &str = "NoCode";

/// Scheduler code constraint for a pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    /// Any track of the group will do
    NoCode,
    /// Track must carry this scheduler code
    Code(String),
}

impl Category {
    /// Blank codes mean "unconstrained".
    #[must_use]
    pub fn from_code(raw: &str) -> Self {
        let code = raw.trim();
        if code.is_empty() || code == NO_CODE {
            Self::NoCode
        } else {
            Self::Code(code.to_string())
        }
    }

    #[must_use]
    pub fn is_no_code(&self) -> bool {
        matches!(self, Self::NoCode)
    }

    /// Code to filter the catalog with, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::NoCode => None,
            Self::Code(code) => Some(code),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCode => f.write_str(NO_CODE),
            Self::Code(code) => f.write_str(code),
        }
    }
}

/// The "have code" / "and code" pair of an event, kept as written.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SchedCodes {
    pub primary: String,
    pub secondary: String,
}

impl SchedCodes {
    #[must_use]
    pub fn new(primary: impl Into<String>, secondary: impl Into<String>) -> Self {
        Self {
            primary: primary.into().trim().to_string(),
            secondary: secondary.into().trim().to_string(),
        }
    }

    /// Category the slot is filled from. Only the primary code selects.
    #[must_use]
    pub fn primary_category(&self) -> Category {
        Category::from_code(&self.primary)
    }

    /// Up to two distinct categories; an all-empty pair is just `NoCode`.
    #[must_use]
    pub fn required(&self) -> Vec<Category> {
        let mut required = vec![self.primary_category()];
        if !self.secondary.is_empty() {
            let secondary = Category::from_code(&self.secondary);
            if !required.contains(&secondary) {
                required.push(secondary);
            }
        }
        required
    }
}

impl fmt::Display for SchedCodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}|{}", self.primary, self.secondary)
    }
}

/// One position in the reference timeline that needs exactly one track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub weekhour: WeekHour,
    pub start_offset_ms: i64,
    pub duration_ms: i64,
    pub group: String,
    pub codes: SchedCodes,
}

/// Raw row as delivered by a [`ScheduleSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotRow {
    pub hour: i64,
    pub start_time_ms: i64,
    pub length_ms: i64,
    pub group: String,
    pub code1: String,
    pub code2: String,
}

impl SlotRow {
    fn into_slot(self) -> Result<Slot> {
        let weekhour = WeekHour::new(self.hour)
            .with_context(|| format!("Reference schedule row has a bad hour: {self:?}"))?;
        Ok(Slot {
            weekhour,
            start_offset_ms: self.start_time_ms,
            duration_ms: self.length_ms,
            group: self.group.to_lowercase(),
            codes: SchedCodes::new(self.code1, self.code2),
        })
    }
}

/// Where reference schedule rows come from.
pub trait ScheduleSource {
    /// Rows of `service` whose hour lies in `hours` and whose group is one
    /// of `groups` (lower-case), ordered by hour then start time.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be queried.
    fn slot_rows(
        &self,
        service: &str,
        groups: &[String],
        hours: RangeInclusive<u8>,
    ) -> Result<Vec<SlotRow>>;
}

/// How often each raw code string appears, per half of the code pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeUsage {
    primary: HashMap<String, usize>,
    secondary: HashMap<String, usize>,
}

impl CodeUsage {
    pub fn record(&mut self, codes: &SchedCodes) {
        *self.primary.entry(codes.primary.clone()).or_default() += 1;
        *self.secondary.entry(codes.secondary.clone()).or_default() += 1;
    }

    #[must_use]
    pub fn max_primary(&self) -> usize {
        self.primary.values().copied().max().unwrap_or(0)
    }

    #[must_use]
    pub fn max_secondary(&self) -> usize {
        self.secondary.values().copied().max().unwrap_or(0)
    }

    #[must_use]
    pub fn primary_count(&self, code: &str) -> usize {
        self.primary.get(code).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn secondary_count(&self, code: &str) -> usize {
        self.secondary.get(code).copied().unwrap_or(0)
    }
}

/// Slots of one hour, in start order.
#[derive(Debug, Clone)]
pub struct HourPlan<'a> {
    pub weekhour: WeekHour,
    pub slots: Vec<&'a Slot>,
}

impl HourPlan<'_> {
    /// Sum of the nominal slot lengths.
    #[must_use]
    pub fn planned_ms(&self) -> i64 {
        self.slots.iter().map(|slot| slot.duration_ms).sum()
    }
}

/// Hours of one day of the week, in chronological order.
#[derive(Debug, Clone)]
pub struct DayPlan<'a> {
    /// Day of week, 0 = Monday
    pub day: u8,
    pub hours: Vec<HourPlan<'a>>,
}

impl DayPlan<'_> {
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.hours.iter().map(|hour| hour.slots.len()).sum()
    }
}

/// Ordered slots for a session window.
///
/// A window that crosses Sunday→Monday yields two runs. Each run is ordered
/// by week hour then start offset, and the runs are kept in chronological
/// order, not week-hour order.
#[derive(Debug, Clone)]
pub struct ReferenceSchedule {
    window: SessionWindow,
    runs: Vec<Vec<Slot>>,
    usage: CodeUsage,
    categories: Vec<(String, Vec<Category>)>,
}

impl ReferenceSchedule {
    /// Query `source` for every range of `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if the source fails or delivers an invalid hour.
    pub fn load(
        source: &impl ScheduleSource,
        service: &str,
        groups: &[String],
        window: SessionWindow,
    ) -> Result<Self> {
        let mut runs = Vec::new();
        for range in window.ranges() {
            trace!("Loading reference rows for {service}, hours {range:?}");
            let rows = source
                .slot_rows(service, groups, range.clone())
                .with_context(|| {
                    format!("Failed to load reference schedule for '{service}' hours {range:?}")
                })?;
            let slots = rows
                .into_iter()
                .map(SlotRow::into_slot)
                .collect::<Result<Vec<_>>>()?;
            debug!("{} slots in hours {range:?}", slots.len());
            runs.push(slots);
        }

        Ok(Self::from_runs(window, groups, runs))
    }

    /// Build from already-loaded runs, aggregating in one pass.
    #[must_use]
    pub fn from_runs(window: SessionWindow, groups: &[String], mut runs: Vec<Vec<Slot>>) -> Self {
        let mut usage = CodeUsage::default();
        let mut categories: Vec<(String, Vec<Category>)> = groups
            .iter()
            .map(|group| (group.to_lowercase(), Vec::new()))
            .collect();

        for run in &mut runs {
            run.sort_by_key(|slot| (slot.weekhour, slot.start_offset_ms));

            for slot in run.iter() {
                usage.record(&slot.codes);

                let position = match categories.iter().position(|(group, _)| *group == slot.group) {
                    Some(position) => position,
                    None => {
                        categories.push((slot.group.clone(), Vec::new()));
                        categories.len() - 1
                    }
                };
                let known = &mut categories[position].1;
                for category in slot.codes.required() {
                    if !known.contains(&category) {
                        known.push(category);
                    }
                }
            }
        }

        Self { window, runs, usage, categories }
    }

    #[must_use]
    pub fn window(&self) -> SessionWindow {
        self.window
    }

    #[must_use]
    pub fn runs(&self) -> &[Vec<Slot>] {
        &self.runs
    }

    /// All slots in chronological order.
    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.runs.iter().flatten()
    }

    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.runs.iter().map(Vec::len).sum()
    }

    #[must_use]
    pub fn usage(&self) -> &CodeUsage {
        &self.usage
    }

    /// Groups with the categories their slots require, in discovery order.
    pub fn categories(&self) -> impl Iterator<Item = (&str, &[Category])> {
        self.categories
            .iter()
            .map(|(group, categories)| (group.as_str(), categories.as_slice()))
    }

    /// Day → Hour → Slot view of the schedule.
    #[must_use]
    pub fn days(&self) -> Vec<DayPlan<'_>> {
        let mut days: Vec<DayPlan<'_>> = Vec::new();

        for slot in self.slots() {
            let day = slot.weekhour.day();
            if days.last().map_or(true, |plan| plan.day != day) {
                days.push(DayPlan { day, hours: Vec::new() });
            }
            let Some(plan) = days.last_mut() else { continue };

            if plan.hours.last().map_or(true, |hour| hour.weekhour != slot.weekhour) {
                plan.hours.push(HourPlan { weekhour: slot.weekhour, slots: Vec::new() });
            }
            if let Some(hour) = plan.hours.last_mut() {
                hour.slots.push(slot);
            }
        }

        days
    }
}

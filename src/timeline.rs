//! # Timeline Synthesis
//!
//! Walks the reference slots in chronological order and asks the pool for a
//! track per slot. The first slot of an hour starts at its clock offset; the
//! slots after it are packed back to back behind the previous track. Once a
//! track runs into the next hour, the remaining slots of its hour are dropped.
//!
//! The walk is a single forward fold with no backtracking: a dropped slot or
//! a filler assignment is final.

use crate::artist::ArtistTracker;
use crate::catalog::Candidate;
use crate::clock::{format_hms, SessionWindow, WeekHour};
use crate::pool::PoolManager;
use crate::schedule::{ReferenceSchedule, Slot};
use crate::stats::SessionStats;
use chrono::NaiveDate;
use log::{debug, info, trace, warn};
use serde::Serialize;

/// Title of the placeholder used when a pool runs dry.
pub const FILLER_TITLE: &str = "MISSING";

/// One timed track in a day's log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    /// Day of week, 0 = Monday
    pub day: u8,
    pub weekhour: WeekHour,
    /// Milliseconds since local midnight
    pub start_time_ms: i64,
    pub track_id: u32,
    pub title: String,
    pub duration_ms: i64,
}

impl Assignment {
    fn from_candidate(slot: &Slot, start_time_ms: i64, candidate: &Candidate) -> Self {
        Self {
            day: slot.weekhour.day(),
            weekhour: slot.weekhour,
            start_time_ms,
            track_id: candidate.id,
            title: candidate.title.clone(),
            duration_ms: candidate.duration_ms,
        }
    }

    fn filler(slot: &Slot, start_time_ms: i64) -> Self {
        Self {
            day: slot.weekhour.day(),
            weekhour: slot.weekhour,
            start_time_ms,
            track_id: 0,
            title: FILLER_TITLE.to_string(),
            duration_ms: 0,
        }
    }

    #[must_use]
    pub fn is_filler(&self) -> bool {
        self.track_id == 0 && self.title == FILLER_TITLE
    }
}

/// Assignments of one calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayLog {
    pub date: NaiveDate,
    pub assignments: Vec<Assignment>,
}

/// Per-date assignment lists in session order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Timeline {
    days: Vec<DayLog>,
}

impl Timeline {
    #[must_use]
    pub fn new(dates: &[NaiveDate]) -> Self {
        Self {
            days: dates
                .iter()
                .map(|&date| DayLog { date, assignments: Vec::new() })
                .collect(),
        }
    }

    #[must_use]
    pub fn days(&self) -> &[DayLog] {
        &self.days
    }

    #[must_use]
    pub fn get(&self, date: NaiveDate) -> Option<&[Assignment]> {
        self.days
            .iter()
            .find(|day| day.date == date)
            .map(|day| day.assignments.as_slice())
    }

    fn day_mut(&mut self, index: usize) -> Option<&mut DayLog> {
        self.days.get_mut(index)
    }

    /// Total assignments across all days.
    #[must_use]
    pub fn len(&self) -> usize {
        self.days.iter().map(|day| day.assignments.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Where the previous assignment of the current run ended.
#[derive(Debug, Clone, Copy)]
struct Cursor {
    weekhour: Option<WeekHour>,
    start_time_ms: i64,
    duration_ms: i64,
}

impl Cursor {
    const START: Self = Self { weekhour: None, start_time_ms: 0, duration_ms: 0 };

    fn is_new_hour(&self, hour: WeekHour) -> bool {
        self.weekhour.map_or(true, |previous| hour > previous)
    }

    fn end_ms(&self) -> i64 {
        self.start_time_ms + self.duration_ms
    }
}

/// Stateful fold over the reference schedule.
pub struct Synthesizer<'a> {
    pools: &'a mut PoolManager,
    tracker: &'a mut ArtistTracker,
    stats: &'a mut SessionStats,
}

impl<'a> Synthesizer<'a> {
    pub fn new(
        pools: &'a mut PoolManager,
        tracker: &'a mut ArtistTracker,
        stats: &'a mut SessionStats,
    ) -> Self {
        Self { pools, tracker, stats }
    }

    /// Produce the timeline for `dates`, one entry per session day.
    pub fn run(&mut self, schedule: &ReferenceSchedule, dates: &[NaiveDate]) -> Timeline {
        let window = schedule.window();
        let mut timeline = Timeline::new(dates);

        for (number, run) in schedule.runs().iter().enumerate() {
            debug!("Synthesizing run {number}: {} slots", run.len());
            let mut previous = Cursor::START;
            for slot in run {
                self.place(slot, window, &mut previous, &mut timeline);
            }
        }

        info!(
            "Synthesized {} assignments ({} filler, {} dropped for overflow)",
            self.stats.emitted, self.stats.dry_pool, self.stats.overflow_dropped
        );
        timeline
    }

    fn place(
        &mut self,
        slot: &Slot,
        window: SessionWindow,
        previous: &mut Cursor,
        timeline: &mut Timeline,
    ) {
        let this_hour_ms = slot.weekhour.hour_start_ms();
        let next_hour_ms = slot.weekhour.next_hour_ms();

        let start_time_ms = if previous.is_new_hour(slot.weekhour) {
            previous.start_time_ms = 0;
            trace!(
                "New hour {}: clock start {}",
                slot.weekhour,
                format_hms(this_hour_ms + slot.start_offset_ms)
            );
            this_hour_ms + slot.start_offset_ms
        } else {
            previous.end_ms()
        };

        if previous.end_ms() >= next_hour_ms {
            warn!(
                "At {}, hour {} overfilled by a {} ms track; dropping slot",
                format_hms(start_time_ms),
                slot.weekhour,
                previous.duration_ms
            );
            self.stats.overflow_dropped += 1;
            return;
        }

        let Some(day) = timeline.day_mut(window.day_offset(slot.weekhour)) else {
            warn!("Slot at {} falls outside the session dates; skipping", slot.weekhour);
            self.stats.unplaced += 1;
            return;
        };

        let category = slot.codes.primary_category();
        let assignment = match self.pools.take(&slot.group, &category, self.tracker, self.stats) {
            Some(candidate) => Assignment::from_candidate(slot, start_time_ms, &candidate),
            None => {
                warn!(
                    "Pool {}/{category} is dry at {} {}; using filler",
                    slot.group,
                    day.date,
                    format_hms(start_time_ms)
                );
                self.stats.dry_pool += 1;
                Assignment::filler(slot, start_time_ms)
            }
        };

        *previous = Cursor {
            weekhour: Some(slot.weekhour),
            start_time_ms,
            duration_ms: assignment.duration_ms,
        };
        day.assignments.push(assignment);
        self.stats.emitted += 1;
    }
}

/// Convenience wrapper around [`Synthesizer::run`].
pub fn synthesize(
    schedule: &ReferenceSchedule,
    dates: &[NaiveDate],
    pools: &mut PoolManager,
    tracker: &mut ArtistTracker,
    stats: &mut SessionStats,
) -> Timeline {
    Synthesizer::new(pools, tracker, stats).run(schedule, dates)
}

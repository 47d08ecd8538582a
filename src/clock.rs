//! # Week-Hour Clock Arithmetic
//!
//! Broadcast clocks are assigned to a repeating grid of 168 hours. Hour 0 is
//! Monday 00:00 local time and hour 167 is Sunday 23:00. A scheduling session
//! covers one or more whole days of that grid, which may cross the
//! Sunday→Monday boundary.
//!
//! ```
//! use chrono::NaiveDate;
//! use gridfill::clock::SessionWindow;
//!
//! // Sunday plus the following Monday.
//! let sunday = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
//! let window = SessionWindow::for_dates(sunday, 2);
//! assert!(window.wraps());
//! assert_eq!(window.ranges(), vec![144..=167, 0..=23]);
//! ```

use crate::error::ScheduleError;
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::RangeInclusive;

pub const ONE_HOUR_MS: i64 = 60 * 60 * 1000;
pub const ONE_DAY_MS: i64 = 24 * ONE_HOUR_MS;
pub const HOURS_PER_DAY: u8 = 24;
pub const HOURS_PER_WEEK: u8 = 168;
pub const DAYS_PER_WEEK: u8 = 7;

const DAY_NAMES: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

/// Position in the weekly clock grid, 0..=167.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct WeekHour(u8);

impl WeekHour {
    pub const MONDAY_MIDNIGHT: WeekHour = WeekHour(0);
    pub const LAST: WeekHour = WeekHour(HOURS_PER_WEEK - 1);

    /// Validated constructor for values read from schedule data.
    pub fn new(hour: i64) -> Result<Self, ScheduleError> {
        match u8::try_from(hour) {
            Ok(h) if h < HOURS_PER_WEEK => Ok(Self(h)),
            _ => Err(ScheduleError::InvalidWeekHour(hour)),
        }
    }

    /// First week hour of the weekday `date` falls on.
    #[must_use]
    pub fn first_of(date: NaiveDate) -> Self {
        // number_from_monday is 1..=7
        let weekday = date.weekday().number_from_monday() as u8 - 1;
        Self(weekday * HOURS_PER_DAY)
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }

    /// Day of week, 0 = Monday.
    #[must_use]
    pub const fn day(self) -> u8 {
        self.0 / HOURS_PER_DAY
    }

    #[must_use]
    pub const fn hour_of_day(self) -> u8 {
        self.0 % HOURS_PER_DAY
    }

    /// Milliseconds from local midnight to the start of this hour.
    #[must_use]
    pub fn hour_start_ms(self) -> i64 {
        i64::from(self.hour_of_day()) * ONE_HOUR_MS
    }

    /// Boundary the previous track must not reach.
    ///
    /// Taken modulo 25 hours so that hour 23 yields 24:00 instead of
    /// wrapping to midnight of the same day.
    #[must_use]
    pub fn next_hour_ms(self) -> i64 {
        (self.hour_start_ms() + ONE_HOUR_MS) % (25 * ONE_HOUR_MS)
    }

    #[must_use]
    pub fn day_name(self) -> &'static str {
        DAY_NAMES[usize::from(self.day())]
    }
}

impl TryFrom<i64> for WeekHour {
    type Error = ScheduleError;

    fn try_from(hour: i64) -> Result<Self, Self::Error> {
        Self::new(hour)
    }
}

impl From<WeekHour> for u8 {
    fn from(hour: WeekHour) -> Self {
        hour.0
    }
}

impl fmt::Display for WeekHour {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}:00 ({})", self.day_name(), self.hour_of_day(), self.0)
    }
}

/// Span of the week grid covered by one session.
///
/// `first_hour > last_hour` means the session crosses Sunday→Monday and is
/// really the two ranges `[first_hour, 167]` and `[0, last_hour]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionWindow {
    pub first_hour: WeekHour,
    pub last_hour: WeekHour,
}

impl SessionWindow {
    #[must_use]
    pub const fn new(first_hour: WeekHour, last_hour: WeekHour) -> Self {
        Self { first_hour, last_hour }
    }

    /// Whole-day window starting on `start` and lasting `days` days.
    ///
    /// `days` is expected to be 1..=7; larger values wrap around the grid.
    #[must_use]
    pub fn for_dates(start: NaiveDate, days: u8) -> Self {
        let first = WeekHour::first_of(start);
        let span = u16::from(days.max(1) - 1) * u16::from(HOURS_PER_DAY) + 23;
        let last = (u16::from(first.get()) + span) % u16::from(HOURS_PER_WEEK);
        // last < 168 after the modulus
        Self::new(first, WeekHour(last as u8))
    }

    #[must_use]
    pub fn wraps(&self) -> bool {
        self.first_hour > self.last_hour
    }

    /// Week-hour ranges in chronological order.
    #[must_use]
    pub fn ranges(&self) -> Vec<RangeInclusive<u8>> {
        if self.wraps() {
            vec![
                self.first_hour.get()..=WeekHour::LAST.get(),
                WeekHour::MONDAY_MIDNIGHT.get()..=self.last_hour.get(),
            ]
        } else {
            vec![self.first_hour.get()..=self.last_hour.get()]
        }
    }

    #[must_use]
    pub fn contains(&self, hour: WeekHour) -> bool {
        self.ranges().iter().any(|range| range.contains(&hour.get()))
    }

    /// Days elapsed since the window's first day, counting across the
    /// Sunday→Monday boundary.
    #[must_use]
    pub fn day_offset(&self, hour: WeekHour) -> usize {
        let offset = (i16::from(hour.day()) - i16::from(self.first_hour.day()))
            .rem_euclid(i16::from(DAYS_PER_WEEK));
        offset as usize
    }
}

impl fmt::Display for SessionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} .. {}", self.first_hour, self.last_hour)
    }
}

/// Calendar dates of a session, one per day.
#[must_use]
pub fn session_dates(start: NaiveDate, days: u8) -> Vec<NaiveDate> {
    (0..u64::from(days))
        .filter_map(|offset| start.checked_add_days(Days::new(offset)))
        .collect()
}

/// Parse a start date given as `YYYY-MM-DD` or a close variant.
///
/// Any single non-digit separator is accepted (`2026/10/19`, `2026.10.19`),
/// as is the compact `20261019`.
pub fn parse_start_date(input: &str) -> Result<NaiveDate, ScheduleError> {
    let invalid = || ScheduleError::InvalidDate(input.to_string());

    let groups: Vec<&str> = input
        .trim()
        .split(|c: char| !c.is_ascii_digit())
        .filter(|part| !part.is_empty())
        .collect();

    let (year, month, day) = match groups.as_slice() {
        [year, month, day] if year.len() == 4 && month.len() <= 2 && day.len() <= 2 => {
            (*year, *month, *day)
        }
        [compact] if compact.len() == 8 => (&compact[0..4], &compact[4..6], &compact[6..8]),
        _ => return Err(invalid()),
    };

    let year: i32 = year.parse().map_err(|_| invalid())?;
    let month: u32 = month.parse().map_err(|_| invalid())?;
    let day: u32 = day.parse().map_err(|_| invalid())?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(invalid)
}

/// Render milliseconds as zero-filled `HH:MM:SS`.
///
/// Hours wrap at 24 and sub-second remainders are dropped. Negative input is
/// treated as zero.
#[must_use]
pub fn format_hms(ms: i64) -> String {
    let total_seconds = ms.max(0) / 1000;
    let hours = total_seconds / 3600 % 24;
    let minutes = total_seconds / 60 % 60;
    let seconds = total_seconds % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

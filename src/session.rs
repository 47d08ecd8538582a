//! One scheduling session from parameters to import files.
//!
//! [`run_session`] is storage-agnostic and only produces a [`SessionReport`];
//! [`schedule_service`] wires it to the `SQLite` databases and writes files.

use crate::artist::{ArtistStore, ArtistTracker};
use crate::catalog::TrackCatalog;
use crate::clock::format_hms;
use crate::config::{RuntimeConfig, SessionConfig};
use crate::db::{ArtistDb, LibraryDb};
use crate::emitter::{write_timeline, OutputTarget, WriteReport};
use crate::error::ScheduleError;
use crate::pool::{pool_size, PoolManager};
use crate::schedule::{ReferenceSchedule, ScheduleSource};
use crate::stats::SessionStats;
use crate::timeline::{synthesize, Timeline};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use log::{info, warn};

/// Everything a finished session produced.
#[derive(Debug)]
pub struct SessionReport {
    pub timeline: Timeline,
    pub stats: SessionStats,
    pub pools: PoolManager,
}

/// Schedule one session against `library` and persist artist ages to
/// `artists`.
///
/// Artist ages are loaded before anything else and written back after the
/// timeline is complete. A store failure at either end aborts the session.
///
/// # Errors
///
/// Returns an error if the parameters are invalid or any backing store
/// fails.
pub fn run_session<L>(
    config: &SessionConfig,
    library: &L,
    artists: &mut impl ArtistStore,
) -> Result<SessionReport>
where
    L: TrackCatalog + ScheduleSource,
{
    config.validate()?;

    let window = config.window();
    let dates = config.dates();
    info!(
        "Scheduling {} for {} day(s) from {} (week hours {window})",
        config.implementation_service, config.days, config.start_date
    );

    let mut tracker = ArtistTracker::load(artists, config.separation)?;

    let schedule =
        ReferenceSchedule::load(library, &config.reference_service, &config.groups, window)?;
    if schedule.slot_count() == 0 {
        warn!(
            "Reference service '{}' has no slots for groups {:?} in week hours {window}",
            config.reference_service, config.groups
        );
    }

    let mut stats = SessionStats {
        event_count: schedule.slot_count(),
        pool_size: pool_size(schedule.slot_count(), schedule.usage()),
        ..Default::default()
    };

    let mut pools = PoolManager::for_schedule(library, &schedule, stats.pool_size)?;
    let timeline = synthesize(&schedule, &dates, &mut pools, &mut tracker, &mut stats);

    tracker.persist(artists)?;
    info!(
        "Session done: {} of {} slots emitted, {} separation skips, {} invalid lengths",
        stats.emitted,
        stats.event_count,
        stats.skipped_total(),
        stats.invalid_total()
    );

    Ok(SessionReport { timeline, stats, pools })
}

/// Where the import files of `config` go: the explicit output directory, or
/// else the import path of the implementation service.
///
/// # Errors
///
/// Returns [`ScheduleError::NoImportPath`] when neither is available.
pub fn output_target(config: &SessionConfig, library: &LibraryDb) -> Result<OutputTarget> {
    if let Some(dir) = &config.output_dir {
        return OutputTarget::directory(dir);
    }
    match library.import_path(&config.implementation_service)? {
        Some(template) => Ok(OutputTarget::Template(template)),
        None => Err(ScheduleError::NoImportPath(config.implementation_service.clone()).into()),
    }
}

/// Run a full session against the configured databases and write one
/// import file per day.
///
/// # Errors
///
/// Returns an error for invalid parameters, an unknown reference service,
/// a missing output location or any database failure. File write failures
/// are reported in the returned [`WriteReport`] instead.
pub fn schedule_service(
    config: &SessionConfig,
    runtime: &RuntimeConfig,
) -> Result<(SessionReport, WriteReport)> {
    config.validate()?;

    let library = LibraryDb::open(&runtime.library_db).with_context(|| {
        format!("Failed to open library database {}", runtime.library_db.display())
    })?;
    if !library.has_clocks(&config.reference_service)? {
        return Err(ScheduleError::UnknownService(config.reference_service.clone()).into());
    }
    let target = output_target(config, &library)?;

    let mut artists = ArtistDb::open(&runtime.artist_db).with_context(|| {
        format!("Failed to open artist database {}", runtime.artist_db.display())
    })?;

    let report = run_session(config, &library, &mut artists)?;
    let written = write_timeline(&report.timeline, &target);
    Ok((report, written))
}

/// Load the reference schedule `config` would fill, without scheduling.
///
/// # Errors
///
/// Returns an error for invalid parameters, an unknown reference service or
/// a database failure.
pub fn load_plan(config: &SessionConfig, library: &LibraryDb) -> Result<ReferenceSchedule> {
    config.validate()?;
    if !library.has_clocks(&config.reference_service)? {
        return Err(ScheduleError::UnknownService(config.reference_service.clone()).into());
    }
    ReferenceSchedule::load(library, &config.reference_service, &config.groups, config.window())
}

/// Human-readable Day → Hour → Slot listing.
#[must_use]
pub fn render_plan(schedule: &ReferenceSchedule, dates: &[NaiveDate]) -> String {
    let window = schedule.window();
    let mut out = String::new();

    for day in schedule.days() {
        let Some(first) = day.hours.first() else { continue };
        let date = dates
            .get(window.day_offset(first.weekhour))
            .map_or_else(|| "----------".to_string(), ToString::to_string);
        out.push_str(&format!(
            "{date} {} ({} slots)\n",
            first.weekhour.day_name(),
            day.slot_count()
        ));

        for hour in &day.hours {
            out.push_str(&format!(
                "  hour {:3}  {} slots, {} planned\n",
                hour.weekhour.get(),
                hour.slots.len(),
                format_hms(hour.planned_ms())
            ));
            for slot in &hour.slots {
                out.push_str(&format!(
                    "    {}  {}  {:<12} {}\n",
                    format_hms(slot.weekhour.hour_start_ms() + slot.start_offset_ms),
                    format_hms(slot.duration_ms),
                    slot.group,
                    slot.codes
                ));
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Candidate, MemoryCatalog};
    use crate::schedule::SlotRow;
    use std::collections::HashMap;
    use std::ops::RangeInclusive;

    /// Catalog plus a reference service with one clock line per listed hour.
    struct Library {
        catalog: MemoryCatalog,
        rows: Vec<SlotRow>,
    }

    impl TrackCatalog for Library {
        fn candidates(
            &self,
            group: &str,
            category: &crate::schedule::Category,
            limit: usize,
        ) -> Result<Vec<Candidate>> {
            self.catalog.candidates(group, category, limit)
        }
    }

    impl ScheduleSource for Library {
        fn slot_rows(
            &self,
            _service: &str,
            groups: &[String],
            hours: RangeInclusive<u8>,
        ) -> Result<Vec<SlotRow>> {
            Ok(self
                .rows
                .iter()
                .filter(|row| hours.contains(&(row.hour as u8)) && groups.contains(&row.group))
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct Ages(HashMap<String, u32>);

    impl ArtistStore for Ages {
        fn load_ages(&self) -> Result<HashMap<String, u32>> {
            Ok(self.0.clone())
        }

        fn save_ages(&mut self, ages: &HashMap<String, u32>) -> Result<()> {
            self.0.extend(ages.iter().map(|(k, v)| (k.clone(), *v)));
            Ok(())
        }
    }

    fn row(hour: i64, start_time_ms: i64) -> SlotRow {
        SlotRow {
            hour,
            start_time_ms,
            length_ms: 240_000,
            group: "music".to_string(),
            code1: String::new(),
            code2: String::new(),
        }
    }

    fn library(hours: &[i64]) -> Library {
        let mut catalog = MemoryCatalog::new();
        for id in 1..=6 {
            catalog.add(
                "music",
                &[],
                Candidate {
                    id,
                    artist: format!("artist {id}"),
                    title: format!("song {id}"),
                    duration_ms: 200_000,
                    last_played_at: None,
                },
            );
        }
        Library { catalog, rows: hours.iter().map(|&h| row(h, 0)).collect() }
    }

    fn config(start: NaiveDate, days: u8) -> SessionConfig {
        SessionConfig {
            separation: 2,
            start_date: start,
            days,
            ..SessionConfig::new("Music")
        }
    }

    #[test]
    fn test_session_fills_every_slot_and_persists_ages() {
        // 2026-10-19 is a Monday.
        let monday = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let mut ages = Ages::default();

        let report = run_session(&config(monday, 1), &library(&[6, 7, 8]), &mut ages).unwrap();

        assert_eq!(report.stats.event_count, 3);
        // Empty primary and secondary codes both count toward the size.
        assert_eq!(report.stats.pool_size, 6);
        assert_eq!(report.stats.emitted, 3);
        assert_eq!(report.timeline.get(monday).unwrap().len(), 3);
        // Separation 2 alternates the first two artists of the NoCode pool.
        let ids: Vec<u32> =
            report.timeline.get(monday).unwrap().iter().map(|a| a.track_id).collect();
        assert_eq!(ids, vec![1, 2, 1]);
        assert_eq!(ages.0.get("artist 1"), Some(&1));
        assert_eq!(ages.0.get("artist 2"), Some(&2));
        assert_eq!(ages.0.len(), 2);
    }

    #[test]
    fn test_invalid_config_touches_nothing() {
        let monday = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let mut ages = Ages::default();
        let mut bad = config(monday, 1);
        bad.days = 9;

        let err = run_session(&bad, &library(&[6]), &mut ages).unwrap_err();
        assert_eq!(err.downcast_ref::<ScheduleError>(), Some(&ScheduleError::InvalidDayCount(9)));
        assert!(ages.0.is_empty());
    }

    #[test]
    fn test_sunday_to_monday_session_dates_each_side() {
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 25).unwrap();
        let monday = NaiveDate::from_ymd_opt(2026, 10, 26).unwrap();
        let mut ages = Ages::default();

        let report =
            run_session(&config(sunday, 2), &library(&[150, 167, 0, 5]), &mut ages).unwrap();

        let sunday_log = report.timeline.get(sunday).unwrap();
        let monday_log = report.timeline.get(monday).unwrap();
        assert_eq!(sunday_log.len(), 2);
        assert_eq!(monday_log.len(), 2);
        assert_eq!(sunday_log[1].start_time_ms, 23 * 3_600_000);
        assert_eq!(monday_log[0].start_time_ms, 0);
    }

    #[test]
    fn test_render_plan_lists_days_hours_and_slots() {
        let sunday = NaiveDate::from_ymd_opt(2026, 10, 25).unwrap();
        let config = config(sunday, 2);
        let schedule = ReferenceSchedule::load(
            &library(&[150, 0]),
            "Production",
            &config.groups,
            config.window(),
        )
        .unwrap();

        let text = render_plan(&schedule, &config.dates());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "2026-10-25 Sun (1 slots)");
        assert_eq!(lines[1], "  hour 150  1 slots, 00:04:00 planned");
        assert!(lines[2].starts_with("    06:00:00  00:04:00  music"));
        assert_eq!(lines[3], "2026-10-26 Mon (1 slots)");
    }

    #[test]
    fn test_output_dir_wins_over_import_path() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        crate::db::init_library_schema(&conn).unwrap();
        conn.execute("INSERT INTO services VALUES ('Music', '/srv/import/%Y%m%d.mus')", ())
            .unwrap();
        let library = LibraryDb::from_connection(conn);

        let mut config = SessionConfig::new("Music");
        assert_eq!(
            output_target(&config, &library).unwrap(),
            OutputTarget::Template("/srv/import/%Y%m%d.mus".into())
        );

        config.output_dir = Some("/tmp/out".into());
        assert_eq!(
            output_target(&config, &library).unwrap(),
            OutputTarget::Directory("/tmp/out".into())
        );

        config.output_dir = None;
        config.implementation_service = "Other".to_string();
        let err = output_target(&config, &library).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScheduleError>(),
            Some(ScheduleError::NoImportPath(_))
        ));
    }
}

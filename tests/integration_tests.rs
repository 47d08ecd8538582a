//! # Integration Tests for gridfill
//!
//! End-to-end sessions against temporary `SQLite` databases, plus the
//! compiled binary driven from the outside.

use anyhow::Result;
use chrono::NaiveDate;
use gridfill::config::{RuntimeConfig, SessionConfig};
use gridfill::db::{init_library_schema, ArtistDb};
use gridfill::error::ScheduleError;
use gridfill::session::schedule_service;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

const SEPARATION: u32 = 5;

/// Test helper to create a library with a full week of clocks.
///
/// Every hour of the `Production` service carries four uncoded music slots
/// and one `Up` slot. The `Music` service imports into `<dir>/import`.
fn create_test_library(dir: &Path) -> Result<PathBuf> {
    let db_path = dir.join("library.db");
    let conn = rusqlite::Connection::open(&db_path)?;
    init_library_schema(&conn)?;

    let template = dir.join("import").join("%Y%m%d.txt");
    conn.execute(
        "INSERT INTO services (name, mus_path) VALUES ('Production', NULL), ('Music', ?1)",
        [template.to_string_lossy()],
    )?;

    conn.execute_batch(
        "INSERT INTO events VALUES
            ('MusicAny', 'Music', NULL, NULL),
            ('MusicUp',  'music', 'Up', NULL),
            ('News',     'news',  NULL, NULL);
         INSERT INTO clock_lines VALUES
            ('Standard', 'News',     0,       120000),
            ('Standard', 'MusicAny', 0,       240000),
            ('Standard', 'MusicAny', 900000,  240000),
            ('Standard', 'MusicAny', 1800000, 240000),
            ('Standard', 'MusicAny', 2700000, 240000),
            ('Standard', 'MusicUp',  3000000, 240000);",
    )?;
    for hour in 0..168 {
        conn.execute(
            "INSERT INTO service_clocks VALUES ('Production', ?1, 'Standard')",
            [hour],
        )?;
    }

    // Ten artists with two uncoded tracks each, three more with 'Up' tracks.
    for number in 1..=20 {
        conn.execute(
            "INSERT INTO carts VALUES (?1, 'MUSIC', ?2, ?3)",
            (number, format!("Artist {}", (number - 1) / 2 + 1), format!("Track {number}")),
        )?;
        conn.execute(
            "INSERT INTO cuts VALUES (?1, ?2, 200000, NULL)",
            (format!("{number:06}_001"), number),
        )?;
    }
    for (number, artist) in [(31, "Riser A"), (32, "Riser B"), (33, "Riser C")] {
        conn.execute("INSERT INTO carts VALUES (?1, 'music', ?2, 'Upbeat')", (number, artist))?;
        conn.execute(
            "INSERT INTO cuts VALUES (?1, ?2, 180000, '2026-01-01 00:00:00')",
            (format!("{number:06}_001"), number),
        )?;
        conn.execute("INSERT INTO cart_sched_codes VALUES (?1, 'Up')", [number])?;
    }

    Ok(db_path)
}

fn runtime(dir: &Path) -> Result<RuntimeConfig> {
    Ok(RuntimeConfig::with_paths(create_test_library(dir)?, dir.join("artist_age.db")))
}

fn session(start: NaiveDate, days: u8, output_dir: Option<PathBuf>) -> SessionConfig {
    SessionConfig {
        separation: SEPARATION,
        start_date: start,
        days,
        output_dir,
        ..SessionConfig::new("Music")
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[cfg(test)]
mod session_tests {
    use super::*;

    #[test]
    fn test_one_day_session_writes_fixed_width_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let runtime = runtime(temp_dir.path())?;
        let out = temp_dir.path().join("out");

        // 2026-10-19 is a Monday.
        let config = session(date(2026, 10, 19), 1, Some(out.clone()));
        let (report, files) = schedule_service(&config, &runtime)?;
        assert!(files.is_success());
        assert_eq!(files.written, vec![out.join("2026-10-19.txt")]);

        let stats = &report.stats;
        assert_eq!(stats.event_count, 24 * 5);
        assert_eq!(stats.accounted(), stats.event_count);
        assert_eq!(stats.pool_size, 96 + 120);

        let text = fs::read_to_string(out.join("2026-10-19.txt"))?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), stats.emitted);
        assert!(lines.iter().all(|line| line.len() == 62));
        assert!(lines[0].starts_with("00:00:00"));
        assert!(lines.last().unwrap().starts_with("23:"));

        // Three 'Up' tracks for 24 'Up' slots.
        assert!(stats.dry_pool >= 21);
        let missing = lines.iter().filter(|line| line.contains("MISSING")).count();
        assert_eq!(missing, stats.dry_pool);
        Ok(())
    }

    #[test]
    fn test_import_path_template_names_the_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let runtime = runtime(temp_dir.path())?;

        let (_, files) = schedule_service(&session(date(2026, 10, 19), 1, None), &runtime)?;
        assert!(files.is_success());
        assert!(temp_dir.path().join("import/20261019.txt").exists());
        Ok(())
    }

    #[test]
    fn test_time_directives_in_import_path_render_as_midnight() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let runtime = runtime(temp_dir.path())?;
        let template = temp_dir.path().join("hourly").join("%Y%m%d-%H%M.txt");
        rusqlite::Connection::open(&runtime.library_db)?.execute(
            "INSERT INTO services (name, mus_path) VALUES ('Hourly', ?1)",
            [template.to_string_lossy()],
        )?;

        let mut config = session(date(2026, 10, 19), 1, None);
        config.implementation_service = "Hourly".to_string();
        let (_, files) = schedule_service(&config, &runtime)?;
        assert!(files.is_success());
        assert_eq!(files.written, vec![temp_dir.path().join("hourly/20261019-0000.txt")]);
        Ok(())
    }

    #[test]
    fn test_sunday_to_monday_session() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let runtime = runtime(temp_dir.path())?;
        let out = temp_dir.path().join("out");

        let config = session(date(2026, 10, 25), 2, Some(out.clone()));
        let (report, files) = schedule_service(&config, &runtime)?;
        assert_eq!(files.written.len(), 2);
        assert_eq!(report.stats.event_count, 48 * 5);
        assert_eq!(report.stats.unplaced, 0);

        for name in ["2026-10-25.txt", "2026-10-26.txt"] {
            let text = fs::read_to_string(out.join(name))?;
            let lines: Vec<&str> = text.lines().collect();
            assert!(lines[0].starts_with("00:00:00"), "{name} starts at midnight");
            assert!(lines.last().unwrap().starts_with("23:"), "{name} ends in the last hour");
        }
        Ok(())
    }

    #[test]
    fn test_artist_ages_carry_over_between_sessions() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let runtime = runtime(temp_dir.path())?;
        let out = temp_dir.path().join("out");

        let config = session(date(2026, 10, 19), 1, Some(out.clone()));
        let (first, _) = schedule_service(&config, &runtime)?;
        let stored: HashMap<String, u32> =
            ArtistDb::open(&runtime.artist_db)?.list(None)?.into_iter().collect();
        assert!(!stored.is_empty());
        assert_eq!(stored.values().filter(|&&age| age == 1).count(), 1);
        assert!(first.stats.emitted > 0);

        let (second, _) = schedule_service(&session(date(2026, 10, 20), 1, Some(out)), &runtime)?;
        let opener = &second.timeline.days()[0].assignments[0];
        let conn = rusqlite::Connection::open(&runtime.library_db)?;
        let artist: String = conn.query_row(
            "SELECT LOWER(artist) FROM carts WHERE number = ?1",
            [opener.track_id],
            |row| row.get(0),
        )?;

        // The last artists of the first session are still too recent.
        assert!(stored.get(&artist).map_or(true, |&age| age >= SEPARATION));
        Ok(())
    }

    #[test]
    fn test_unknown_reference_service_is_rejected() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let runtime = runtime(temp_dir.path())?;
        let mut config = session(date(2026, 10, 19), 1, Some(temp_dir.path().join("out")));
        config.reference_service = "Nowhere".to_string();

        let err = schedule_service(&config, &runtime).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ScheduleError>(),
            Some(&ScheduleError::UnknownService("Nowhere".to_string()))
        );
        Ok(())
    }

    #[test]
    fn test_missing_import_path_fails_before_touching_artists() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let runtime = runtime(temp_dir.path())?;
        let mut config = session(date(2026, 10, 19), 1, None);
        config.implementation_service = "Production".to_string();

        let err = schedule_service(&config, &runtime).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ScheduleError>(),
            Some(ScheduleError::NoImportPath(_))
        ));
        assert!(!runtime.artist_db.exists());
        Ok(())
    }
}

#[cfg(test)]
mod cli_tests {
    use super::*;

    fn gridfill() -> Command {
        Command::new(env!("CARGO_BIN_EXE_gridfill"))
    }

    #[test]
    fn test_cli_help_displays_correctly() {
        let output = gridfill().arg("--help").output().expect("Failed to run help command");

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(output.status.success());
        assert!(stdout.contains("gridfill"));
        assert!(stdout.contains("schedule"));
        assert!(stdout.contains("plan"));
    }

    #[test]
    fn test_cli_version_flag() {
        let output = gridfill().arg("--version").output().expect("Failed to run version command");
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_completion_generation() {
        let output =
            gridfill().args(["completion", "bash"]).output().expect("Failed to run completion");
        assert!(output.status.success());
        assert!(String::from_utf8_lossy(&output.stdout).contains("gridfill"));
    }

    #[test]
    fn test_init_db_creates_both_databases() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let library = temp_dir.path().join("lib.db");
        let artists = temp_dir.path().join("ages.db");

        let output = gridfill()
            .arg("--library-db")
            .arg(&library)
            .arg("--artist-db")
            .arg(&artists)
            .arg("init-db")
            .output()?;
        assert!(output.status.success());
        assert!(library.exists());
        assert!(artists.exists());
        Ok(())
    }

    #[test]
    fn test_schedule_command_with_stats() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let runtime = runtime(temp_dir.path())?;
        let out = temp_dir.path().join("out");

        let output = gridfill()
            .env("RUST_LOG", "off")
            .arg("--library-db")
            .arg(&runtime.library_db)
            .arg("--artist-db")
            .arg(&runtime.artist_db)
            .args(["schedule", "Music", "-s", "2026-10-21", "-d", "2", "-a", "4", "--stats", "-o"])
            .arg(&out)
            .output()?;
        assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

        let stdout = String::from_utf8_lossy(&output.stdout);
        assert_eq!(stdout.lines().count(), 2);
        assert!(out.join("2026-10-21.txt").exists());
        assert!(out.join("2026-10-22.txt").exists());

        let stats: serde_json::Value = serde_json::from_slice(&output.stderr)?;
        assert_eq!(stats["event_count"], 240);
        Ok(())
    }

    #[test]
    fn test_plan_and_artists_commands() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let runtime = runtime(temp_dir.path())?;

        let plan = gridfill()
            .arg("--library-db")
            .arg(&runtime.library_db)
            .args(["plan", "-s", "2026-10-19"])
            .output()?;
        assert!(plan.status.success());
        let stdout = String::from_utf8_lossy(&plan.stdout);
        assert!(stdout.starts_with("2026-10-19 Mon (120 slots)"));

        let artists = gridfill()
            .arg("--artist-db")
            .arg(&runtime.artist_db)
            .args(["artists", "--limit", "3"])
            .output()?;
        assert!(artists.status.success());
        assert!(artists.stdout.is_empty());
        Ok(())
    }

    #[test]
    fn test_invalid_day_count_exits_non_zero() {
        let output = gridfill().args(["plan", "--days", "9"]).output().expect("Failed to run plan");
        assert!(!output.status.success());
    }
}

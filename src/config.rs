//! # Configuration Module
//!
//! Data directory setup, database locations and validated session parameters.
//!
//! ## Data Storage
//!
//! Both databases default to the platform-standard data directory:
//! - Linux: `~/.local/share/gridfill/`
//! - macOS: `~/Library/Application Support/gridfill/`
//! - Windows: `%APPDATA%\gridfill\`
//!
//! Either path can be overridden on the command line or through the
//! `GRIDFILL_LIBRARY_DB` and `GRIDFILL_ARTIST_DB` environment variables.

use crate::clock::{session_dates, SessionWindow, DAYS_PER_WEEK};
use crate::error::ScheduleError;
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_REFERENCE_SERVICE: &str = "Production";
pub const DEFAULT_GROUPS: &str = "music";
pub const DEFAULT_SEPARATION: u32 = 200;

/// Returns the platform-appropriate data directory for gridfill, creating it
/// if it doesn't exist.
///
/// # Errors
///
/// This function will return an error if:
/// - The system data directory cannot be determined
/// - The gridfill subdirectory cannot be created due to permissions
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        ))?;

    let gridfill_dir = data_dir.join("gridfill");
    fs::create_dir_all(&gridfill_dir)
        .with_context(|| format!(
            "Failed to create gridfill data directory at {}. Please check file permissions.",
            gridfill_dir.display()
        ))?;

    Ok(gridfill_dir)
}

/// Database locations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Music library, services and clocks
    pub library_db: PathBuf,
    /// Artist ages carried between sessions
    pub artist_db: PathBuf,
}

impl RuntimeConfig {
    /// Both databases inside the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory is unavailable.
    pub fn new() -> Result<Self> {
        let data_dir = get_data_dir()?;
        Ok(Self {
            library_db: data_dir.join("library.db"),
            artist_db: data_dir.join("artist_age.db"),
        })
    }

    /// Defaults, with any explicitly given path taking precedence. The data
    /// directory is only consulted when a path is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if a default is needed and the data directory is
    /// unavailable.
    pub fn resolve(library_db: Option<PathBuf>, artist_db: Option<PathBuf>) -> Result<Self> {
        match (library_db, artist_db) {
            (Some(library_db), Some(artist_db)) => Ok(Self::with_paths(library_db, artist_db)),
            (library_db, artist_db) => {
                let defaults = Self::new()?;
                Ok(Self {
                    library_db: library_db.unwrap_or(defaults.library_db),
                    artist_db: artist_db.unwrap_or(defaults.artist_db),
                })
            }
        }
    }

    #[must_use]
    pub fn with_paths(library_db: PathBuf, artist_db: PathBuf) -> Self {
        Self { library_db, artist_db }
    }
}

/// Split a comma-separated group list, dropping blanks and lower-casing.
#[must_use]
pub fn parse_groups(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|group| group.trim().to_lowercase())
        .filter(|group| !group.is_empty())
        .collect()
}

/// The day after today, local time.
#[must_use]
pub fn tomorrow() -> NaiveDate {
    let today = Local::now().date_naive();
    today.succ_opt().unwrap_or(today)
}

/// Parameters of one scheduling session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Service whose import files are generated
    pub implementation_service: String,
    /// Service whose clocks provide the slot layout
    pub reference_service: String,
    /// Lower-case scheduling groups, in the order given
    pub groups: Vec<String>,
    /// Assignments that must pass before an artist repeats
    pub separation: u32,
    pub start_date: NaiveDate,
    /// Consecutive days, 1 to 7
    pub days: u8,
    /// Overrides the service import path
    pub output_dir: Option<PathBuf>,
}

impl SessionConfig {
    /// Session for tomorrow with every other parameter at its default.
    #[must_use]
    pub fn new(implementation_service: &str) -> Self {
        Self {
            implementation_service: implementation_service.to_string(),
            reference_service: DEFAULT_REFERENCE_SERVICE.to_string(),
            groups: parse_groups(DEFAULT_GROUPS),
            separation: DEFAULT_SEPARATION,
            start_date: tomorrow(),
            days: 1,
            output_dir: None,
        }
    }

    /// Reject parameters that would make the session meaningless.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if !(1..=DAYS_PER_WEEK).contains(&self.days) {
            return Err(ScheduleError::InvalidDayCount(self.days));
        }
        if self.separation == 0 {
            return Err(ScheduleError::InvalidSeparation);
        }
        if self.groups.iter().all(|group| group.trim().is_empty()) {
            return Err(ScheduleError::NoGroups);
        }
        Ok(())
    }

    #[must_use]
    pub fn window(&self) -> SessionWindow {
        SessionWindow::for_dates(self.start_date, self.days)
    }

    #[must_use]
    pub fn dates(&self) -> Vec<NaiveDate> {
        session_dates(self.start_date, self.days)
    }
}

//! Typed errors for session parameters and schedule data.
//!
//! Everything else in the crate reports through `anyhow`; these variants exist
//! so configuration problems can be matched on before any scheduling starts.

use thiserror::Error;

/// Problems detected while validating a scheduling session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Start date could not be understood
    #[error("unknown date format '{0}', please use 'YYYY-MM-DD'")]
    InvalidDate(String),

    /// Day counts beyond one week would revisit the same week hours
    #[error("day count must be between 1 and 7, got {0}")]
    InvalidDayCount(u8),

    /// Separation of zero would make every artist eligible immediately
    #[error("artist separation must be at least 1")]
    InvalidSeparation,

    /// No group left after splitting the group list
    #[error("no scheduling groups given")]
    NoGroups,

    /// Week hours run from 0 (Monday 00:00) to 167 (Sunday 23:00)
    #[error("week hour {0} is outside 0-167")]
    InvalidWeekHour(i64),

    /// The reference service has no clocks assigned
    #[error("reference service '{0}' has no clocks")]
    UnknownService(String),

    /// Nowhere to write the import files
    #[error("service '{0}' has no music import path; pass --output-dir")]
    NoImportPath(String),
}

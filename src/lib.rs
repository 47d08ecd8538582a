//! Music log generation for broadcast automation.
//!
//! gridfill copies the slot layout of a reference service's hourly clocks
//! onto a 168-hour week grid and fills every music slot with a track from the
//! library, keeping repeats of an artist apart. The result is one fixed-width
//! import file per day.
//!
//! Core modules:
//! - [`clock`] - Week hours, session windows, date and time formatting
//! - [`schedule`] - Reference schedule model
//! - [`artist`] - Artist separation tracking
//! - [`pool`] - Candidate pools per group and category
//! - [`timeline`] - Timeline synthesis
//! - [`emitter`] - Import file rendering and writing
//! - [`session`] - One scheduling session end to end
//!
//! ### Supporting Modules
//!
//! - [`catalog`] - Candidate tracks and the catalog seam
//! - [`stats`] - Per-session counters
//! - [`db`] - `SQLite` library and artist stores
//! - [`config`] - Data directory, database paths, session parameters
//! - [`error`] - Typed validation errors
//! - [`cli`] - Command-line interface definitions with clap integration
//! - [`completion`] - Shell completion generation
//!
//! ## Quick Start Example
//!
//! ```no_run
//! use gridfill::config::{RuntimeConfig, SessionConfig};
//! use gridfill::session::schedule_service;
//!
//! let runtime = RuntimeConfig::new()?;
//!
//! let mut config = SessionConfig::new("Music");
//! config.days = 7;
//! config.separation = 150;
//!
//! let (report, files) = schedule_service(&config, &runtime)?;
//! println!("{} assignments, {} files", report.stats.emitted, files.written.len());
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Scheduling Model
//!
//! ### Week Hours
//! Hour 0 is Monday 00:00 and hour 167 is Sunday 23:00. A session that
//! starts late in the week and runs past Sunday midnight covers two ranges,
//! `[first, 167]` and `[0, last]`, processed in that order.
//!
//! ### Pools
//! Each (group, category) pair gets one pool of least-recently-played tracks.
//! Tracks without a category are reused within a session; tracks of a
//! concrete category are used once.
//!
//! ### Artist Separation
//! Every assignment ages all known artists by one. An artist may be
//! scheduled again once its age reaches the separation. Ages are stored so
//! the next session continues where this one stopped.
//!
//! ## Error Handling
//!
//! All fallible operations return `anyhow::Result` with context. Invalid
//! session parameters surface as [`error::ScheduleError`] and can be
//! recovered with `downcast_ref`.

pub mod artist;
pub mod catalog;
pub mod cli;
pub mod clock;
pub mod completion;
pub mod config;
pub mod db;
pub mod emitter;
pub mod error;
pub mod pool;
pub mod schedule;
pub mod session;
pub mod stats;
pub mod timeline;

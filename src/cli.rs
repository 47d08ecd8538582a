//! # Command-Line Interface Module
//!
//! Command-line definitions for gridfill using Clap derive macros.
//!
//! ## Commands
//!
//! - `schedule`: Generate music import files for a service
//! - `plan`: Show the reference schedule for a session window
//! - `artists`: List stored artist ages
//! - `init-db`: Create empty library and artist databases
//! - `completion`: Generate shell completions
//!
//! ## Examples
//!
//! ```bash
//! gridfill schedule Music --start-date 2026-10-19 --days 7
//! gridfill plan --groups music,jazz
//! gridfill -vv schedule Music -a 150 -o /tmp/import --stats
//! ```

use crate::clock::parse_start_date;
use crate::config::{DEFAULT_GROUPS, DEFAULT_REFERENCE_SERVICE, DEFAULT_SEPARATION};
use chrono::NaiveDate;
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Shell types supported for completion generation
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

/// Main application arguments structure.
///
/// Database locations and verbosity are global so they can be given before
/// or after the subcommand.
#[derive(Parser, Debug)]
#[command(name = "gridfill")]
#[command(about = "gridfill: music log generator for broadcast automation")]
#[command(version)]
pub struct Args {
    /// Library database (carts, cuts, services, clocks)
    #[arg(long, global = true, env = "GRIDFILL_LIBRARY_DB", value_hint = clap::ValueHint::FilePath)]
    pub library_db: Option<PathBuf>,

    /// Artist age database
    #[arg(long, global = true, env = "GRIDFILL_ARTIST_DB", value_hint = clap::ValueHint::FilePath)]
    pub artist_db: Option<PathBuf>,

    /// Increase logging: -v info, -vv debug, -vvv trace
    ///
    /// `RUST_LOG` takes precedence when set.
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Session window and groups, shared by `schedule` and `plan`.
#[derive(ClapArgs, Debug, Clone)]
pub struct WindowArgs {
    /// Service whose clocks provide the slot layout
    #[arg(short, long, default_value = DEFAULT_REFERENCE_SERVICE)]
    pub reference_service: String,

    /// Comma-separated scheduling groups
    #[arg(short, long, default_value = DEFAULT_GROUPS)]
    pub groups: String,

    /// First day of the session, YYYY-MM-DD (default: tomorrow)
    #[arg(short, long, value_parser = parse_start_date)]
    pub start_date: Option<NaiveDate>,

    /// Number of consecutive days to schedule
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=7))]
    pub days: u8,
}

/// Enumeration of all available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate music import files for a service
    ///
    /// Fills every music slot of the reference service's clocks with a track
    /// from the library, keeping artists apart, and writes one import file
    /// per day. Artist ages are stored for the next run.
    Schedule {
        /// Service the import files are generated for
        #[arg(value_hint = clap::ValueHint::Other)]
        implementation_service: String,

        /// Assignments that must pass before an artist may repeat
        #[arg(
            short = 'a',
            long,
            default_value_t = DEFAULT_SEPARATION,
            value_parser = clap::value_parser!(u32).range(1..)
        )]
        artist_separation: u32,

        /// Write files as YYYY-MM-DD.txt in this directory instead of the
        /// service import path
        #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
        output_dir: Option<PathBuf>,

        /// Print session statistics as JSON on stderr
        #[arg(short = 'S', long)]
        stats: bool,

        #[command(flatten)]
        window: WindowArgs,
    },

    /// Show the reference schedule for a session window
    ///
    /// Prints each day, hour and slot that a `schedule` run with the same
    /// options would fill. Nothing is scheduled or stored.
    Plan {
        #[command(flatten)]
        window: WindowArgs,
    },

    /// List stored artist ages, most recently scheduled first
    Artists {
        /// Show at most this many artists
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Create empty library and artist databases
    ///
    /// Existing tables and data are left untouched.
    InitDb,

    /// Generate shell completions
    ///
    /// Usage: gridfill completion bash > ~/.local/share/bash-completion/completions/gridfill
    Completion {
        /// Shell to generate completions for
        shell: Shell,
    },

    /// Generate bash completion that also completes service names
    ///
    /// Usage: gridfill completion-enhanced > ~/.local/share/bash-completion/completions/gridfill
    CompletionEnhanced,

    /// List service names for completion (hidden command)
    #[command(hide = true)]
    CompleteServices,
}

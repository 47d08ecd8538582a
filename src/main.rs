//! # gridfill - Music Log Generator
//!
//! Command-line entry point. Parses arguments, sets up logging and routes
//! each command to the library.
//!
//! ## Usage
//!
//! ```bash
//! # Create empty databases
//! gridfill init-db
//!
//! # Inspect the reference clocks for next week
//! gridfill plan --start-date 2026-10-19 --days 7
//!
//! # Generate import files for tomorrow
//! gridfill schedule Music
//!
//! # Same, with statistics and debug logging
//! gridfill -vv schedule Music --stats
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser};
use gridfill::cli::{self, WindowArgs};
use gridfill::completion;
use gridfill::config::{parse_groups, tomorrow, RuntimeConfig, SessionConfig};
use gridfill::db::{ArtistDb, LibraryDb};
use gridfill::session;
use log::{debug, info};
use std::path::PathBuf;

/// Log filter used when `RUST_LOG` is not set.
fn default_log_filter(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Session parameters from the shared window options.
fn session_config(
    implementation_service: &str,
    window: WindowArgs,
    separation: Option<u32>,
    output_dir: Option<PathBuf>,
) -> SessionConfig {
    let mut config = SessionConfig::new(implementation_service);
    config.reference_service = window.reference_service;
    config.groups = parse_groups(&window.groups);
    config.start_date = window.start_date.unwrap_or_else(tomorrow);
    config.days = window.days;
    config.output_dir = output_dir;
    if let Some(separation) = separation {
        config.separation = separation;
    }
    config
}

/// Main entry point for gridfill.
///
/// # Logging
///
/// `-v` raises the default level (`warn`, `info`, `debug`, `trace`).
/// `RUST_LOG` overrides it, e.g. `RUST_LOG=gridfill::pool=trace`.
fn main() -> Result<()> {
    let args = cli::Args::parse();

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(default_log_filter(args.verbose)),
    )
    .init();

    match args.command {
        cli::Command::Schedule {
            implementation_service,
            artist_separation,
            output_dir,
            stats,
            window,
        } => {
            let runtime = RuntimeConfig::resolve(args.library_db, args.artist_db)?;
            let config = session_config(
                &implementation_service,
                window,
                Some(artist_separation),
                output_dir,
            );
            debug!("Session config: {config:?}");

            let (report, files) = session::schedule_service(&config, &runtime)?;

            if stats {
                eprintln!("{}", serde_json::to_string_pretty(&report.stats)?);
            }
            if args.verbose >= 4 {
                eprintln!("{}", serde_json::to_string_pretty(report.pools.used())?);
            }
            for path in &files.written {
                println!("{}", path.display());
            }
            if !files.is_success() {
                anyhow::bail!(
                    "{} of {} import files could not be written",
                    files.failed.len(),
                    files.failed.len() + files.written.len()
                );
            }
        }
        cli::Command::Plan { window } => {
            let runtime = RuntimeConfig::resolve(args.library_db, args.artist_db)?;
            let config = session_config("", window, None, None);
            let library = LibraryDb::open(&runtime.library_db)?;

            let schedule = session::load_plan(&config, &library)?;
            info!("{} slots in week hours {}", schedule.slot_count(), schedule.window());
            print!("{}", session::render_plan(&schedule, &config.dates()));
        }
        cli::Command::Artists { limit } => {
            let runtime = RuntimeConfig::resolve(args.library_db, args.artist_db)?;
            let artists = ArtistDb::open(&runtime.artist_db)?;

            for (name, age) in artists.list(limit)? {
                println!("{age:>8}  {name}");
            }
        }
        cli::Command::InitDb => {
            let runtime = RuntimeConfig::resolve(args.library_db, args.artist_db)?;
            info!("Initializing library database at: {}", runtime.library_db.display());
            LibraryDb::create(&runtime.library_db)?;
            info!("Initializing artist database at: {}", runtime.artist_db.display());
            ArtistDb::open(&runtime.artist_db)?;

            println!("Library database: {}", runtime.library_db.display());
            println!("Artist database:  {}", runtime.artist_db.display());
        }
        cli::Command::Completion { shell } => {
            let mut cmd = cli::Args::command();
            completion::generate_completions(
                completion::shell_to_completion_shell(&shell),
                &mut cmd,
            );
        }
        cli::Command::CompletionEnhanced => {
            print!("{}", completion::enhanced_bash_completion());
        }
        cli::Command::CompleteServices => {
            // Used by the enhanced completion script.
            let runtime = RuntimeConfig::resolve(args.library_db, args.artist_db)?;
            completion::print_service_completions(&runtime)?;
        }
    }

    Ok(())
}

//! # Import File Output
//!
//! Each day of a timeline becomes one text file that the automation system
//! merges into its log. Lines are fixed-width and the column offsets are
//! configured on the importing side, so the layout must not drift:
//!
//! ```text
//! 0         1         2         3         4         5         6
//! 012345678901234567890123456789012345678901234567890123456789012
//! HH:MM:SS  CCCCCC  TITLE.............................  HH:MM:SS
//! ```
//!
//! | Field        | Offset | Length |
//! |--------------|--------|--------|
//! | Start time   | 0      | 8      |
//! | Cart number  | 10     | 6      |
//! | Title        | 18     | 34     |
//! | Length       | 54     | 8      |

use crate::clock::format_hms;
use crate::timeline::{Assignment, Timeline};
use anyhow::{Context, Result};
use chrono::format::{Item, StrftimeItems};
use chrono::{NaiveDate, NaiveTime};
use log::{debug, error, info, trace};
use path_absolutize::Absolutize;
use std::fmt::Write as _;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const TITLE_WIDTH: usize = 34;

/// Where import files go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputTarget {
    /// Plain directory; files are named `YYYY-MM-DD.txt`
    Directory(PathBuf),
    /// Service import path whose file name is a strftime template
    Template(PathBuf),
}

impl OutputTarget {
    /// Directory target resolved against the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn directory(dir: &Path) -> Result<Self> {
        let absolute = dir
            .absolutize()
            .with_context(|| format!("Failed to resolve output directory {}", dir.display()))?;
        Ok(Self::Directory(absolute.into_owned()))
    }

    /// Full path of the import file for `date`.
    #[must_use]
    pub fn path_for(&self, date: NaiveDate) -> PathBuf {
        match self {
            Self::Directory(dir) => dir.join(default_file_name(date)),
            Self::Template(template) => {
                let parent = template.parent().unwrap_or_else(|| Path::new(""));
                let name = template
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_default();
                parent.join(render_file_name(&name, date))
            }
        }
    }
}

fn default_file_name(date: NaiveDate) -> String {
    format!("{}.txt", date.format("%Y-%m-%d"))
}

/// Render a strftime file-name template, falling back to `YYYY-MM-DD.txt`
/// when the template is empty or uses a directive that cannot be rendered.
///
/// The date is formatted at midnight, so time directives such as `%H` or
/// `%p` render as `00` and `AM`. Offset directives such as `%z` have no
/// value and take the fallback.
#[must_use]
pub fn render_file_name(template: &str, date: NaiveDate) -> String {
    if template.is_empty() {
        return default_file_name(date);
    }
    let items: Vec<Item<'_>> = StrftimeItems::new(template).collect();
    if items.iter().any(|item| matches!(item, Item::Error)) {
        debug!("Unknown directive in import path template '{template}'; using default name");
        return default_file_name(date);
    }

    let midnight = date.and_time(NaiveTime::MIN);
    let mut name = String::new();
    if write!(name, "{}", midnight.format_with_items(items.into_iter())).is_err() {
        debug!("Template '{template}' cannot be rendered for a date; using default name");
        return default_file_name(date);
    }
    name
}

/// One fixed-width import line, newline included.
#[must_use]
pub fn format_line(assignment: &Assignment) -> String {
    let title: String = assignment.title.chars().take(TITLE_WIDTH).collect();
    format!(
        "{:8}  {:>6}  {:<width$}  {:8}\n",
        format_hms(assignment.start_time_ms),
        assignment.track_id,
        title,
        format_hms(assignment.duration_ms),
        width = TITLE_WIDTH
    )
}

/// Whole file contents for one day.
#[must_use]
pub fn render_day(assignments: &[Assignment]) -> String {
    assignments.iter().map(format_line).collect()
}

/// Outcome of writing a timeline.
#[derive(Debug, Default)]
pub struct WriteReport {
    pub written: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, anyhow::Error)>,
}

impl WriteReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Write one file per day. A failing day is reported and the rest are
/// still written.
pub fn write_timeline(timeline: &Timeline, target: &OutputTarget) -> WriteReport {
    let mut report = WriteReport::default();

    for day in timeline.days() {
        let path = target.path_for(day.date);
        info!(
            "Writing {} assignments for {} to {}",
            day.assignments.len(),
            day.date,
            path.display()
        );
        let contents = render_day(&day.assignments);
        trace!("{contents}");

        match write_atomically(&path, &contents) {
            Ok(()) => report.written.push(path),
            Err(err) => {
                error!("Failed to write import file {}: {err:#}", path.display());
                report.failed.push((path, err));
            }
        }
    }

    report
}

/// Write through a temporary file in the same directory, then rename.
fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let mut file = NamedTempFile::new_in(&dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    file.write_all(contents.as_bytes())
        .with_context(|| format!("Failed to write import data for {}", path.display()))?;
    file.persist(path)
        .with_context(|| format!("Failed to move import file into place at {}", path.display()))?;
    Ok(())
}

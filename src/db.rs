use crate::artist::ArtistStore;
use crate::catalog::{Candidate, TrackCatalog};
use crate::schedule::{Category, ScheduleSource, SlotRow};
use anyhow::{Context, Result};
use log::{debug, trace};
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use std::collections::HashMap;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// Open the `SQLite` database at `path`, creating the file if needed.
pub fn connect(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)
        .with_context(|| format!("Rusqlite DB connection refused. DB location: {path:?}"))?;
    Ok(conn)
}

/// Create the library tables if they do not exist yet.
pub fn init_library_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS services (
            name     TEXT PRIMARY KEY,
            mus_path TEXT
        );
        CREATE TABLE IF NOT EXISTS carts (
            number     INTEGER PRIMARY KEY,
            group_name TEXT NOT NULL,
            artist     TEXT,
            title      TEXT
        );
        CREATE TABLE IF NOT EXISTS cuts (
            cut_name           TEXT PRIMARY KEY,
            cart_number        INTEGER NOT NULL,
            length             INTEGER NOT NULL DEFAULT 0,
            last_play_datetime TEXT
        );
        CREATE TABLE IF NOT EXISTS cart_sched_codes (
            cart_number INTEGER NOT NULL,
            sched_code  TEXT    NOT NULL
        );
        CREATE TABLE IF NOT EXISTS events (
            name        TEXT PRIMARY KEY,
            sched_group TEXT,
            have_code   TEXT,
            have_code2  TEXT
        );
        CREATE TABLE IF NOT EXISTS clock_lines (
            clock_name TEXT    NOT NULL,
            event_name TEXT    NOT NULL,
            start_time INTEGER NOT NULL,
            length     INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS service_clocks (
            service_name TEXT    NOT NULL,
            hour         INTEGER NOT NULL,
            clock_name   TEXT
        );",
    )
    .with_context(|| format!("Invalid SQL command when CREATEing library tables in `{conn:?}`."))?;
    Ok(())
}

/// Music library and service clocks of the automation system.
pub struct LibraryDb {
    conn: Connection,
}

impl LibraryDb {
    /// Open an existing library database.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = connect(path).context("Connection refused when opening library DB.")?;
        Ok(Self { conn })
    }

    /// Open the library at `path` and make sure its tables exist.
    pub fn create(path: &Path) -> Result<Self> {
        let db = Self::open(path)?;
        init_library_schema(&db.conn)?;
        Ok(db)
    }

    #[must_use]
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn }
    }

    #[must_use]
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Music import path template of `service`, if it has one.
    pub fn import_path(&self, service: &str) -> Result<Option<PathBuf>> {
        let path: Option<Option<String>> = self
            .conn
            .query_row("SELECT mus_path FROM services WHERE name = ?1", [service], |row| {
                row.get(0)
            })
            .optional()
            .with_context(|| format!("Cannot look up import path of service '{service}'."))?;

        Ok(path
            .flatten()
            .map(|path| path.trim().to_string())
            .filter(|path| !path.is_empty())
            .map(PathBuf::from))
    }

    /// Names of all services, sorted.
    pub fn services(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM services ORDER BY name")
            .context("Invalid SQL statement when SELECTing services.")?;
        let names = stmt
            .query_map([], |row| row.get(0))
            .context("Cannot query services.")?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(names)
    }

    /// Whether any clock is assigned to `service`.
    pub fn has_clocks(&self, service: &str) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM service_clocks WHERE service_name = ?1",
                [service],
                |row| row.get(0),
            )
            .with_context(|| format!("Cannot count clocks of service '{service}'."))?;
        Ok(count > 0)
    }
}

impl TrackCatalog for LibraryDb {
    fn candidates(&self, group: &str, category: &Category, limit: usize) -> Result<Vec<Candidate>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let mut values = vec![Value::Text(group.to_lowercase())];

        // NoCode pools take the whole group; joining the code table would
        // repeat carts that carry several codes.
        let code_join = match category.code() {
            Some(code) => {
                values.push(Value::Text(code.to_string()));
                "JOIN cart_sched_codes AS s ON (c.number = s.cart_number AND s.sched_code = ?2) "
            }
            None => "",
        };
        values.push(Value::Integer(limit));

        let query = format!(
            "SELECT c.number, c.artist, c.title, u.length, u.last_play_datetime \
             FROM carts AS c \
             JOIN cuts AS u ON (c.number = u.cart_number) \
             {code_join}\
             WHERE LOWER(c.group_name) = ?1 AND u.length > 0 \
             ORDER BY u.last_play_datetime ASC, c.number ASC \
             LIMIT ?{}",
            values.len()
        );
        trace!("candidates: {query}");

        let mut stmt = self
            .conn
            .prepare(&query)
            .with_context(|| {
                format!("Invalid SQL statement when SELECTing candidates for '{group}'.")
            })?;
        let candidates = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(Candidate {
                    id: row.get(0)?,
                    artist: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    title: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    duration_ms: row.get(3)?,
                    last_played_at: row.get(4)?,
                })
            })
            .with_context(|| {
                format!("Cannot query candidates for group '{group}', category '{category}'.")
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Cannot read candidate row.")?;

        debug!("{} candidates for {group}/{category}", candidates.len());
        Ok(candidates)
    }
}

impl ScheduleSource for LibraryDb {
    fn slot_rows(
        &self,
        service: &str,
        groups: &[String],
        hours: RangeInclusive<u8>,
    ) -> Result<Vec<SlotRow>> {
        if groups.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = (0..groups.len())
            .map(|i| format!("?{}", i + 4))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            "SELECT sc.hour, cl.start_time, cl.length, LOWER(ev.sched_group), \
                    COALESCE(ev.have_code, ''), COALESCE(ev.have_code2, '') \
             FROM service_clocks AS sc \
             JOIN clock_lines AS cl ON (sc.clock_name = cl.clock_name) \
             JOIN events AS ev ON (cl.event_name = ev.name) \
             WHERE sc.service_name = ?1 \
               AND sc.hour BETWEEN ?2 AND ?3 \
               AND LOWER(ev.sched_group) IN ({placeholders}) \
             ORDER BY sc.hour, cl.start_time"
        );
        trace!("slot_rows: {query}");

        let mut values = vec![
            Value::Text(service.to_string()),
            Value::Integer(i64::from(*hours.start())),
            Value::Integer(i64::from(*hours.end())),
        ];
        values.extend(groups.iter().map(|group| Value::Text(group.to_lowercase())));

        let mut stmt = self
            .conn
            .prepare(&query)
            .with_context(|| {
                format!("Invalid SQL statement when SELECTing clock lines of '{service}'.")
            })?;
        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(SlotRow {
                    hour: row.get(0)?,
                    start_time_ms: row.get(1)?,
                    length_ms: row.get(2)?,
                    group: row.get(3)?,
                    code1: row.get(4)?,
                    code2: row.get(5)?,
                })
            })
            .with_context(|| format!("Cannot query clock lines of service '{service}'."))?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Cannot read clock line row.")?;

        Ok(rows)
    }
}

/// Persistent artist ages, one row per artist.
pub struct ArtistDb {
    conn: Connection,
}

impl ArtistDb {
    /// Open the artist database at `path`, creating its table if needed.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = connect(path).context("Connection refused when opening artist DB.")?;
        Self::from_connection(conn)
    }

    pub fn from_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS artists (
                name TEXT    PRIMARY KEY,
                age  INTEGER NOT NULL
            )",
            (),
        )
        .with_context(|| {
            format!("Invalid SQL command when CREATEing artists TABLE in `{conn:?}`.")
        })?;
        Ok(Self { conn })
    }

    /// Stored artists, most recently scheduled first.
    pub fn list(&self, limit: Option<usize>) -> Result<Vec<(String, u32)>> {
        let limit = limit.map_or(-1, |limit| i64::try_from(limit).unwrap_or(i64::MAX));
        let mut stmt = self
            .conn
            .prepare("SELECT name, age FROM artists ORDER BY age ASC, name ASC LIMIT ?1")
            .context("Invalid SQL statement when SELECTing artists.")?;
        let artists = stmt
            .query_map([limit], |row| Ok((row.get(0)?, row.get(1)?)))
            .context("Cannot query artists.")?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(artists)
    }
}

impl ArtistStore for ArtistDb {
    fn load_ages(&self) -> Result<HashMap<String, u32>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, age FROM artists")
            .context("Invalid SQL statement when SELECTing artist ages.")?;
        let ages = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
            .context("Cannot query artist ages.")?
            .collect::<rusqlite::Result<HashMap<String, u32>>>()?;
        Ok(ages)
    }

    /// Upsert every artist in one transaction.
    fn save_ages(&mut self, ages: &HashMap<String, u32>) -> Result<()> {
        let tx = self.conn.transaction()?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO artists (name, age) VALUES (?1, ?2)
                 ON CONFLICT(name) DO UPDATE SET age = excluded.age",
            )?;

            for (name, age) in ages {
                stmt.execute((name, age)).with_context(|| {
                    format!("Invalid SQL statement when upserting artist '{name}'.")
                })?;
            }
        }

        tx.commit().context("Commiting SQL transaction failed.")?;
        Ok(())
    }
}

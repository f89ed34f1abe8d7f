//! Persistent weekly schedule store and the message template around it.

use chrono::{DateTime, Datelike, Utc, Weekday};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, params};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Weekday names as stored and shown, Monday first.
pub const WEEKDAYS: [&str; 7] = ["Senin", "Selasa", "Rabu", "Kamis", "Jumat", "Sabtu", "Minggu"];

/// Errors from the schedule store.
#[derive(Debug)]
pub enum StoreError {
    /// Failed to open or bootstrap the database file.
    Open { path: PathBuf, source: rusqlite::Error },
    /// A query or write failed.
    Query { op: &'static str, source: rusqlite::Error },
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { path, source } => {
                write!(f, "failed to open schedule database '{}': {}", path.display(), source)
            }
            Self::Query { op, source } => write!(f, "schedule {} failed: {}", op, source),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Open { source, .. } => Some(source),
            Self::Query { source, .. } => Some(source),
        }
    }
}

/// Whether an upsert created the day's entry or overwrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// SQLite-backed store mapping weekday name to schedule text.
pub struct ScheduleStore {
    conn: Mutex<Connection>,
}

impl ScheduleStore {
    /// Open (or create) the database at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Open { path: path.to_path_buf(), source: e })?;
        let store = Self { conn: Mutex::new(conn) };
        store
            .init_schema()
            .map_err(|e| StoreError::Open { path: path.to_path_buf(), source: e })?;
        Ok(store)
    }

    /// In-memory store for tests.
    #[cfg(test)]
    pub fn in_memory() -> Self {
        let conn = Connection::open_in_memory().expect("Failed to create in-memory database");
        let store = Self { conn: Mutex::new(conn) };
        store.init_schema().expect("Failed to initialize schema");
        store
    }

    fn init_schema(&self) -> Result<(), rusqlite::Error> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schedules (
                day TEXT PRIMARY KEY,
                entry TEXT NOT NULL
            );
        "#,
        )
    }

    /// Schedule entries stored for a day. An unknown day is an empty
    /// result, not an error.
    pub fn get(&self, day: &str) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT entry FROM schedules WHERE day = ?1")
            .map_err(|e| StoreError::Query { op: "lookup", source: e })?;
        let rows = stmt
            .query_map(params![day], |row| row.get::<_, String>(0))
            .map_err(|e| StoreError::Query { op: "lookup", source: e })?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(|e| StoreError::Query { op: "lookup", source: e })?);
        }
        Ok(entries)
    }

    /// Create or overwrite the entry for a day.
    ///
    /// The existence check and the write share one connection guard, and
    /// the write itself is conflict-safe on the day key, so a racing
    /// identical upsert cannot duplicate a day or mislabel the outcome.
    pub fn upsert(&self, day: &str, entry: &str) -> Result<UpsertOutcome, StoreError> {
        let conn = self.conn.lock().unwrap();
        let existing: i64 = conn
            .query_row("SELECT COUNT(*) FROM schedules WHERE day = ?1", params![day], |row| {
                row.get(0)
            })
            .map_err(|e| StoreError::Query { op: "upsert", source: e })?;

        conn.execute(
            "INSERT INTO schedules (day, entry) VALUES (?1, ?2)
             ON CONFLICT(day) DO UPDATE SET entry = excluded.entry",
            params![day, entry],
        )
        .map_err(|e| StoreError::Query { op: "upsert", source: e })?;

        Ok(if existing > 0 { UpsertOutcome::Updated } else { UpsertOutcome::Inserted })
    }
}

/// Map user input like "senin" or "SENIN" to the stored day name.
pub fn normalize_day(input: &str) -> Option<&'static str> {
    let lower = input.trim().to_lowercase();
    WEEKDAYS.iter().find(|day| day.to_lowercase() == lower).copied()
}

/// Resolve "today" for schedule lookups in the configured timezone.
pub fn today_name(now: DateTime<Utc>, tz: Tz) -> &'static str {
    match now.with_timezone(&tz).weekday() {
        Weekday::Mon => "Senin",
        Weekday::Tue => "Selasa",
        Weekday::Wed => "Rabu",
        Weekday::Thu => "Kamis",
        Weekday::Fri => "Jumat",
        Weekday::Sat => "Sabtu",
        Weekday::Sun => "Minggu",
    }
}

pub const SCHEDULE_HEADER: &str = "<b>Donghua Schedule Today : </b>\n\n";
pub const SCHEDULE_FOOTER: &str = "\n\n<b>schedule info : </b>\n<blockquote>The schedule can change at any time depending on the admin's mood!</blockquote>#botschedule";

static LINE_BREAK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());

/// Render the stored entries into the announcement message. Stored text
/// may carry HTML `<br>` tags from whatever it was pasted out of; those
/// become real newlines.
pub fn format_schedule_message(entries: &[String]) -> String {
    let body = entries.join("\n");
    let message = format!("{SCHEDULE_HEADER}{body}{SCHEDULE_FOOTER}");
    LINE_BREAK_RE.replace_all(&message, "\n").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_get_unknown_day_is_empty() {
        let store = ScheduleStore::in_memory();
        assert_eq!(store.get("Senin").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn test_upsert_then_get() {
        let store = ScheduleStore::in_memory();
        let outcome = store.upsert("Senin", "09:00 Ep1").unwrap();
        assert_eq!(outcome, UpsertOutcome::Inserted);
        assert_eq!(store.get("Senin").unwrap(), vec!["09:00 Ep1".to_string()]);
    }

    #[test]
    fn test_upsert_overwrites_single_entry() {
        let store = ScheduleStore::in_memory();
        store.upsert("Senin", "09:00 Ep1").unwrap();
        let outcome = store.upsert("Senin", "10:00 Ep2").unwrap();
        assert_eq!(outcome, UpsertOutcome::Updated);
        assert_eq!(store.get("Senin").unwrap(), vec!["10:00 Ep2".to_string()]);
    }

    #[test]
    fn test_days_do_not_collide() {
        let store = ScheduleStore::in_memory();
        store.upsert("Senin", "a").unwrap();
        store.upsert("Selasa", "b").unwrap();
        assert_eq!(store.get("Senin").unwrap(), vec!["a".to_string()]);
        assert_eq!(store.get("Selasa").unwrap(), vec!["b".to_string()]);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("jadwal.db");

        let store = ScheduleStore::open(&path).unwrap();
        store.upsert("Kamis", "19:30 Ep12").unwrap();
        drop(store);

        let store = ScheduleStore::open(&path).unwrap();
        assert_eq!(store.get("Kamis").unwrap(), vec!["19:30 Ep12".to_string()]);
    }

    #[test]
    fn test_normalize_day() {
        assert_eq!(normalize_day("senin"), Some("Senin"));
        assert_eq!(normalize_day("SABTU"), Some("Sabtu"));
        assert_eq!(normalize_day(" minggu "), Some("Minggu"));
        assert_eq!(normalize_day("monday"), None);
        assert_eq!(normalize_day(""), None);
    }

    #[test]
    fn test_today_name_in_jakarta() {
        // 2025-06-02 is a Monday everywhere past UTC
        let noon: DateTime<Utc> = "2025-06-02T05:00:00Z".parse().unwrap();
        assert_eq!(today_name(noon, chrono_tz::Asia::Jakarta), "Senin");
    }

    #[test]
    fn test_today_name_crosses_midnight_eastward() {
        // Friday 20:00 UTC is already Saturday 03:00 in Jakarta (UTC+7)
        let late: DateTime<Utc> = "2025-06-06T20:00:00Z".parse().unwrap();
        assert_eq!(today_name(late, chrono_tz::Asia::Jakarta), "Sabtu");
        assert_eq!(today_name(late, chrono_tz::UTC), "Jumat");
    }

    #[test]
    fn test_format_wraps_entries_in_template() {
        let message = format_schedule_message(&["09:00 Ep1".to_string()]);
        assert!(message.starts_with(SCHEDULE_HEADER));
        assert!(message.ends_with(SCHEDULE_FOOTER));
        assert!(message.contains("09:00 Ep1"));
    }

    #[test]
    fn test_format_joins_entries_with_newlines() {
        let message = format_schedule_message(&["a".to_string(), "b".to_string()]);
        assert!(message.contains("a\nb"));
    }

    #[test]
    fn test_format_replaces_html_line_breaks() {
        let message = format_schedule_message(&["one<br>two<BR/>three<br />four".to_string()]);
        assert!(message.contains("one\ntwo\nthree\nfour"));
        assert!(!message.contains("<br"));
        assert!(!message.contains("<BR"));
    }
}

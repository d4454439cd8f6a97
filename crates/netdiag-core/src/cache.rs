// ── Local history cache ──
//
// SQLite table of past analysis summaries. Rows are write-once: they are
// added after a job completes, listed newest first, and deleted by id.
// Nothing here depends on a live session or job.

use std::path::Path;

use chrono::DateTime;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::debug;

use crate::error::CoreError;
use crate::model::{AnalysisHistoryRecord, NewHistoryRecord};

/// Bump when the table layout changes; a mismatch rebuilds the table.
pub const SCHEMA_VERSION: i32 = 1;

const SELECT_COLUMNS: &str =
    "SELECT id, job_id, timestamp_ms, health_score, ap_count, client_count, summary FROM analysis_history";

pub struct HistoryCache {
    conn: Mutex<Connection>,
}

impl HistoryCache {
    /// Open (or create) the cache file at `path`.
    pub fn open(path: &Path) -> Result<Self, CoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CoreError::Storage {
                message: format!("cannot create {}: {e}", parent.display()),
            })?;
        }
        debug!(path = %path.display(), "opening history cache");
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, CoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, CoreError> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Append a record and return it with its assigned id.
    pub fn save(&self, record: &NewHistoryRecord) -> Result<AnalysisHistoryRecord, CoreError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO analysis_history \
             (job_id, timestamp_ms, health_score, ap_count, client_count, summary) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                &record.job_id,
                record.timestamp.timestamp_millis(),
                record.health_score,
                record.ap_count,
                record.client_count,
                &record.summary,
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!(id, job_id = %record.job_id, "saved analysis to history");

        Ok(AnalysisHistoryRecord {
            id,
            job_id: record.job_id.clone(),
            timestamp: record.timestamp,
            health_score: record.health_score,
            ap_count: record.ap_count,
            client_count: record.client_count,
            summary: record.summary.clone(),
        })
    }

    /// Every record, newest first.
    pub fn list(&self) -> Result<Vec<AnalysisHistoryRecord>, CoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} ORDER BY timestamp_ms DESC, id DESC"
        ))?;
        let records = stmt
            .query_map([], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn latest(&self) -> Result<Option<AnalysisHistoryRecord>, CoreError> {
        let conn = self.conn.lock();
        Ok(conn
            .query_row(
                &format!("{SELECT_COLUMNS} ORDER BY timestamp_ms DESC, id DESC LIMIT 1"),
                [],
                map_row,
            )
            .optional()?)
    }

    pub fn get(&self, id: i64) -> Result<Option<AnalysisHistoryRecord>, CoreError> {
        let conn = self.conn.lock();
        Ok(conn
            .query_row(&format!("{SELECT_COLUMNS} WHERE id = ?1"), [id], map_row)
            .optional()?)
    }

    /// Remove a record. Returns whether a row was deleted.
    pub fn delete(&self, id: i64) -> Result<bool, CoreError> {
        let conn = self.conn.lock();
        let removed = conn.execute("DELETE FROM analysis_history WHERE id = ?1", [id])?;
        Ok(removed > 0)
    }
}

impl std::fmt::Debug for HistoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryCache").finish_non_exhaustive()
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    let current: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if current != SCHEMA_VERSION {
        debug!(current, expected = SCHEMA_VERSION, "rebuilding history cache schema");
        conn.execute_batch("DROP TABLE IF EXISTS analysis_history;")?;
    }

    conn.execute_batch(
        r"
        CREATE TABLE IF NOT EXISTS analysis_history (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id TEXT NOT NULL,
            timestamp_ms INTEGER NOT NULL,
            health_score REAL NOT NULL DEFAULT 0,
            ap_count INTEGER NOT NULL DEFAULT 0,
            client_count INTEGER NOT NULL DEFAULT 0,
            summary TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_history_ts ON analysis_history(timestamp_ms DESC, id DESC);
        ",
    )?;

    conn.execute(&format!("PRAGMA user_version = {SCHEMA_VERSION}"), [])?;
    Ok(())
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<AnalysisHistoryRecord> {
    let millis: i64 = row.get(2)?;
    Ok(AnalysisHistoryRecord {
        id: row.get(0)?,
        job_id: row.get(1)?,
        timestamp: DateTime::from_timestamp_millis(millis).unwrap_or_default(),
        health_score: row.get(3)?,
        ap_count: row.get(4)?,
        client_count: row.get(5)?,
        summary: row.get(6)?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use pretty_assertions::assert_eq;

    fn record(job_id: &str, minutes_ago: i64) -> NewHistoryRecord {
        NewHistoryRecord {
            job_id: job_id.into(),
            timestamp: Utc::now() - Duration::minutes(minutes_ago),
            health_score: 75.5,
            ap_count: 4,
            client_count: 31,
            summary: format!("run {job_id}"),
        }
    }

    #[test]
    fn save_assigns_increasing_ids() {
        let cache = HistoryCache::open_in_memory().unwrap();
        let a = cache.save(&record("a", 10)).unwrap();
        let b = cache.save(&record("b", 5)).unwrap();
        assert!(b.id > a.id);
        assert_eq!(cache.get(a.id).unwrap().unwrap().job_id, "a");
    }

    #[test]
    fn list_is_newest_first() {
        let cache = HistoryCache::open_in_memory().unwrap();
        cache.save(&record("old", 60)).unwrap();
        cache.save(&record("new", 1)).unwrap();
        cache.save(&record("middle", 30)).unwrap();

        let ids: Vec<String> = cache.list().unwrap().into_iter().map(|r| r.job_id).collect();
        assert_eq!(ids, vec!["new", "middle", "old"]);
        assert_eq!(cache.latest().unwrap().unwrap().job_id, "new");
    }

    #[test]
    fn equal_timestamps_break_ties_by_id() {
        let cache = HistoryCache::open_in_memory().unwrap();
        let mut first = record("first", 0);
        let ts = first.timestamp;
        cache.save(&first).unwrap();
        first.job_id = "second".into();
        first.timestamp = ts;
        cache.save(&first).unwrap();

        assert_eq!(cache.latest().unwrap().unwrap().job_id, "second");
    }

    #[test]
    fn delete_reports_whether_removed() {
        let cache = HistoryCache::open_in_memory().unwrap();
        let saved = cache.save(&record("a", 0)).unwrap();
        assert!(cache.delete(saved.id).unwrap());
        assert!(!cache.delete(saved.id).unwrap());
        assert!(cache.get(saved.id).unwrap().is_none());
        assert!(cache.latest().unwrap().is_none());
    }

    #[test]
    fn fields_survive_storage() {
        let cache = HistoryCache::open_in_memory().unwrap();
        let saved = cache.save(&record("a", 3)).unwrap();
        let loaded = cache.get(saved.id).unwrap().unwrap();
        assert!((loaded.health_score - 75.5).abs() < f64::EPSILON);
        assert_eq!(loaded.ap_count, 4);
        assert_eq!(loaded.client_count, 31);
        assert_eq!(loaded.summary, "run a");
        assert_eq!(
            loaded.timestamp.timestamp_millis(),
            saved.timestamp.timestamp_millis()
        );
    }

    #[test]
    fn reopening_file_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history.db");

        let id = {
            let cache = HistoryCache::open(&path).unwrap();
            cache.save(&record("persisted", 0)).unwrap().id
        };

        let cache = HistoryCache::open(&path).unwrap();
        assert_eq!(cache.get(id).unwrap().unwrap().job_id, "persisted");
    }

    #[test]
    fn schema_version_mismatch_rebuilds() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");
        {
            let cache = HistoryCache::open(&path).unwrap();
            cache.save(&record("stale", 0)).unwrap();
        }
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute("PRAGMA user_version = 999", []).unwrap();
        }

        let cache = HistoryCache::open(&path).unwrap();
        assert!(cache.list().unwrap().is_empty());
    }
}

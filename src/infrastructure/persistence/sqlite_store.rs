use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};

use crate::domain::entities::snapshot::Snapshot;
use crate::domain::ports::store::{HistoricalQuery, StoreError, TimeSeriesSink};
use crate::domain::value_objects::history::{HistoricalMetric, HistoricalPoint, TimeRange};

use super::migrations;

/// Fixed-width UTC timestamps so text comparison orders them correctly.
fn db_time(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// SQLite-backed time-series store: one row per snapshot series point.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Create a new `SQLite` store at the given path.
    ///
    /// Expands `~`, creates parent directories, opens connection,
    /// sets WAL mode and pragmas, and initializes schema.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the database cannot be opened or initialized.
    pub fn new(path: &str) -> Result<Self, StoreError> {
        let expanded = shellexpand::tilde(path);
        let db_path = PathBuf::from(expanded.as_ref());

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        }

        let conn =
            Connection::open(&db_path).map_err(|e| StoreError::Unavailable(e.to_string()))?;

        conn.pragma_update(None, "journal_mode", "WAL")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        conn.pragma_update(None, "synchronous", "NORMAL")
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        conn.pragma_update(None, "busy_timeout", 5000)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        Self::with_connection(conn)
    }

    /// Store that lives only as long as the process.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Unavailable` if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        migrations::initialize_schema(&conn)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Remove samples older than the given retention period. Returns how
    /// many rows were deleted.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::WriteFailed` if deletion fails.
    pub fn cleanup_old(&self, retention_hours: u64) -> Result<usize, StoreError> {
        let hours =
            i64::try_from(retention_hours).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        let delta = chrono::TimeDelta::try_hours(hours)
            .ok_or_else(|| StoreError::WriteFailed("invalid retention hours".into()))?;
        let cutoff = Utc::now()
            .checked_sub_signed(delta)
            .map(db_time)
            .ok_or_else(|| StoreError::WriteFailed("retention window out of range".into()))?;

        let conn = self
            .conn
            .lock()
            .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;

        let deleted = conn
            .execute(
                "DELETE FROM samples WHERE recorded_at < ?1",
                params![cutoff],
            )
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;

        drop(conn);
        Ok(deleted)
    }

    /// Writes every series point of `snapshot` in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::WriteFailed` if the insert fails.
    pub fn insert_snapshot(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        insert_points(&self.conn, snapshot)
    }

    /// Points for `metric` recorded at or after `since`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::ReadFailed` if the query fails.
    pub fn points_since(
        &self,
        metric: HistoricalMetric,
        since: DateTime<Utc>,
    ) -> Result<Vec<HistoricalPoint>, StoreError> {
        select_points(&self.conn, metric, since)
    }
}

fn insert_points(conn: &Mutex<Connection>, snapshot: &Snapshot) -> Result<(), StoreError> {
    let recorded_at = db_time(snapshot.timestamp);
    let mut conn = conn
        .lock()
        .map_err(|_| StoreError::WriteFailed("lock poisoned".into()))?;

    let tx = conn
        .transaction()
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
    {
        let mut stmt = tx
            .prepare_cached(
                "INSERT INTO samples (recorded_at, measurement, field, value) \
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        for point in snapshot.series_points() {
            stmt.execute(params![
                recorded_at,
                point.measurement,
                point.field,
                point.value
            ])
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        }
    }
    tx.commit()
        .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
    Ok(())
}

fn parse_point_row(row: &rusqlite::Row<'_>) -> Result<(DateTime<Utc>, String, f64), rusqlite::Error> {
    let recorded_at: String = row.get(0)?;
    let field: String = row.get(1)?;
    let value: f64 = row.get(2)?;

    let timestamp = DateTime::parse_from_rfc3339(&recorded_at)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok((timestamp, field, value))
}

fn select_points(
    conn: &Mutex<Connection>,
    metric: HistoricalMetric,
    since: DateTime<Utc>,
) -> Result<Vec<HistoricalPoint>, StoreError> {
    let conn = conn
        .lock()
        .map_err(|_| StoreError::ReadFailed("lock poisoned".into()))?;

    let mut stmt = conn
        .prepare_cached(
            "SELECT recorded_at, field, value FROM samples \
             WHERE measurement = ?1 AND field = ?2 AND recorded_at >= ?3 \
             ORDER BY recorded_at, id",
        )
        .map_err(|e| StoreError::ReadFailed(e.to_string()))?;

    let since = db_time(since);
    let mut points = Vec::new();
    for field in metric.fields() {
        let rows = stmt
            .query_map(params![metric.measurement(), field, since], parse_point_row)
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?;
        points.extend(rows.into_iter().map(|(timestamp, field, value)| HistoricalPoint {
            timestamp,
            field: metric.is_multi_field().then_some(field),
            value,
        }));
    }
    drop(stmt);
    drop(conn);

    points.sort_by_key(|p| p.timestamp);
    Ok(points)
}

#[async_trait]
impl TimeSeriesSink for SqliteStore {
    async fn write(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        let conn = Arc::clone(&self.conn);
        let snapshot = snapshot.clone();
        tokio::task::spawn_blocking(move || insert_points(&conn, &snapshot))
            .await
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?
    }
}

#[async_trait]
impl HistoricalQuery for SqliteStore {
    async fn query(
        &self,
        metric: HistoricalMetric,
        range: TimeRange,
    ) -> Result<Vec<HistoricalPoint>, StoreError> {
        let conn = Arc::clone(&self.conn);
        let since = range.start_from(Utc::now());
        tokio::task::spawn_blocking(move || select_points(&conn, metric, since))
            .await
            .map_err(|e| StoreError::ReadFailed(e.to_string()))?
    }
}

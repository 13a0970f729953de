use rusqlite::Connection;

/// Initialize the database schema, creating tables if they don't exist.
///
/// # Errors
/// Returns `rusqlite::Error` if any SQL statement fails.
pub fn initialize_schema(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS samples (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            recorded_at TEXT    NOT NULL,
            measurement TEXT    NOT NULL,
            field       TEXT    NOT NULL,
            value       REAL    NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_samples_series
            ON samples(measurement, field, recorded_at);
        CREATE INDEX IF NOT EXISTS idx_samples_recorded_at ON samples(recorded_at);",
    )?;
    Ok(())
}

use crate::domain::error::DomainError;
use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> Result<(), DomainError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS tokens (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            access_token TEXT NOT NULL,
            refresh_token TEXT,
            expires_at TEXT,
            updated_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS run_lock (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            holder TEXT NOT NULL,
            acquired_at TEXT NOT NULL
        );
        "
    ).map_err(|e| DomainError::Storage(format!("Migration failed: {e}")))
}

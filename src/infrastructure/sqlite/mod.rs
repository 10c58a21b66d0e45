pub mod migrations;
pub mod run_lock;
pub mod token_repo;

use crate::domain::error::DomainError;
use rusqlite::Connection;
use std::time::Duration;

/// Open the state database in WAL mode and apply migrations.
pub fn open_database(path: &str) -> Result<Connection, DomainError> {
    let conn = Connection::open(path)
        .map_err(|e| DomainError::Storage(format!("DB error ({path}): {e}")))?;
    conn.pragma_update(None, "journal_mode", "WAL")
        .map_err(|e| DomainError::Storage(format!("WAL error: {e}")))?;
    conn.busy_timeout(Duration::from_secs(5))?;
    migrations::run_migrations(&conn)?;
    Ok(conn)
}

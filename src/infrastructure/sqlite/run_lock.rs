use crate::domain::error::DomainError;
use crate::domain::ports::run_lock::RunLock;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use std::sync::Mutex;
use tracing::warn;

/// Run marker stored as a single row. A marker older than `stale_after`
/// belongs to a run that died without releasing it and is taken over.
pub struct SqliteRunLock {
    conn: Mutex<Connection>,
    stale_after: Duration,
}

impl SqliteRunLock {
    pub fn new(conn: Connection, stale_after: Duration) -> Self {
        Self {
            conn: Mutex::new(conn),
            stale_after,
        }
    }
}

impl RunLock for SqliteRunLock {
    fn try_acquire(&self, holder: &str) -> Result<Option<String>, DomainError> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<(String, String)> = tx
            .query_row(
                "SELECT holder, acquired_at FROM run_lock WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let now = Utc::now();
        if let Some((current_holder, acquired_str)) = current {
            let acquired_at = DateTime::parse_from_rfc3339(&acquired_str)
                .map(|dt| dt.with_timezone(&Utc))
                .ok();
            match acquired_at {
                Some(at) if now - at < self.stale_after => return Ok(Some(current_holder)),
                _ => warn!(
                    stale_holder = %current_holder,
                    acquired_at = %acquired_str,
                    "Taking over stale run marker"
                ),
            }
        }

        tx.execute(
            "INSERT INTO run_lock (id, holder, acquired_at) VALUES (1, ?1, ?2)
             ON CONFLICT(id) DO UPDATE SET holder = excluded.holder, acquired_at = excluded.acquired_at",
            params![holder, now.to_rfc3339()],
        )?;
        tx.commit()?;
        Ok(None)
    }

    fn release(&self, holder: &str) -> Result<(), DomainError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let rows = conn.execute("DELETE FROM run_lock WHERE holder = ?1", params![holder])?;
        if rows == 0 {
            warn!(holder, "Run marker was already gone or taken over");
        }
        Ok(())
    }
}

use crate::domain::entities::token::Token;
use crate::domain::error::DomainError;
use crate::domain::ports::token_provider::TokenStore;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Mutex;
use tracing::warn;

/// Single-row token table.
pub struct SqliteTokenStore {
    conn: Mutex<Connection>,
}

impl SqliteTokenStore {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }
}

impl TokenStore for SqliteTokenStore {
    fn load(&self) -> Result<Option<Token>, DomainError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        let row = conn
            .query_row(
                "SELECT access_token, refresh_token, expires_at FROM tokens WHERE id = 1",
                [],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, Option<String>>(1)?,
                        row.get::<_, Option<String>>(2)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| DomainError::Storage(format!("Failed to load token: {e}")))?;

        Ok(row.map(|(access, refresh, expires_str)| Token {
            access,
            refresh,
            expires_at: expires_str.and_then(|s| match DateTime::parse_from_rfc3339(&s) {
                Ok(dt) => Some(dt.with_timezone(&Utc)),
                Err(_) => {
                    warn!("Invalid stored token expiry '{s}', treating as expired");
                    None
                }
            }),
        }))
    }

    fn save(&self, token: &Token) -> Result<(), DomainError> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DomainError::Storage(e.to_string()))?;
        conn.execute(
            "INSERT INTO tokens (id, access_token, refresh_token, expires_at, updated_at)
             VALUES (1, ?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = excluded.refresh_token,
                expires_at = excluded.expires_at,
                updated_at = excluded.updated_at",
            params![
                token.access,
                token.refresh,
                token.expires_at.map(|dt| dt.to_rfc3339()),
                Utc::now().to_rfc3339(),
            ],
        )
        .map_err(|e| DomainError::Storage(format!("Failed to save token: {e}")))?;
        Ok(())
    }
}

//! SQLite-backed status ledger.
//!
//! Insert-only: no update or delete path exists. The current status is a
//! projection over the latest event, with the row id as tiebreaker for
//! events sharing a timestamp.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use casebridge_core::StatusLedger;
use casebridge_domain::{CaseStatus, Result as DomainResult, StatusEvent};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use uuid::Uuid;

use super::manager::{map_join_error, map_sql_error, DbManager};
use super::{micros_to_datetime, now_micros, parse_uuid};

/// SQLite implementation of [`StatusLedger`].
pub struct SqliteStatusLedger {
    db: Arc<DbManager>,
}

impl SqliteStatusLedger {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl StatusLedger for SqliteStatusLedger {
    async fn append(&self, application_id: Uuid, status: CaseStatus) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO status_events (application_id, status, created_at)
                 VALUES (?1, ?2, ?3)",
                params![application_id.to_string(), status.as_str(), now_micros()],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn current(&self, application_id: Uuid) -> DomainResult<Option<CaseStatus>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<CaseStatus>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT status FROM status_events
                 WHERE application_id = ?1
                 ORDER BY created_at DESC, id DESC LIMIT 1",
                params![application_id.to_string()],
                |row| {
                    let raw: String = row.get(0)?;
                    CaseStatus::from_str(&raw).map_err(|err| {
                        rusqlite::Error::FromSqlConversionFailure(
                            0,
                            rusqlite::types::Type::Text,
                            err.into(),
                        )
                    })
                },
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn history(&self, application_id: Uuid) -> DomainResult<Vec<StatusEvent>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<StatusEvent>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, application_id, status, created_at FROM status_events
                     WHERE application_id = ?1
                     ORDER BY created_at ASC, id ASC",
                )
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![application_id.to_string()], map_event_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_event_row(row: &Row<'_>) -> rusqlite::Result<StatusEvent> {
    let application_id: String = row.get(1)?;
    let status_raw: String = row.get(2)?;
    let status = CaseStatus::from_str(&status_raw).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, err.into())
    })?;
    let created_at: i64 = row.get(3)?;

    Ok(StatusEvent {
        id: row.get(0)?,
        application_id: parse_uuid(1, &application_id)?,
        status,
        created_at: micros_to_datetime(3, created_at)?,
    })
}

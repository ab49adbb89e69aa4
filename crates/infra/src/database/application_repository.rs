//! SQLite-backed application repository.
//!
//! Candidate selection joins the application's backend status against the
//! latest ledger event, one predicate per batch operation.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use casebridge_core::{ApplicationRepository, BatchOperation, RequestType};
use casebridge_domain::{Application, ApplicationStatus, BridgeError, Result as DomainResult};
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use uuid::Uuid;

use super::manager::{map_join_error, map_sql_error, DbManager};
use super::parse_uuid;

/// SQLite implementation of [`ApplicationRepository`].
pub struct SqliteApplicationRepository {
    db: Arc<DbManager>,
}

impl SqliteApplicationRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Insert an application row. Application CRUD is owned by the
    /// surrounding backend; this exists for seeding and tests.
    pub async fn insert(&self, application: &Application) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let application = application.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO applications (
                    id, application_number, status, case_id, case_guid,
                    handler_username, batch_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    application.id.to_string(),
                    application.application_number,
                    application.status.as_str(),
                    application.case_id,
                    application.case_guid,
                    application.handler_username,
                    application.batch_id.map(|id| id.to_string()),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl ApplicationRepository for SqliteApplicationRepository {
    async fn find_candidates(
        &self,
        operation: BatchOperation,
        limit: usize,
    ) -> DomainResult<Vec<Application>> {
        if limit == 0 {
            return Ok(Vec::new());
        }

        let db = Arc::clone(&self.db);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        task::spawn_blocking(move || -> DomainResult<Vec<Application>> {
            let conn = db.get_connection()?;
            let mut stmt = conn.prepare(candidate_sql(operation)).map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![limit], map_application_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get(&self, id: Uuid) -> DomainResult<Application> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Application> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT id, application_number, status, case_id, case_guid,
                        handler_username, batch_id
                 FROM applications WHERE id = ?1",
                params![id.to_string()],
                map_application_row,
            )
            .optional()
            .map_err(map_sql_error)?
            .ok_or_else(|| BridgeError::NotFound(format!("application {id}")))
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_case_guid(&self, id: Uuid, case_guid: &str) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let case_guid = case_guid.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let updated = conn
                .execute(
                    "UPDATE applications SET case_guid = ?2 WHERE id = ?1",
                    params![id.to_string(), case_guid],
                )
                .map_err(map_sql_error)?;
            if updated == 0 {
                return Err(BridgeError::NotFound(format!("application {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_case_identifiers(
        &self,
        id: Uuid,
        case_id: Option<&str>,
        case_guid: Option<&str>,
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let case_id = case_id.map(str::to_string);
        let case_guid = case_guid.map(str::to_string);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let updated = conn
                .execute(
                    "UPDATE applications
                     SET case_id = COALESCE(?2, case_id),
                         case_guid = COALESCE(?3, case_guid)
                     WHERE id = ?1",
                    params![id.to_string(), case_id, case_guid],
                )
                .map_err(map_sql_error)?;
            if updated == 0 {
                return Err(BridgeError::NotFound(format!("application {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

/// Status predicate per operation, joined against the latest ledger event.
fn candidate_sql(operation: BatchOperation) -> &'static str {
    match operation {
        BatchOperation::Dispatch(RequestType::OpenCase) => {
            "SELECT a.id, a.application_number, a.status, a.case_id, a.case_guid,
                    a.handler_username, a.batch_id
             FROM applications a
             WHERE a.status = 'handling'
               AND (SELECT se.status FROM status_events se
                    WHERE se.application_id = a.id
                    ORDER BY se.created_at DESC, se.id DESC LIMIT 1) = 'submitted_but_not_sent'
             ORDER BY a.application_number LIMIT ?1"
        }
        BatchOperation::Dispatch(RequestType::DecisionProposal) => {
            "SELECT a.id, a.application_number, a.status, a.case_id, a.case_guid,
                    a.handler_username, a.batch_id
             FROM applications a
             WHERE a.status IN ('accepted', 'rejected')
               AND (SELECT se.status FROM status_events se
                    WHERE se.application_id = a.id
                    ORDER BY se.created_at DESC, se.id DESC LIMIT 1) = 'case_opened'
             ORDER BY a.application_number LIMIT ?1"
        }
        BatchOperation::Dispatch(RequestType::UpdateRecords) => {
            "SELECT a.id, a.application_number, a.status, a.case_id, a.case_guid,
                    a.handler_username, a.batch_id
             FROM applications a
             WHERE (SELECT se.status FROM status_events se
                    WHERE se.application_id = a.id
                    ORDER BY se.created_at DESC, se.id DESC LIMIT 1) = 'decision_proposal_accepted'
             ORDER BY a.application_number LIMIT ?1"
        }
        BatchOperation::Dispatch(RequestType::AddRecords) => {
            "SELECT a.id, a.application_number, a.status, a.case_id, a.case_guid,
                    a.handler_username, a.batch_id
             FROM applications a
             WHERE (SELECT se.status FROM status_events se
                    WHERE se.application_id = a.id
                    ORDER BY se.created_at DESC, se.id DESC LIMIT 1) = 'case_opened'
               AND EXISTS (SELECT 1 FROM attachments t
                           WHERE t.application_id = a.id
                             AND t.version_series_id IS NULL)
             ORDER BY a.application_number LIMIT ?1"
        }
        BatchOperation::Dispatch(RequestType::DeleteCase) => {
            "SELECT a.id, a.application_number, a.status, a.case_id, a.case_guid,
                    a.handler_username, a.batch_id
             FROM applications a
             WHERE a.status = 'cancelled'
               AND (SELECT se.status FROM status_events se
                    WHERE se.application_id = a.id
                    ORDER BY se.created_at DESC, se.id DESC LIMIT 1) = 'case_opened'
             ORDER BY a.application_number LIMIT ?1"
        }
        BatchOperation::FetchDecisions => {
            "SELECT a.id, a.application_number, a.status, a.case_id, a.case_guid,
                    a.handler_username, a.batch_id
             FROM applications a
             WHERE a.case_id IS NOT NULL
               AND (SELECT se.status FROM status_events se
                    WHERE se.application_id = a.id
                    ORDER BY se.created_at DESC, se.id DESC LIMIT 1) = 'signed_in_registry'
             ORDER BY a.application_number LIMIT ?1"
        }
    }
}

fn map_application_row(row: &Row<'_>) -> rusqlite::Result<Application> {
    let id: String = row.get(0)?;
    let status_raw: String = row.get(2)?;
    let status = ApplicationStatus::from_str(&status_raw).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, err.into())
    })?;
    let batch_id: Option<String> = row.get(6)?;
    let batch_id = batch_id.map(|raw| parse_uuid(6, &raw)).transpose()?;

    Ok(Application {
        id: parse_uuid(0, &id)?,
        application_number: row.get(1)?,
        status,
        case_id: row.get(3)?,
        case_guid: row.get(4)?,
        handler_username: row.get(5)?,
        batch_id,
    })
}

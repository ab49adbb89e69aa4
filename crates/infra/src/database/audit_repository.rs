//! SQLite-backed audit trail.

use std::sync::Arc;

use async_trait::async_trait;
use casebridge_core::AuditLog;
use casebridge_domain::{AuditEntry, Result as DomainResult};
use rusqlite::{params, Row};
use tokio::task;
use uuid::Uuid;

use super::manager::{map_join_error, map_sql_error, DbManager};
use super::{micros_to_datetime, now_micros, parse_uuid};

/// SQLite implementation of [`AuditLog`].
pub struct SqliteAuditLog {
    db: Arc<DbManager>,
}

impl SqliteAuditLog {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// All audit entries of one application, oldest first.
    pub async fn entries_for(&self, application_id: Uuid) -> DomainResult<Vec<AuditEntry>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<AuditEntry>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, application_id, operation, message, created_at
                     FROM audit_log WHERE application_id = ?1
                     ORDER BY created_at ASC, id ASC",
                )
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![application_id.to_string()], map_audit_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl AuditLog for SqliteAuditLog {
    async fn record(
        &self,
        application_id: Uuid,
        operation: &str,
        message: &str,
    ) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let operation = operation.to_string();
        let message = message.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO audit_log (application_id, operation, message, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![application_id.to_string(), operation, message, now_micros()],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_audit_row(row: &Row<'_>) -> rusqlite::Result<AuditEntry> {
    let application_id: String = row.get(1)?;
    let created_at: i64 = row.get(4)?;

    Ok(AuditEntry {
        id: row.get(0)?,
        application_id: parse_uuid(1, &application_id)?,
        operation: row.get(2)?,
        message: row.get(3)?,
        created_at: micros_to_datetime(4, created_at)?,
    })
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn entries_are_recorded_in_order() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let db = Arc::new(
            DbManager::new(temp_dir.path().join("test.db"), 4).expect("manager created"),
        );
        db.run_migrations().expect("migrations run");
        let audit = SqliteAuditLog::new(db);

        let application_id = Uuid::new_v4();
        audit.record(application_id, "open_case", "case opened").await.expect("record");
        audit.record(application_id, "delete_case", "case deleted").await.expect("record");

        let entries = audit.entries_for(application_id).await.expect("entries");
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].operation, "open_case");
        assert_eq!(entries[1].operation, "delete_case");
    }
}

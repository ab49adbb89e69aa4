//! SQLite-backed decision batch repository.

use std::sync::Arc;

use async_trait::async_trait;
use casebridge_core::BatchRepository;
use casebridge_domain::{ApplicationBatch, BridgeError, DecisionDetails, Result as DomainResult};
use chrono::DateTime;
use rusqlite::{params, OptionalExtension, Row};
use tokio::task;
use uuid::Uuid;

use super::manager::{map_join_error, map_sql_error, DbManager};
use super::parse_uuid;

/// SQLite implementation of [`BatchRepository`].
pub struct SqliteBatchRepository {
    db: Arc<DbManager>,
}

impl SqliteBatchRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Insert a bare batch row for seeding and tests.
    pub async fn insert(&self, id: Uuid) -> DomainResult<()> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO application_batches (id, status) VALUES (?1, 'created')",
                params![id.to_string()],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    /// Fetch one batch by id.
    pub async fn get(&self, id: Uuid) -> DomainResult<ApplicationBatch> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<ApplicationBatch> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT id, status, decision_maker_name, decision_maker_title,
                        section_of_law, decision_date
                 FROM application_batches WHERE id = ?1",
                params![id.to_string()],
                map_batch_row,
            )
            .optional()
            .map_err(map_sql_error)?
            .ok_or_else(|| BridgeError::NotFound(format!("batch {id}")))
        })
        .await
        .map_err(map_join_error)?
    }
}

#[async_trait]
impl BatchRepository for SqliteBatchRepository {
    async fn record_decision(&self, batch_id: Uuid, details: &DecisionDetails) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let details = details.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let updated = conn
                .execute(
                    "UPDATE application_batches
                     SET decision_maker_name = ?2,
                         decision_maker_title = ?3,
                         section_of_law = ?4,
                         decision_date = ?5,
                         status = 'decided'
                     WHERE id = ?1",
                    params![
                        batch_id.to_string(),
                        details.decision_maker_name,
                        details.decision_maker_title,
                        details.section_of_law,
                        details.decision_date.to_rfc3339(),
                    ],
                )
                .map_err(map_sql_error)?;
            if updated == 0 {
                return Err(BridgeError::NotFound(format!("batch {batch_id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_batch_row(row: &Row<'_>) -> rusqlite::Result<ApplicationBatch> {
    let id: String = row.get(0)?;
    let decision_date: Option<String> = row.get(5)?;
    let decision_date = decision_date
        .map(|raw| {
            DateTime::parse_from_rfc3339(&raw)
                .map(|dt| dt.to_utc())
                .map_err(|err| {
                    rusqlite::Error::FromSqlConversionFailure(
                        5,
                        rusqlite::types::Type::Text,
                        Box::new(err),
                    )
                })
        })
        .transpose()?;

    Ok(ApplicationBatch {
        id: parse_uuid(0, &id)?,
        status: row.get(1)?,
        decision_maker_name: row.get(2)?,
        decision_maker_title: row.get(3)?,
        section_of_law: row.get(4)?,
        decision_date,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;

    #[tokio::test]
    async fn record_decision_fills_the_batch_fields() {
        let temp_dir = TempDir::new().expect("temp dir created");
        let db = Arc::new(
            DbManager::new(temp_dir.path().join("test.db"), 4).expect("manager created"),
        );
        db.run_migrations().expect("migrations run");
        let repo = SqliteBatchRepository::new(db);

        let batch_id = Uuid::new_v4();
        repo.insert(batch_id).await.expect("insert");

        let details = DecisionDetails {
            decision_maker_name: "Maija Meikäläinen".to_string(),
            decision_maker_title: "Head of Unit".to_string(),
            section_of_law: "12 §".to_string(),
            decision_date: Utc::now(),
        };
        repo.record_decision(batch_id, &details).await.expect("record");

        let stored = repo.get(batch_id).await.expect("get");
        assert_eq!(stored.status, "decided");
        assert_eq!(stored.decision_maker_name.as_deref(), Some("Maija Meikäläinen"));
        assert_eq!(stored.section_of_law.as_deref(), Some("12 §"));
        assert!(stored.decision_date.is_some());
    }
}

//! SQLite-backed payment installment repository.

use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use casebridge_core::InstallmentRepository;
use casebridge_domain::{InstallmentStatus, PaymentInstallment, Result as DomainResult};
use chrono::NaiveDate;
use rusqlite::{params, Row};
use tokio::task;
use uuid::Uuid;

use super::manager::{map_join_error, map_sql_error, DbManager};
use super::parse_uuid;

/// SQLite implementation of [`InstallmentRepository`].
pub struct SqliteInstallmentRepository {
    db: Arc<DbManager>,
}

impl SqliteInstallmentRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Insert an installment row for seeding and tests.
    pub async fn insert(&self, installment: &PaymentInstallment) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let installment = installment.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO payment_installments (
                    id, application_id, amount_cents, due_date, status
                ) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    installment.id.to_string(),
                    installment.application_id.to_string(),
                    installment.amount_cents,
                    installment.due_date.to_string(),
                    installment.status.as_str(),
                ],
            )
            .map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }

    /// All installments of one application, ordered by due date.
    pub async fn for_application(
        &self,
        application_id: Uuid,
    ) -> DomainResult<Vec<PaymentInstallment>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<PaymentInstallment>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, application_id, amount_cents, due_date, status
                     FROM payment_installments
                     WHERE application_id = ?1 ORDER BY due_date",
                )
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![application_id.to_string()], map_installment_row)
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
impl InstallmentRepository for SqliteInstallmentRepository {
    async fn promote_due_pending(
        &self,
        application_id: Uuid,
        today: NaiveDate,
    ) -> DomainResult<u64> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<u64> {
            let conn = db.get_connection()?;
            let updated = conn
                .execute(
                    "UPDATE payment_installments SET status = 'accepted'
                     WHERE application_id = ?1 AND status = 'pending' AND due_date <= ?2",
                    params![application_id.to_string(), today.to_string()],
                )
                .map_err(map_sql_error)?;
            Ok(updated as u64)
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_installment_row(row: &Row<'_>) -> rusqlite::Result<PaymentInstallment> {
    let id: String = row.get(0)?;
    let application_id: String = row.get(1)?;
    let due_date: String = row.get(3)?;
    let status_raw: String = row.get(4)?;

    let due_date = NaiveDate::parse_from_str(&due_date, "%Y-%m-%d").map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(err))
    })?;
    let status = InstallmentStatus::from_str(&status_raw).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, err.into())
    })?;

    Ok(PaymentInstallment {
        id: parse_uuid(0, &id)?,
        application_id: parse_uuid(1, &application_id)?,
        amount_cents: row.get(2)?,
        due_date,
        status,
    })
}

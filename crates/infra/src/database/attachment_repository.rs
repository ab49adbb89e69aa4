//! SQLite-backed attachment repository.

use std::sync::Arc;

use async_trait::async_trait;
use casebridge_core::AttachmentRepository;
use casebridge_domain::{Attachment, BridgeError, Result as DomainResult};
use rusqlite::{params, OptionalExtension, Row};
use sha2::{Digest, Sha256};
use tokio::task;
use uuid::Uuid;

use super::manager::{map_join_error, map_sql_error, DbManager};
use super::parse_uuid;

/// Hex SHA-256 of attachment content, as stored in `content_hash` and
/// compared against callback-supplied record hashes.
#[must_use]
pub fn compute_content_hash(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

/// SQLite implementation of [`AttachmentRepository`].
pub struct SqliteAttachmentRepository {
    db: Arc<DbManager>,
}

impl SqliteAttachmentRepository {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }

    /// Insert an attachment row. Upload handling is owned by the
    /// surrounding backend; this exists for seeding and tests.
    pub async fn insert(&self, attachment: &Attachment) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let attachment = attachment.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            conn.execute(
                "INSERT INTO attachments (
                    id, application_id, file_name, content_type, path,
                    content_hash, version_series_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    attachment.id.to_string(),
                    attachment.application_id.to_string(),
                    attachment.file_name,
                    attachment.content_type,
                    attachment.path,
                    attachment.content_hash,
                    attachment.version_series_id,
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
impl AttachmentRepository for SqliteAttachmentRepository {
    async fn for_application(&self, application_id: Uuid) -> DomainResult<Vec<Attachment>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Vec<Attachment>> {
            let conn = db.get_connection()?;
            let mut stmt = conn
                .prepare(
                    "SELECT id, application_id, file_name, content_type, path,
                            content_hash, version_series_id
                     FROM attachments WHERE application_id = ?1
                     ORDER BY file_name",
                )
                .map_err(map_sql_error)?;
            let rows = stmt
                .query_map(params![application_id.to_string()], map_attachment_row)
                .map_err(map_sql_error)?
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(map_sql_error)?;
            Ok(rows)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<Attachment>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<Attachment>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT id, application_id, file_name, content_type, path,
                        content_hash, version_series_id
                 FROM attachments WHERE id = ?1",
                params![id.to_string()],
                map_attachment_row,
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn set_version_series_id(&self, id: Uuid, version_series_id: &str) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let version_series_id = version_series_id.to_string();

        task::spawn_blocking(move || -> DomainResult<()> {
            let conn = db.get_connection()?;
            let updated = conn
                .execute(
                    "UPDATE attachments SET version_series_id = ?2 WHERE id = ?1",
                    params![id.to_string(), version_series_id],
                )
                .map_err(map_sql_error)?;
            if updated == 0 {
                return Err(BridgeError::NotFound(format!("attachment {id}")));
            }
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

fn map_attachment_row(row: &Row<'_>) -> rusqlite::Result<Attachment> {
    let id: String = row.get(0)?;
    let application_id: String = row.get(1)?;

    Ok(Attachment {
        id: parse_uuid(0, &id)?,
        application_id: parse_uuid(1, &application_id)?,
        file_name: row.get(2)?,
        content_type: row.get(3)?,
        path: row.get(4)?,
        content_hash: row.get(5)?,
        version_series_id: row.get(6)?,
    })
}

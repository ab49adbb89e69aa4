//! Single-slot token store.
//!
//! At most one token row exists at any time. `put` removes the old row and
//! inserts the replacement inside one transaction, so a reader never
//! observes two rows or computes expiry against a stale predecessor.

use std::sync::Arc;

use async_trait::async_trait;
use casebridge_core::TokenStore;
use casebridge_domain::constants::TOKEN_ROW_NAME;
use casebridge_domain::{RegistryToken, Result as DomainResult};
use rusqlite::{params, OptionalExtension};
use tokio::task;

use super::manager::{map_join_error, map_sql_error, DbManager};
use super::micros_to_datetime;

/// SQLite implementation of [`TokenStore`].
pub struct SqliteTokenStore {
    db: Arc<DbManager>,
}

impl SqliteTokenStore {
    pub fn new(db: Arc<DbManager>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TokenStore for SqliteTokenStore {
    async fn get(&self) -> DomainResult<Option<RegistryToken>> {
        let db = Arc::clone(&self.db);

        task::spawn_blocking(move || -> DomainResult<Option<RegistryToken>> {
            let conn = db.get_connection()?;
            conn.query_row(
                "SELECT access_token, refresh_token, expires_in, created_at
                 FROM registry_tokens WHERE name = ?1",
                params![TOKEN_ROW_NAME],
                |row| {
                    let created_at: i64 = row.get(3)?;
                    Ok(RegistryToken {
                        access_token: row.get(0)?,
                        refresh_token: row.get(1)?,
                        expires_in: row.get(2)?,
                        created_at: micros_to_datetime(3, created_at)?,
                    })
                },
            )
            .optional()
            .map_err(map_sql_error)
        })
        .await
        .map_err(map_join_error)?
    }

    async fn put(&self, token: &RegistryToken) -> DomainResult<()> {
        let db = Arc::clone(&self.db);
        let token = token.clone();

        task::spawn_blocking(move || -> DomainResult<()> {
            let mut conn = db.get_connection()?;
            let tx = conn.transaction().map_err(map_sql_error)?;
            tx.execute("DELETE FROM registry_tokens", params![]).map_err(map_sql_error)?;
            tx.execute(
                "INSERT INTO registry_tokens
                    (name, access_token, refresh_token, expires_in, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    TOKEN_ROW_NAME,
                    token.access_token,
                    token.refresh_token,
                    token.expires_in,
                    token.created_at.timestamp_micros(),
                ],
            )
            .map_err(map_sql_error)?;
            tx.commit().map_err(map_sql_error)?;
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;

    async fn store() -> (TempDir, Arc<DbManager>, SqliteTokenStore) {
        let temp_dir = TempDir::new().expect("temp dir created");
        let db = Arc::new(
            DbManager::new(temp_dir.path().join("test.db"), 4).expect("manager created"),
        );
        db.run_migrations().expect("migrations run");
        let store = SqliteTokenStore::new(db.clone());
        (temp_dir, db, store)
    }

    fn token(access: &str) -> RegistryToken {
        RegistryToken::new(access.to_string(), format!("refresh-{access}"), 3600, Utc::now())
    }

    fn row_count(db: &DbManager) -> i64 {
        let conn = db.get_connection().expect("connection acquired");
        conn.query_row("SELECT COUNT(*) FROM registry_tokens", params![], |row| row.get(0))
            .expect("count")
    }

    #[tokio::test]
    async fn empty_store_returns_none() {
        let (_guard, _db, store) = store().await;
        assert!(store.get().await.expect("get").is_none());
    }

    /// After N sequential replacements exactly one row exists and its
    /// fields equal the Nth token.
    #[tokio::test]
    async fn replacement_is_atomic_and_single_row() {
        let (_guard, db, store) = store().await;

        for i in 1..=3 {
            store.put(&token(&format!("access-{i}"))).await.expect("put");
        }

        assert_eq!(row_count(&db), 1);
        let stored = store.get().await.expect("get").expect("token present");
        assert_eq!(stored.access_token, "access-3");
        assert_eq!(stored.refresh_token, "refresh-access-3");
    }

    #[tokio::test]
    async fn created_at_round_trips_with_microsecond_precision() {
        let (_guard, _db, store) = store().await;

        let original = token("access-a");
        store.put(&original).await.expect("put");
        let stored = store.get().await.expect("get").expect("token present");

        assert_eq!(stored.created_at.timestamp_micros(), original.created_at.timestamp_micros());
    }
}

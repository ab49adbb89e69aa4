//! SQLite-backed implementations of the core persistence ports.

pub mod application_repository;
pub mod attachment_repository;
pub mod audit_repository;
pub mod batch_repository;
pub mod installment_repository;
pub mod manager;
pub mod status_event_repository;
pub mod token_repository;

pub use application_repository::SqliteApplicationRepository;
pub use attachment_repository::{compute_content_hash, SqliteAttachmentRepository};
pub use audit_repository::SqliteAuditLog;
pub use batch_repository::SqliteBatchRepository;
pub use installment_repository::SqliteInstallmentRepository;
pub use manager::{DbConnection, DbManager};
pub use status_event_repository::SqliteStatusLedger;
pub use token_repository::SqliteTokenStore;

use chrono::{DateTime, Utc};
use uuid::Uuid;

pub(crate) fn parse_uuid(index: usize, raw: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(raw).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Text,
            Box::new(err),
        )
    })
}

pub(crate) fn micros_to_datetime(index: usize, micros: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(micros).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            index,
            rusqlite::types::Type::Integer,
            format!("timestamp out of range: {micros}").into(),
        )
    })
}

pub(crate) fn now_micros() -> i64 {
    Utc::now().timestamp_micros()
}

//! Application context: repositories and services wired once per process.

use std::sync::Arc;

use casebridge_core::{CallbackService, DecisionService, DispatchService};
use casebridge_domain::{Config, Result};
use casebridge_infra::{
    CasePayloadBuilder, DbManager, RegistryClient, SqliteApplicationRepository,
    SqliteAttachmentRepository, SqliteAuditLog, SqliteBatchRepository,
    SqliteInstallmentRepository, SqliteStatusLedger, SqliteTokenStore, TokenManager,
};
use tracing::info;

/// Shared application state.
///
/// Repositories are kept as concrete types so operational tooling and
/// tests can reach their seeding helpers; services receive them as ports.
pub struct AppContext {
    pub config: Config,
    pub db: Arc<DbManager>,
    pub applications: Arc<SqliteApplicationRepository>,
    pub attachments: Arc<SqliteAttachmentRepository>,
    pub ledger: Arc<SqliteStatusLedger>,
    pub batches: Arc<SqliteBatchRepository>,
    pub installments: Arc<SqliteInstallmentRepository>,
    pub audit: Arc<SqliteAuditLog>,
    pub tokens: Arc<TokenManager>,
    pub dispatch: Arc<DispatchService>,
    pub callbacks: Arc<CallbackService>,
}

impl AppContext {
    /// Build the full context from configuration: open the pool, run
    /// migrations, and wire every service.
    ///
    /// # Errors
    /// Fails on database initialisation problems or missing registry
    /// credentials, before anything is served or dispatched.
    pub fn new(config: Config) -> Result<Self> {
        let db = Arc::new(DbManager::new(&config.database.path, config.database.pool_size)?);
        db.run_migrations()?;

        let applications = Arc::new(SqliteApplicationRepository::new(db.clone()));
        let attachments = Arc::new(SqliteAttachmentRepository::new(db.clone()));
        let ledger = Arc::new(SqliteStatusLedger::new(db.clone()));
        let batches = Arc::new(SqliteBatchRepository::new(db.clone()));
        let installments = Arc::new(SqliteInstallmentRepository::new(db.clone()));
        let audit = Arc::new(SqliteAuditLog::new(db.clone()));

        let token_store = Arc::new(SqliteTokenStore::new(db.clone()));
        let tokens = Arc::new(TokenManager::new(token_store, &config.registry)?);

        let payloads = Arc::new(CasePayloadBuilder::new(
            attachments.clone(),
            config.server.public_base_url.clone(),
        ));
        let gateway = Arc::new(RegistryClient::new(&config.registry, payloads)?);

        let decisions = Arc::new(DecisionService::new(
            batches.clone(),
            installments.clone(),
            config.payments.staged_payments_enabled,
        ));
        let dispatch = Arc::new(DispatchService::new(
            applications.clone(),
            ledger.clone(),
            gateway,
            tokens.clone(),
            decisions,
        ));
        let callbacks = Arc::new(CallbackService::new(
            applications.clone(),
            attachments.clone(),
            ledger.clone(),
            audit.clone(),
        ));

        info!(registry = %config.registry.base_url, "application context initialised");

        Ok(Self {
            config,
            db,
            applications,
            attachments,
            ledger,
            batches,
            installments,
            audit,
            tokens,
            dispatch,
            callbacks,
        })
    }
}

//! Cron scheduler for the periodic reconciliation scan.
//!
//! Triggers the batch driver at fixed intervals: join handles are
//! tracked, cancellation is explicit, and the job body runs under a
//! timeout. Each firing first brings the token up to date (refreshing an
//! expired one), then runs every batch operation in a fixed order. A
//! fatal run error stops the current firing; the next firing starts over.

use std::sync::Arc;
use std::time::Duration;

use casebridge_core::{BatchOperation, DispatchService, TokenError, TokenProvider};
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::error::{SchedulerError, SchedulerResult};

/// Configuration for the dispatch scheduler.
#[derive(Debug, Clone)]
pub struct DispatchSchedulerConfig {
    /// Cron expression describing the execution schedule.
    pub cron_expression: String,
    /// Maximum number of candidates per request type per firing.
    pub item_limit: usize,
    /// Timeout applied to a single firing.
    pub job_timeout: Duration,
    /// Timeout for starting the underlying scheduler.
    pub start_timeout: Duration,
    /// Timeout for stopping the scheduler.
    pub stop_timeout: Duration,
    /// Timeout for awaiting the monitor task join handle.
    pub join_timeout: Duration,
}

impl Default for DispatchSchedulerConfig {
    fn default() -> Self {
        Self {
            cron_expression: "0 */30 * * * *".into(), // every 30 minutes
            item_limit: 50,
            job_timeout: Duration::from_secs(600),
            start_timeout: Duration::from_secs(5),
            stop_timeout: Duration::from_secs(5),
            join_timeout: Duration::from_secs(5),
        }
    }
}

/// Dispatch scheduler with explicit lifecycle management.
pub struct DispatchScheduler {
    scheduler: Option<JobScheduler>,
    config: DispatchSchedulerConfig,
    monitor_handle: Option<JoinHandle<()>>,
    cancellation: CancellationToken,
    dispatch: Arc<DispatchService>,
    tokens: Arc<dyn TokenProvider>,
}

impl DispatchScheduler {
    /// Create a scheduler with the given configuration.
    pub fn new(
        config: DispatchSchedulerConfig,
        dispatch: Arc<DispatchService>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            scheduler: None,
            config,
            monitor_handle: None,
            cancellation: CancellationToken::new(),
            dispatch,
            tokens,
        }
    }

    /// Start the scheduler, spawning the monitoring task.
    pub async fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let scheduler_instance = self.build_scheduler().await?;
        let start_timeout = self.config.start_timeout;

        tokio::time::timeout(start_timeout, scheduler_instance.start())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: start_timeout.as_secs() })?
            .map_err(|source| SchedulerError::StartFailed(source.to_string()))?;

        self.scheduler = Some(scheduler_instance);

        let cancel = self.cancellation.clone();
        let handle = tokio::spawn(async move {
            Self::monitor_task(cancel).await;
        });
        self.monitor_handle = Some(handle);

        info!(
            scheduler = "dispatch",
            cron = %self.config.cron_expression,
            "dispatch scheduler started"
        );
        Ok(())
    }

    /// Stop the scheduler and wait for the monitor task to finish.
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.cancellation.cancel();

        let mut scheduler = match self.scheduler.take() {
            Some(scheduler) => scheduler,
            None => return Err(SchedulerError::NotRunning),
        };

        let stop_timeout = self.config.stop_timeout;
        tokio::time::timeout(stop_timeout, async move { scheduler.shutdown().await })
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: stop_timeout.as_secs() })?
            .map_err(|source| SchedulerError::StopFailed(source.to_string()))?;

        if let Some(handle) = self.monitor_handle.take() {
            let join_timeout = self.config.join_timeout;
            tokio::time::timeout(join_timeout, handle)
                .await
                .map_err(|_| SchedulerError::Timeout { seconds: join_timeout.as_secs() })?
                .map_err(|err| SchedulerError::TaskJoinFailed(err.to_string()))?;
        }

        info!(scheduler = "dispatch", "dispatch scheduler stopped");
        self.cancellation = CancellationToken::new();
        Ok(())
    }

    /// Returns true when a scheduler instance is active.
    pub fn is_running(&self) -> bool {
        self.scheduler.is_some()
    }

    async fn build_scheduler(&self) -> SchedulerResult<JobScheduler> {
        let scheduler = JobScheduler::new()
            .await
            .map_err(|source| SchedulerError::CreationFailed(source.to_string()))?;

        let cron_expr = self.config.cron_expression.clone();
        let dispatch = self.dispatch.clone();
        let tokens = self.tokens.clone();
        let job_timeout = self.config.job_timeout;
        let item_limit = self.config.item_limit;

        let job_definition = Job::new_async(cron_expr.as_str(), move |_id, _lock| {
            let dispatch = dispatch.clone();
            let tokens = tokens.clone();

            Box::pin(async move {
                match tokio::time::timeout(
                    job_timeout,
                    Self::run_cycle(dispatch, tokens, item_limit),
                )
                .await
                {
                    Ok(()) => {
                        debug!(scheduler = "dispatch", "reconciliation cycle finished");
                    }
                    Err(_) => {
                        warn!(
                            scheduler = "dispatch",
                            timeout_secs = job_timeout.as_secs(),
                            "reconciliation cycle timed out"
                        );
                    }
                }
            })
        })
        .map_err(|source| SchedulerError::JobRegistrationFailed(source.to_string()))?;

        scheduler
            .add(job_definition)
            .await
            .map_err(|source| SchedulerError::JobRegistrationFailed(source.to_string()))?;

        debug!(cron = %self.config.cron_expression, "registered reconciliation job");
        Ok(scheduler)
    }

    /// One reconciliation cycle: freshen the token, then run every batch
    /// operation in order.
    async fn run_cycle(
        dispatch: Arc<DispatchService>,
        tokens: Arc<dyn TokenProvider>,
        item_limit: usize,
    ) {
        match tokens.get_current().await {
            Ok(_) => {}
            Err(TokenError::Expired) => {
                info!(scheduler = "dispatch", "token expired, refreshing before the cycle");
                if let Err(err) = tokens.refresh().await {
                    error!(scheduler = "dispatch", error = %err, "token refresh failed; skipping cycle");
                    return;
                }
            }
            Err(err) => {
                error!(scheduler = "dispatch", error = %err, "no usable token; skipping cycle");
                return;
            }
        }

        for operation in BatchOperation::all() {
            match dispatch.run(operation, item_limit, false).await {
                Ok(summary) => {
                    info!(scheduler = "dispatch", summary = %summary, "batch completed");
                }
                Err(err) => {
                    // Fatal for the rest of this cycle (e.g. the token was
                    // invalidated mid-run); the next firing retries.
                    error!(
                        scheduler = "dispatch",
                        operation = operation.label(),
                        error = %err,
                        "batch aborted; ending cycle"
                    );
                    break;
                }
            }
        }
    }

    async fn monitor_task(cancel: CancellationToken) {
        cancel.cancelled().await;
        debug!(scheduler = "dispatch", "dispatch scheduler monitor cancelled");
    }
}

impl Drop for DispatchScheduler {
    fn drop(&mut self) {
        if self.is_running() {
            warn!(
                scheduler = "dispatch",
                "DispatchScheduler dropped while running; cancelling tasks"
            );
            self.cancellation.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use casebridge_core::{
        ApplicationRepository, BatchRepository, DecisionService, DispatchError, DispatchReceipt,
        InstallmentRepository, OutboundRequest, RegistryGateway, StatusLedger,
    };
    use casebridge_domain::{
        Application, CaseStatus, DecisionDetails, RegistryToken, Result as DomainResult,
        StatusEvent,
    };
    use chrono::{NaiveDate, Utc};
    use uuid::Uuid;

    use super::*;

    struct EmptyRepo;

    #[async_trait]
    impl ApplicationRepository for EmptyRepo {
        async fn find_candidates(
            &self,
            _operation: BatchOperation,
            _limit: usize,
        ) -> DomainResult<Vec<Application>> {
            Ok(Vec::new())
        }

        async fn get(&self, id: Uuid) -> DomainResult<Application> {
            Err(casebridge_domain::BridgeError::NotFound(id.to_string()))
        }

        async fn set_case_guid(&self, _id: Uuid, _case_guid: &str) -> DomainResult<()> {
            Ok(())
        }

        async fn set_case_identifiers(
            &self,
            _id: Uuid,
            _case_id: Option<&str>,
            _case_guid: Option<&str>,
        ) -> DomainResult<()> {
            Ok(())
        }
    }

    struct NoopLedger;

    #[async_trait]
    impl StatusLedger for NoopLedger {
        async fn append(&self, _application_id: Uuid, _status: CaseStatus) -> DomainResult<()> {
            Ok(())
        }

        async fn current(&self, _application_id: Uuid) -> DomainResult<Option<CaseStatus>> {
            Ok(None)
        }

        async fn history(&self, _application_id: Uuid) -> DomainResult<Vec<StatusEvent>> {
            Ok(Vec::new())
        }
    }

    struct NoopGateway;

    #[async_trait]
    impl RegistryGateway for NoopGateway {
        async fn send(
            &self,
            _request: &OutboundRequest,
            _token: &RegistryToken,
        ) -> Result<DispatchReceipt, DispatchError> {
            Ok(DispatchReceipt { correlation_id: "{x}".to_string() })
        }

        async fn fetch_decisions(
            &self,
            _case_id: &str,
            _token: &RegistryToken,
        ) -> Result<Vec<serde_json::Value>, DispatchError> {
            Ok(Vec::new())
        }
    }

    struct FreshTokenProvider;

    #[async_trait]
    impl TokenProvider for FreshTokenProvider {
        async fn get_current(&self) -> Result<RegistryToken, TokenError> {
            Ok(RegistryToken::new("a".to_string(), "r".to_string(), 3600, Utc::now()))
        }

        async fn refresh(&self) -> Result<RegistryToken, TokenError> {
            self.get_current().await
        }
    }

    struct NoopBatches;

    #[async_trait]
    impl BatchRepository for NoopBatches {
        async fn record_decision(
            &self,
            _batch_id: Uuid,
            _details: &DecisionDetails,
        ) -> DomainResult<()> {
            Ok(())
        }
    }

    struct NoopInstallments;

    #[async_trait]
    impl InstallmentRepository for NoopInstallments {
        async fn promote_due_pending(
            &self,
            _application_id: Uuid,
            _today: NaiveDate,
        ) -> DomainResult<u64> {
            Ok(0)
        }
    }

    fn dispatch_service() -> Arc<DispatchService> {
        let decisions = Arc::new(DecisionService::new(
            Arc::new(NoopBatches),
            Arc::new(NoopInstallments),
            false,
        ));
        Arc::new(DispatchService::new(
            Arc::new(EmptyRepo),
            Arc::new(NoopLedger),
            Arc::new(NoopGateway),
            Arc::new(FreshTokenProvider),
            decisions,
        ))
    }

    fn fast_config() -> DispatchSchedulerConfig {
        DispatchSchedulerConfig {
            cron_expression: "*/1 * * * * *".into(), // every second
            item_limit: 10,
            job_timeout: Duration::from_secs(2),
            start_timeout: Duration::from_secs(2),
            stop_timeout: Duration::from_secs(2),
            join_timeout: Duration::from_secs(2),
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn lifecycle_runs_successfully() {
        let mut scheduler =
            DispatchScheduler::new(fast_config(), dispatch_service(), Arc::new(FreshTokenProvider));

        scheduler.start().await.expect("start succeeds");
        tokio::time::sleep(Duration::from_secs(2)).await;
        scheduler.stop().await.expect("stop succeeds");

        assert!(!scheduler.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn double_start_is_rejected() {
        let mut scheduler =
            DispatchScheduler::new(fast_config(), dispatch_service(), Arc::new(FreshTokenProvider));

        scheduler.start().await.expect("first start");
        let err = scheduler.start().await.expect_err("second start fails");
        assert!(matches!(err, SchedulerError::AlreadyRunning));
        scheduler.stop().await.expect("stop succeeds");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn restart_after_stop_succeeds() {
        let mut scheduler =
            DispatchScheduler::new(fast_config(), dispatch_service(), Arc::new(FreshTokenProvider));

        scheduler.start().await.expect("start succeeds");
        scheduler.stop().await.expect("stop succeeds");
        assert!(!scheduler.is_running());

        scheduler.start().await.expect("start again");
        scheduler.stop().await.expect("stop again");
    }

    #[tokio::test]
    async fn stop_without_start_is_rejected() {
        let mut scheduler =
            DispatchScheduler::new(fast_config(), dispatch_service(), Arc::new(FreshTokenProvider));

        let err = scheduler.stop().await.expect_err("stop fails");
        assert!(matches!(err, SchedulerError::NotRunning));
    }

    #[tokio::test]
    async fn run_cycle_without_token_is_a_noop() {
        struct NoTokenProvider;

        #[async_trait]
        impl TokenProvider for NoTokenProvider {
            async fn get_current(&self) -> Result<RegistryToken, TokenError> {
                Err(TokenError::NotConfigured)
            }

            async fn refresh(&self) -> Result<RegistryToken, TokenError> {
                Err(TokenError::NotConfigured)
            }
        }

        // Must not panic; the cycle logs and returns.
        DispatchScheduler::run_cycle(dispatch_service(), Arc::new(NoTokenProvider), 10).await;
    }
}

//! Batch dispatch service
//!
//! One invocation processes the candidate list of a single operation
//! strictly sequentially, one blocking HTTP call at a time: registry
//! writes on one case must be strictly ordered and the registry offers no
//! compare-and-swap. A per-item failure leaves the item in its prior state
//! for natural re-selection on the next scheduled run; only token
//! acquisition aborts the whole run.

use std::fmt;
use std::sync::Arc;

use casebridge_domain::constants::CORRELATION_DELIMITERS;
use casebridge_domain::{Application, BridgeError, CaseStatus, RegistryToken, Result};
use chrono::Utc;
use tracing::{info, warn};

use crate::decision::extractor::extract_decision_details;
use crate::decision::DecisionService;
use crate::ports::{ApplicationRepository, RegistryGateway, StatusLedger, TokenProvider};
use crate::registry::errors::TokenError;
use crate::registry::request::{OutboundRequest, RequestType};

/// One schedulable unit of work: a typed write dispatch, or the
/// synchronous decision pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOperation {
    Dispatch(RequestType),
    FetchDecisions,
}

impl BatchOperation {
    /// Wire/CLI name of the operation.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Dispatch(request_type) => request_type.as_str(),
            Self::FetchDecisions => "get_decision_details",
        }
    }

    /// Every operation, in the order the scheduler runs them.
    #[must_use]
    pub fn all() -> [Self; 6] {
        [
            Self::Dispatch(RequestType::OpenCase),
            Self::Dispatch(RequestType::DecisionProposal),
            Self::Dispatch(RequestType::UpdateRecords),
            Self::Dispatch(RequestType::AddRecords),
            Self::Dispatch(RequestType::DeleteCase),
            Self::FetchDecisions,
        ]
    }
}

impl fmt::Display for BatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Aggregate outcome of one batch run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub operation: &'static str,
    pub candidates: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub dry_run: bool,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.dry_run {
            write!(f, "{}: {} candidates (dry run)", self.operation, self.candidates)
        } else {
            write!(
                f,
                "{}: {} candidates, {} succeeded, {} failed",
                self.operation, self.candidates, self.succeeded, self.failed
            )
        }
    }
}

/// Drives one scheduled reconciliation scan for a single operation.
pub struct DispatchService {
    applications: Arc<dyn ApplicationRepository>,
    ledger: Arc<dyn StatusLedger>,
    gateway: Arc<dyn RegistryGateway>,
    tokens: Arc<dyn TokenProvider>,
    decisions: Arc<DecisionService>,
}

impl DispatchService {
    #[must_use]
    pub fn new(
        applications: Arc<dyn ApplicationRepository>,
        ledger: Arc<dyn StatusLedger>,
        gateway: Arc<dyn RegistryGateway>,
        tokens: Arc<dyn TokenProvider>,
        decisions: Arc<DecisionService>,
    ) -> Self {
        Self { applications, ledger, gateway, tokens, decisions }
    }

    /// Run one batch for `operation`, processing at most `limit` candidates.
    ///
    /// Exactly one token is acquired for the whole run and reused
    /// read-only for every request; a token failure aborts the run before
    /// any item is processed. In dry-run mode the candidates are listed
    /// and nothing is dispatched.
    ///
    /// # Errors
    /// Fatal errors only: token acquisition and local persistence
    /// failures. Per-item precondition/transport failures are absorbed
    /// into the summary counts.
    pub async fn run(
        &self,
        operation: BatchOperation,
        limit: usize,
        dry_run: bool,
    ) -> Result<RunSummary> {
        let candidates = self.applications.find_candidates(operation, limit).await?;
        info!(
            operation = operation.label(),
            candidates = candidates.len(),
            dry_run,
            "batch run starting"
        );

        if dry_run {
            for application in &candidates {
                info!(
                    operation = operation.label(),
                    application_id = %application.id,
                    application = %application.reference(),
                    "candidate (dry run)"
                );
            }
            return Ok(RunSummary {
                operation: operation.label(),
                candidates: candidates.len(),
                succeeded: 0,
                failed: 0,
                dry_run: true,
            });
        }

        let token = self.acquire_token().await?;

        let mut succeeded = 0;
        let mut failed = 0;
        for application in &candidates {
            let ok = match operation {
                BatchOperation::Dispatch(request_type) => {
                    self.dispatch_one(application, request_type, &token).await?
                }
                BatchOperation::FetchDecisions => {
                    self.pull_decisions_one(application, &token).await?
                }
            };
            if ok {
                succeeded += 1;
            } else {
                failed += 1;
            }
        }

        let summary = RunSummary {
            operation: operation.label(),
            candidates: candidates.len(),
            succeeded,
            failed,
            dry_run: false,
        };
        info!(
            operation = summary.operation,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "batch run finished"
        );
        Ok(summary)
    }

    /// Acquire the single token for this run. Expiry and absence are fatal
    /// for the whole run; no partial processing is attempted.
    async fn acquire_token(&self) -> Result<RegistryToken> {
        match self.tokens.get_current().await {
            Ok(token) => Ok(token),
            Err(TokenError::Store(err)) => Err(err),
            Err(err) => Err(BridgeError::Auth(err.to_string())),
        }
    }

    /// Dispatch one typed request. Returns whether the item succeeded;
    /// local persistence failures propagate as fatal.
    async fn dispatch_one(
        &self,
        application: &Application,
        request_type: RequestType,
        token: &RegistryToken,
    ) -> Result<bool> {
        let request = OutboundRequest::new(application.clone(), request_type);

        match self.gateway.send(&request, token).await {
            Ok(receipt) => {
                let identifier = normalize_correlation(&receipt.correlation_id);
                if request_type == RequestType::OpenCase {
                    self.applications.set_case_guid(application.id, &identifier).await?;
                }
                if let Some(status) = request.result_status() {
                    self.ledger.append(application.id, status).await?;
                }
                info!(
                    application_id = %application.id,
                    application = %application.reference(),
                    request_type = request_type.as_str(),
                    correlation_id = %identifier,
                    "request dispatched"
                );
                Ok(true)
            }
            Err(err) => {
                warn!(
                    application_id = %application.id,
                    application = %application.reference(),
                    request_type = request_type.as_str(),
                    error = %err,
                    "dispatch failed; application left for re-selection"
                );
                Ok(false)
            }
        }
    }

    /// Pull and apply the decision details for one signed case.
    async fn pull_decisions_one(
        &self,
        application: &Application,
        token: &RegistryToken,
    ) -> Result<bool> {
        let Some(case_id) = application.case_id.as_deref() else {
            warn!(
                application_id = %application.id,
                application = %application.reference(),
                "decision pull skipped: application has no case id"
            );
            return Ok(false);
        };

        let payloads = match self.gateway.fetch_decisions(case_id, token).await {
            Ok(payloads) => payloads,
            Err(err) => {
                warn!(
                    application_id = %application.id,
                    case_id,
                    error = %err,
                    "decision pull failed; application left for re-selection"
                );
                return Ok(false);
            }
        };

        let Some(payload) = payloads.first() else {
            warn!(
                application_id = %application.id,
                case_id,
                "registry published no decisions yet"
            );
            return Ok(false);
        };

        match extract_decision_details(payload) {
            Ok(details) => {
                self.decisions.apply(application, &details, Utc::now().date_naive()).await?;
                self.ledger
                    .append(application.id, CaseStatus::DetailsReceivedFromRegistry)
                    .await?;
                info!(
                    application_id = %application.id,
                    application = %application.reference(),
                    case_id,
                    "decision details received and applied"
                );
                Ok(true)
            }
            Err(err) => {
                warn!(
                    application_id = %application.id,
                    case_id,
                    error = %err,
                    "decision details could not be extracted"
                );
                Ok(false)
            }
        }
    }
}

/// Strip delimiter characters from a raw correlation response to obtain
/// the bare registry case identifier (the registry wraps it in braces).
#[must_use]
pub fn normalize_correlation(raw: &str) -> String {
    raw.chars().filter(|c| !CORRELATION_DELIMITERS.contains(c)).collect()
}

#[cfg(test)]
mod tests {
    //! Unit tests for the batch dispatch service.
    use std::collections::HashSet;
    use std::sync::Arc;

    use async_trait::async_trait;
    use casebridge_domain::{ApplicationStatus, DecisionDetails, StatusEvent};
    use chrono::NaiveDate;
    use tokio::sync::Mutex;
    use uuid::Uuid;

    use super::*;
    use crate::ports::{BatchRepository, InstallmentRepository};
    use crate::registry::errors::DispatchError;
    use crate::registry::request::DispatchReceipt;

    fn sample_application(number: &str) -> Application {
        Application {
            id: Uuid::new_v4(),
            application_number: number.to_string(),
            status: ApplicationStatus::Handling,
            case_id: None,
            case_guid: None,
            handler_username: Some("handler".to_string()),
            batch_id: None,
        }
    }

    #[derive(Default)]
    struct MockApplicationRepo {
        candidates: Mutex<Vec<Application>>,
        case_guids: Mutex<Vec<(Uuid, String)>>,
    }

    #[async_trait]
    impl ApplicationRepository for MockApplicationRepo {
        async fn find_candidates(
            &self,
            _operation: BatchOperation,
            limit: usize,
        ) -> Result<Vec<Application>> {
            let candidates = self.candidates.lock().await;
            Ok(candidates.iter().take(limit).cloned().collect())
        }

        async fn get(&self, id: Uuid) -> Result<Application> {
            let candidates = self.candidates.lock().await;
            candidates
                .iter()
                .find(|a| a.id == id)
                .cloned()
                .ok_or_else(|| BridgeError::NotFound(id.to_string()))
        }

        async fn set_case_guid(&self, id: Uuid, case_guid: &str) -> Result<()> {
            self.case_guids.lock().await.push((id, case_guid.to_string()));
            Ok(())
        }

        async fn set_case_identifiers(
            &self,
            _id: Uuid,
            _case_id: Option<&str>,
            _case_guid: Option<&str>,
        ) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockLedger {
        events: Mutex<Vec<(Uuid, CaseStatus)>>,
    }

    #[async_trait]
    impl StatusLedger for MockLedger {
        async fn append(&self, application_id: Uuid, status: CaseStatus) -> Result<()> {
            self.events.lock().await.push((application_id, status));
            Ok(())
        }

        async fn current(&self, application_id: Uuid) -> Result<Option<CaseStatus>> {
            let events = self.events.lock().await;
            Ok(events.iter().rev().find(|(id, _)| *id == application_id).map(|(_, s)| *s))
        }

        async fn history(&self, _application_id: Uuid) -> Result<Vec<StatusEvent>> {
            Ok(Vec::new())
        }
    }

    /// Gateway failing transport for a configured set of applications.
    struct FlakyGateway {
        failing: HashSet<Uuid>,
        body: String,
    }

    #[async_trait]
    impl RegistryGateway for FlakyGateway {
        async fn send(
            &self,
            request: &OutboundRequest,
            _token: &RegistryToken,
        ) -> std::result::Result<DispatchReceipt, DispatchError> {
            if self.failing.contains(&request.application().id) {
                return Err(DispatchError::Transport("connection reset".to_string()));
            }
            Ok(DispatchReceipt { correlation_id: self.body.clone() })
        }

        async fn fetch_decisions(
            &self,
            _case_id: &str,
            _token: &RegistryToken,
        ) -> std::result::Result<Vec<serde_json::Value>, DispatchError> {
            Ok(Vec::new())
        }
    }

    struct StaticTokenProvider {
        token: Option<RegistryToken>,
    }

    #[async_trait]
    impl TokenProvider for StaticTokenProvider {
        async fn get_current(&self) -> std::result::Result<RegistryToken, TokenError> {
            match &self.token {
                Some(token) => Ok(token.clone()),
                None => Err(TokenError::Expired),
            }
        }

        async fn refresh(&self) -> std::result::Result<RegistryToken, TokenError> {
            self.get_current().await
        }
    }

    struct NoopBatchRepo;

    #[async_trait]
    impl BatchRepository for NoopBatchRepo {
        async fn record_decision(&self, _batch_id: Uuid, _details: &DecisionDetails) -> Result<()> {
            Ok(())
        }
    }

    struct NoopInstallmentRepo;

    #[async_trait]
    impl InstallmentRepository for NoopInstallmentRepo {
        async fn promote_due_pending(&self, _application_id: Uuid, _today: NaiveDate) -> Result<u64> {
            Ok(0)
        }
    }

    fn valid_token() -> RegistryToken {
        RegistryToken::new("access".to_string(), "refresh".to_string(), 3600, Utc::now())
    }

    fn service_with(
        applications: Arc<MockApplicationRepo>,
        ledger: Arc<MockLedger>,
        gateway: Arc<dyn RegistryGateway>,
        token: Option<RegistryToken>,
    ) -> DispatchService {
        let decisions =
            Arc::new(DecisionService::new(Arc::new(NoopBatchRepo), Arc::new(NoopInstallmentRepo), false));
        DispatchService::new(
            applications,
            ledger,
            gateway,
            Arc::new(StaticTokenProvider { token }),
            decisions,
        )
    }

    #[test]
    fn correlation_delimiters_are_stripped() {
        assert_eq!(normalize_correlation("{abc-123}"), "abc-123");
        assert_eq!(normalize_correlation(" \"{HEL-2024-1}\"\n"), "HEL-2024-1");
        assert_eq!(normalize_correlation("plain"), "plain");
    }

    /// With K candidates of which m fail transport, exactly K−m ledger
    /// events are appended and the failed items stay untouched.
    #[tokio::test]
    async fn transport_failures_leave_items_untouched() {
        let apps: Vec<Application> =
            (0..5).map(|i| sample_application(&format!("HEL-2024-{i:06}"))).collect();
        let failing: HashSet<Uuid> = [apps[1].id, apps[3].id].into_iter().collect();

        let repo = Arc::new(MockApplicationRepo {
            candidates: Mutex::new(apps.clone()),
            case_guids: Mutex::new(Vec::new()),
        });
        let ledger = Arc::new(MockLedger::default());
        let gateway = Arc::new(FlakyGateway { failing: failing.clone(), body: "{id}".to_string() });
        let service = service_with(repo.clone(), ledger.clone(), gateway, Some(valid_token()));

        let summary = service
            .run(BatchOperation::Dispatch(RequestType::OpenCase), 10, false)
            .await
            .expect("run succeeds");

        assert_eq!(summary.candidates, 5);
        assert_eq!(summary.succeeded, 3);
        assert_eq!(summary.failed, 2);

        let events = ledger.events.lock().await;
        assert_eq!(events.len(), 3);
        for (application_id, status) in events.iter() {
            assert!(!failing.contains(application_id));
            assert_eq!(*status, CaseStatus::RequestToOpenCaseSent);
        }

        let guids = repo.case_guids.lock().await;
        assert!(guids.iter().all(|(id, _)| !failing.contains(id)));
    }

    /// End to end over mocks: a Handling application with ledger
    /// `submitted_but_not_sent` gets one open-case dispatch; the response
    /// body `{abc-123}` is stored delimiter-stripped as the case guid and
    /// the ledger gains `request_to_open_case_sent`.
    #[tokio::test]
    async fn open_case_success_stores_stripped_identifier() {
        let application = sample_application("HEL-2024-000001");
        let repo = Arc::new(MockApplicationRepo {
            candidates: Mutex::new(vec![application.clone()]),
            case_guids: Mutex::new(Vec::new()),
        });
        let ledger = Arc::new(MockLedger::default());
        ledger.append(application.id, CaseStatus::SubmittedButNotSent).await.expect("seed");
        let gateway =
            Arc::new(FlakyGateway { failing: HashSet::new(), body: "{abc-123}".to_string() });
        let service = service_with(repo.clone(), ledger.clone(), gateway, Some(valid_token()));

        let summary = service
            .run(BatchOperation::Dispatch(RequestType::OpenCase), 10, false)
            .await
            .expect("run succeeds");

        assert_eq!(summary.succeeded, 1);
        let guids = repo.case_guids.lock().await;
        assert_eq!(guids.as_slice(), &[(application.id, "abc-123".to_string())]);
        assert_eq!(
            ledger.current(application.id).await.expect("current"),
            Some(CaseStatus::RequestToOpenCaseSent)
        );
    }

    /// Token failure aborts the run before any item is processed.
    #[tokio::test]
    async fn expired_token_aborts_the_whole_run() {
        let repo = Arc::new(MockApplicationRepo {
            candidates: Mutex::new(vec![sample_application("HEL-2024-000002")]),
            case_guids: Mutex::new(Vec::new()),
        });
        let ledger = Arc::new(MockLedger::default());
        let gateway =
            Arc::new(FlakyGateway { failing: HashSet::new(), body: "{x}".to_string() });
        let service = service_with(repo, ledger.clone(), gateway, None);

        let err = service
            .run(BatchOperation::Dispatch(RequestType::OpenCase), 10, false)
            .await
            .expect_err("run aborts");

        assert!(matches!(err, BridgeError::Auth(_)));
        assert!(ledger.events.lock().await.is_empty());
    }

    /// Dry-run lists candidates without dispatching or needing a token.
    #[tokio::test]
    async fn dry_run_dispatches_nothing() {
        let repo = Arc::new(MockApplicationRepo {
            candidates: Mutex::new(vec![
                sample_application("HEL-2024-000003"),
                sample_application("HEL-2024-000004"),
            ]),
            case_guids: Mutex::new(Vec::new()),
        });
        let ledger = Arc::new(MockLedger::default());
        let gateway =
            Arc::new(FlakyGateway { failing: HashSet::new(), body: "{x}".to_string() });
        let service = service_with(repo, ledger.clone(), gateway, None);

        let summary = service
            .run(BatchOperation::Dispatch(RequestType::OpenCase), 10, true)
            .await
            .expect("dry run succeeds without a token");

        assert!(summary.dry_run);
        assert_eq!(summary.candidates, 2);
        assert_eq!(summary.succeeded, 0);
        assert!(ledger.events.lock().await.is_empty());
    }

    /// AddRecords succeeds without appending any ledger event.
    #[tokio::test]
    async fn add_records_appends_no_event() {
        let mut application = sample_application("HEL-2024-000005");
        application.case_id = Some("HEL-1".to_string());
        let repo = Arc::new(MockApplicationRepo {
            candidates: Mutex::new(vec![application]),
            case_guids: Mutex::new(Vec::new()),
        });
        let ledger = Arc::new(MockLedger::default());
        let gateway =
            Arc::new(FlakyGateway { failing: HashSet::new(), body: "{x}".to_string() });
        let service = service_with(repo, ledger.clone(), gateway, Some(valid_token()));

        let summary = service
            .run(BatchOperation::Dispatch(RequestType::AddRecords), 10, false)
            .await
            .expect("run succeeds");

        assert_eq!(summary.succeeded, 1);
        assert!(ledger.events.lock().await.is_empty());
    }
}

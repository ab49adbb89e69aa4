//! Applies extracted decision details to the owning batch
//!
//! The batch receives the decision fields; when the application was
//! accepted and staged payments are enabled, pending installments that
//! have fallen due are promoted to the accepted sub-state.

use std::sync::Arc;

use casebridge_domain::{Application, ApplicationStatus, BridgeError, DecisionDetails, Result};
use chrono::NaiveDate;
use tracing::{debug, info};

use crate::ports::{BatchRepository, InstallmentRepository};

pub struct DecisionService {
    batches: Arc<dyn BatchRepository>,
    installments: Arc<dyn InstallmentRepository>,
    staged_payments_enabled: bool,
}

impl DecisionService {
    #[must_use]
    pub fn new(
        batches: Arc<dyn BatchRepository>,
        installments: Arc<dyn InstallmentRepository>,
        staged_payments_enabled: bool,
    ) -> Self {
        Self { batches, installments, staged_payments_enabled }
    }

    /// Write `details` onto the application's batch and promote due
    /// installments where applicable.
    ///
    /// # Errors
    /// Returns `NotFound` when the application belongs to no batch.
    pub async fn apply(
        &self,
        application: &Application,
        details: &DecisionDetails,
        today: NaiveDate,
    ) -> Result<()> {
        let batch_id = application.batch_id.ok_or_else(|| {
            BridgeError::NotFound(format!(
                "application {} has no decision batch",
                application.application_number
            ))
        })?;

        self.batches.record_decision(batch_id, details).await?;
        info!(
            application = %application.reference(),
            batch_id = %batch_id,
            decision_maker = %details.decision_maker_name,
            "decision details recorded"
        );

        if self.staged_payments_enabled && application.status == ApplicationStatus::Accepted {
            let promoted = self.installments.promote_due_pending(application.id, today).await?;
            if promoted > 0 {
                info!(
                    application = %application.reference(),
                    promoted,
                    "due pending installments promoted to accepted"
                );
            }
        } else {
            debug!(
                application = %application.reference(),
                "no installment promotion (staged payments disabled or application not accepted)"
            );
        }

        Ok(())
    }
}

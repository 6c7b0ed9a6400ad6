use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use super::domain::{
    GatewayRefund, PassReport, RefundFailure, RefundJob, RefundJobStatus, RefundOutcome,
    RefundSuccess,
};
use super::repository::{JobStoreError, PaymentGateway, RefundJobStore};

/// Jobs drained per pass.
pub const DEFAULT_BATCH_SIZE: usize = 10;

/// Drives pending refund jobs through the payment gateway.
pub struct RefundProcessor<S, G> {
    store: Arc<S>,
    gateway: Arc<G>,
    batch_size: usize,
}

impl<S, G> RefundProcessor<S, G>
where
    S: RefundJobStore + 'static,
    G: PaymentGateway + 'static,
{
    pub fn new(store: Arc<S>, gateway: Arc<G>) -> Self {
        Self::with_batch_size(store, gateway, DEFAULT_BATCH_SIZE)
    }

    pub fn with_batch_size(store: Arc<S>, gateway: Arc<G>, batch_size: usize) -> Self {
        Self {
            store,
            gateway,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Runs one pass over the pending queue.
    ///
    /// Only a failed fetch fails the pass. Every fetched job ends up with its
    /// own outcome, and a failing job never stops the ones after it.
    pub async fn run_pass(&self) -> Result<PassReport, ProcessorError> {
        let jobs = self
            .store
            .pending(self.batch_size)
            .await
            .map_err(ProcessorError::Fetch)?;

        if jobs.is_empty() {
            info!("no pending refunds");
            return Ok(PassReport::NoPending);
        }

        let mut seen = HashSet::with_capacity(jobs.len());
        let mut outcomes = Vec::with_capacity(jobs.len());
        for job in jobs {
            if !seen.insert(job.id.clone()) {
                warn!(job_id = %job.id, "duplicate job in batch; skipping");
                continue;
            }
            if job.status != RefundJobStatus::Pending {
                warn!(job_id = %job.id, status = job.status.label(), "store returned a settled job; skipping");
                continue;
            }
            outcomes.push(RefundOutcome::from(self.process(&job).await));
        }

        let report = PassReport::Processed(outcomes);
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            "refund pass complete"
        );
        Ok(report)
    }

    async fn process(&self, job: &RefundJob) -> Result<RefundSuccess, RefundFailure> {
        let refund = match self.issue(job).await {
            Ok(refund) => refund,
            Err(message) => return Err(self.record_failure(job, message).await),
        };

        match self.store.mark_processed(&job.id, Utc::now()).await {
            Ok(()) => {
                info!(job_id = %job.id, refund_id = %refund.id, "refund processed");
                Ok(RefundSuccess {
                    id: job.id.clone(),
                    refund_id: refund.id,
                })
            }
            Err(err) => {
                // The job stays pending; its idempotency key makes the retry return this refund.
                error!(job_id = %job.id, refund_id = %refund.id, error = %err, "refund issued but job update failed");
                Err(RefundFailure {
                    id: job.id.clone(),
                    error: format!("refund {} issued but job update failed: {err}", refund.id),
                })
            }
        }
    }

    async fn issue(&self, job: &RefundJob) -> Result<GatewayRefund, String> {
        let request = job.refund_request().map_err(|err| err.to_string())?;
        self.gateway
            .create_refund(request)
            .await
            .map_err(|err| err.to_string())
    }

    async fn record_failure(&self, job: &RefundJob, message: String) -> RefundFailure {
        warn!(job_id = %job.id, error = %message, "refund failed");
        let error = match self.store.mark_failed(&job.id, &message).await {
            Ok(()) => message,
            Err(err) => {
                error!(job_id = %job.id, error = %err, "could not record refund failure");
                format!("{message}; job update failed: {err}")
            }
        };
        RefundFailure {
            id: job.id.clone(),
            error,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("failed to fetch pending refunds: {0}")]
    Fetch(#[source] JobStoreError),
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::domain::{GatewayRefund, RefundJob, RefundJobId, RefundRequest};

/// Storage abstraction over the external `refund_jobs` queue.
///
/// Status writes only apply to jobs that are still pending; a job already in a
/// terminal state yields [`JobStoreError::Conflict`].
#[async_trait]
pub trait RefundJobStore: Send + Sync {
    async fn pending(&self, limit: usize) -> Result<Vec<RefundJob>, JobStoreError>;
    async fn mark_processed(
        &self,
        id: &RefundJobId,
        processed_at: DateTime<Utc>,
    ) -> Result<(), JobStoreError>;
    async fn mark_failed(&self, id: &RefundJobId, error_message: &str)
        -> Result<(), JobStoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum JobStoreError {
    #[error("refund job {0} not found")]
    NotFound(RefundJobId),
    #[error("refund job {0} is no longer pending")]
    Conflict(RefundJobId),
    #[error("job store unavailable: {0}")]
    Unavailable(String),
    #[error("job store returned malformed data: {0}")]
    Malformed(String),
}

/// Outbound refund creation (e.g. Stripe).
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_refund(&self, request: RefundRequest) -> Result<GatewayRefund, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    /// The gateway answered and refused the refund.
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("payment gateway unreachable: {0}")]
    Transport(String),
}

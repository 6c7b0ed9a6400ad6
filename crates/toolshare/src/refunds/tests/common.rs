use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::to_bytes;
use axum::response::Response;
use chrono::{DateTime, Utc};
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::refunds::domain::{
    GatewayRefund, RefundJob, RefundJobId, RefundJobStatus, RefundRequest,
};
use crate::refunds::repository::{GatewayError, JobStoreError, PaymentGateway, RefundJobStore};
use crate::refunds::RefundProcessor;

pub(super) fn three_jobs() -> Vec<RefundJob> {
    vec![
        RefundJob::pending("job-1", "pi_1").with_amount(dec!(25.50)),
        RefundJob::pending("job-2", "pi_2"),
        RefundJob::pending("job-3", "pi_3").with_amount(dec!(8)),
    ]
}

pub(super) fn build_processor(
    jobs: Vec<RefundJob>,
    gateway: ScriptedGateway,
) -> (
    RefundProcessor<MemoryJobStore, ScriptedGateway>,
    Arc<MemoryJobStore>,
    Arc<ScriptedGateway>,
) {
    let store = Arc::new(MemoryJobStore::with_jobs(jobs));
    let gateway = Arc::new(gateway);
    let processor = RefundProcessor::new(store.clone(), gateway.clone());
    (processor, store, gateway)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable");
    serde_json::from_slice(&bytes).expect("body is json")
}

#[derive(Default)]
pub(super) struct MemoryJobStore {
    jobs: Mutex<Vec<RefundJob>>,
    fetches: AtomicUsize,
}

impl MemoryJobStore {
    pub(super) fn with_jobs(jobs: Vec<RefundJob>) -> Self {
        Self {
            jobs: Mutex::new(jobs),
            fetches: AtomicUsize::new(0),
        }
    }

    pub(super) fn job(&self, id: &str) -> RefundJob {
        self.jobs
            .lock()
            .expect("job mutex poisoned")
            .iter()
            .find(|job| job.id.0 == id)
            .cloned()
            .expect("job exists")
    }

    pub(super) fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    fn settle(
        &self,
        id: &RefundJobId,
        apply: impl FnOnce(&mut RefundJob),
    ) -> Result<(), JobStoreError> {
        let mut guard = self.jobs.lock().expect("job mutex poisoned");
        let job = guard
            .iter_mut()
            .find(|job| &job.id == id)
            .ok_or_else(|| JobStoreError::NotFound(id.clone()))?;
        if job.status.is_terminal() {
            return Err(JobStoreError::Conflict(id.clone()));
        }
        apply(job);
        Ok(())
    }
}

#[async_trait]
impl RefundJobStore for MemoryJobStore {
    async fn pending(&self, limit: usize) -> Result<Vec<RefundJob>, JobStoreError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let guard = self.jobs.lock().expect("job mutex poisoned");
        Ok(guard
            .iter()
            .filter(|job| job.status == RefundJobStatus::Pending)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn mark_processed(
        &self,
        id: &RefundJobId,
        processed_at: DateTime<Utc>,
    ) -> Result<(), JobStoreError> {
        self.settle(id, |job| {
            job.status = RefundJobStatus::Processed;
            job.processed_at = Some(processed_at);
        })
    }

    async fn mark_failed(
        &self,
        id: &RefundJobId,
        error_message: &str,
    ) -> Result<(), JobStoreError> {
        self.settle(id, |job| {
            job.status = RefundJobStatus::Failed;
            job.error_message = Some(error_message.to_string());
        })
    }
}

/// Store whose reads work but every write fails.
pub(super) struct ReadOnlyJobStore {
    pub(super) inner: MemoryJobStore,
}

#[async_trait]
impl RefundJobStore for ReadOnlyJobStore {
    async fn pending(&self, limit: usize) -> Result<Vec<RefundJob>, JobStoreError> {
        self.inner.pending(limit).await
    }

    async fn mark_processed(
        &self,
        _id: &RefundJobId,
        _processed_at: DateTime<Utc>,
    ) -> Result<(), JobStoreError> {
        Err(JobStoreError::Unavailable("read only replica".to_string()))
    }

    async fn mark_failed(
        &self,
        _id: &RefundJobId,
        _error_message: &str,
    ) -> Result<(), JobStoreError> {
        Err(JobStoreError::Unavailable("read only replica".to_string()))
    }
}

pub(super) struct UnavailableJobStore;

#[async_trait]
impl RefundJobStore for UnavailableJobStore {
    async fn pending(&self, _limit: usize) -> Result<Vec<RefundJob>, JobStoreError> {
        Err(JobStoreError::Unavailable("database offline".to_string()))
    }

    async fn mark_processed(
        &self,
        _id: &RefundJobId,
        _processed_at: DateTime<Utc>,
    ) -> Result<(), JobStoreError> {
        Err(JobStoreError::Unavailable("database offline".to_string()))
    }

    async fn mark_failed(
        &self,
        _id: &RefundJobId,
        _error_message: &str,
    ) -> Result<(), JobStoreError> {
        Err(JobStoreError::Unavailable("database offline".to_string()))
    }
}

/// Gateway that refunds everything except the payment intents it is told to reject.
#[derive(Default)]
pub(super) struct ScriptedGateway {
    rejections: HashMap<String, GatewayError>,
    calls: Mutex<Vec<RefundRequest>>,
}

impl ScriptedGateway {
    pub(super) fn rejecting(payment_intent_id: &str, message: &str) -> Self {
        let mut rejections = HashMap::new();
        rejections.insert(
            payment_intent_id.to_string(),
            GatewayError::Rejected {
                status: 400,
                message: message.to_string(),
            },
        );
        Self {
            rejections,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn calls(&self) -> Vec<RefundRequest> {
        self.calls.lock().expect("gateway mutex poisoned").clone()
    }
}

#[async_trait]
impl PaymentGateway for ScriptedGateway {
    async fn create_refund(&self, request: RefundRequest) -> Result<GatewayRefund, GatewayError> {
        let mut calls = self.calls.lock().expect("gateway mutex poisoned");
        calls.push(request.clone());
        if let Some(err) = self.rejections.get(&request.payment_intent_id) {
            return Err(err.clone());
        }
        Ok(GatewayRefund {
            id: format!("re_{}", calls.len()),
            status: Some("succeeded".to_string()),
        })
    }
}

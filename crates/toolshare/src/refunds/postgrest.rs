use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use super::domain::{RefundJob, RefundJobId, RefundJobStatus};
use super::repository::{JobStoreError, RefundJobStore};

const TABLE: &str = "refund_jobs";
const COLUMNS: &str = "id,payment_intent_id,amount,status,error_message,processed_at";

/// Job store over the managed backend's PostgREST interface.
pub struct PostgrestJobStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PostgrestJobStore {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, JobStoreError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| JobStoreError::Unavailable(err.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{TABLE}", self.base_url)
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.table_url())
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// Moves a pending job to `body.status`; settled jobs are left alone.
    async fn settle(&self, id: &RefundJobId, body: Value) -> Result<(), JobStoreError> {
        let id_filter = format!("eq.{id}");
        let response = self
            .request(reqwest::Method::PATCH)
            .query(&[("id", id_filter.as_str()), ("status", "eq.pending")])
            .header("Prefer", "return=representation")
            .json(&body)
            .send()
            .await
            .map_err(|err| JobStoreError::Unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(JobStoreError::Unavailable(format!(
                "update returned {status}: {detail}"
            )));
        }

        let updated: Vec<Value> = response
            .json()
            .await
            .map_err(|err| JobStoreError::Malformed(err.to_string()))?;
        if updated.is_empty() {
            return Err(JobStoreError::Conflict(id.clone()));
        }
        Ok(())
    }
}

#[async_trait]
impl RefundJobStore for PostgrestJobStore {
    async fn pending(&self, limit: usize) -> Result<Vec<RefundJob>, JobStoreError> {
        let limit = limit.to_string();
        let response = self
            .request(reqwest::Method::GET)
            .query(&[
                ("select", COLUMNS),
                ("status", "eq.pending"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|err| JobStoreError::Unavailable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(JobStoreError::Unavailable(format!(
                "fetch returned {status}: {detail}"
            )));
        }

        response
            .json::<Vec<RefundJob>>()
            .await
            .map_err(|err| JobStoreError::Malformed(err.to_string()))
    }

    async fn mark_processed(
        &self,
        id: &RefundJobId,
        processed_at: DateTime<Utc>,
    ) -> Result<(), JobStoreError> {
        let body = json!({
            "status": RefundJobStatus::Processed.label(),
            "processed_at": processed_at,
        });
        self.settle(id, body).await
    }

    async fn mark_failed(
        &self,
        id: &RefundJobId,
        error_message: &str,
    ) -> Result<(), JobStoreError> {
        let body = json!({
            "status": RefundJobStatus::Failed.label(),
            "error_message": error_message,
        });
        self.settle(id, body).await
    }
}

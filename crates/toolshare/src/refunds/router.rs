use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::json;
use tracing::error;

use super::domain::PassReport;
use super::processor::RefundProcessor;
use super::repository::{PaymentGateway, RefundJobStore};

pub const PROCESS_REFUNDS_PATH: &str = "/api/cron/process-refunds";

/// Scheduler-facing wrapper around a processor and its shared secret.
pub struct CronTrigger<S, G> {
    processor: Arc<RefundProcessor<S, G>>,
    cron_secret: Option<String>,
}

impl<S, G> CronTrigger<S, G> {
    pub fn new(processor: Arc<RefundProcessor<S, G>>, cron_secret: Option<String>) -> Self {
        Self {
            processor,
            cron_secret: cron_secret.filter(|secret| !secret.is_empty()),
        }
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let Some(secret) = &self.cron_secret else {
            return true;
        };
        headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|token| token == secret)
    }
}

/// Router exposing the refund cron trigger.
pub fn refund_router<S, G>(trigger: Arc<CronTrigger<S, G>>) -> Router
where
    S: RefundJobStore + 'static,
    G: PaymentGateway + 'static,
{
    Router::new()
        .route(PROCESS_REFUNDS_PATH, get(process_refunds_handler::<S, G>))
        .with_state(trigger)
}

pub(crate) async fn process_refunds_handler<S, G>(
    State(trigger): State<Arc<CronTrigger<S, G>>>,
    headers: HeaderMap,
) -> Response
where
    S: RefundJobStore + 'static,
    G: PaymentGateway + 'static,
{
    if !trigger.authorized(&headers) {
        let payload = json!({ "error": "Unauthorized" });
        return (StatusCode::UNAUTHORIZED, axum::Json(payload)).into_response();
    }

    match trigger.processor.run_pass().await {
        Ok(PassReport::NoPending) => {
            let payload = json!({ "message": "No pending refunds" });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Ok(PassReport::Processed(results)) => {
            let payload = json!({ "results": results });
            (StatusCode::OK, axum::Json(payload)).into_response()
        }
        Err(err) => {
            error!(error = %err, "refund pass aborted");
            let payload = json!({ "error": err.to_string() });
            (StatusCode::INTERNAL_SERVER_ERROR, axum::Json(payload)).into_response()
        }
    }
}

use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use toolshare::config::RefundConfig;
use toolshare::error::AppError;
use toolshare::geo::Coordinates;
use toolshare::refunds::{PostgrestJobStore, RefundProcessor, StripeGateway};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) type LiveRefundProcessor = RefundProcessor<PostgrestJobStore, StripeGateway>;

/// Wires the processor to the live job store and gateway when both are configured.
pub(crate) fn build_refund_processor(
    config: &RefundConfig,
) -> Result<Option<LiveRefundProcessor>, AppError> {
    let (Some(stripe), Some(job_store)) = (&config.stripe, &config.job_store) else {
        return Ok(None);
    };

    let store = PostgrestJobStore::new(&job_store.url, &job_store.service_key, config.http_timeout)?;
    let gateway = StripeGateway::new(&stripe.secret_key, &stripe.api_base, config.http_timeout)?;

    Ok(Some(RefundProcessor::with_batch_size(
        Arc::new(store),
        Arc::new(gateway),
        config.batch_size,
    )))
}

pub(crate) fn parse_coordinates(raw: &str) -> Result<Coordinates, String> {
    let (lat, lng) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG but got '{raw}'"))?;
    let latitude = lat
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("failed to parse latitude '{lat}' ({err})"))?;
    let longitude = lng
        .trim()
        .parse::<f64>()
        .map_err(|err| format!("failed to parse longitude '{lng}' ({err})"))?;
    Coordinates::new(latitude, longitude).map_err(|err| err.to_string())
}

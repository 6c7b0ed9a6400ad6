use crate::cli::ServeArgs;
use crate::infra::{build_refund_processor, AppState};
use crate::routes::with_marketplace_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use toolshare::admission::{MemoryRateLimitStore, RateLimiter};
use toolshare::config::AppConfig;
use toolshare::error::AppError;
use toolshare::refunds::{refund_router, CronTrigger};
use toolshare::telemetry;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let limiter = Arc::new(RateLimiter::new(
        Arc::new(MemoryRateLimitStore::new(config.admission.max_tracked)),
        config.admission.policy()?,
    ));

    let mut app = with_marketplace_routes(limiter);

    match build_refund_processor(&config.refunds)? {
        Some(processor) => {
            if config.refunds.cron_secret.is_none() {
                warn!("CRON_SECRET is unset; the refund trigger accepts any caller");
            }
            let trigger = Arc::new(CronTrigger::new(
                Arc::new(processor),
                config.refunds.cron_secret.clone(),
            ));
            app = app.merge(refund_router(trigger));
        }
        None => {
            warn!("refund processing disabled; payment gateway or job store credentials missing")
        }
    }

    let app = app.layer(Extension(app_state)).layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "toolshare settlement service ready");

    axum::serve(listener, app).await?;
    Ok(())
}

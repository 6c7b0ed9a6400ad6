use crate::infra::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use toolshare::admission::middleware::enforce;
use toolshare::admission::{Clock, RateLimitStore, RateLimiter};
use toolshare::error::AppError;
use toolshare::geo::{haversine_miles, Coordinates};
use toolshare::pricing::{compute_price, PricingResult, RiskTier};

pub(crate) const QUOTE_PATH: &str = "/api/v1/pricing/quote";
pub(crate) const DISTANCE_PATH: &str = "/api/v1/distance";

#[derive(Debug, Deserialize)]
pub(crate) struct QuoteRequest {
    pub(crate) daily_rate: Decimal,
    pub(crate) days: u32,
    pub(crate) risk_tier: u8,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DistanceQuery {
    pub(crate) from_lat: f64,
    pub(crate) from_lng: f64,
    pub(crate) to_lat: f64,
    pub(crate) to_lng: f64,
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct DistanceResponse {
    pub(crate) miles: f64,
}

/// Operational routes plus the rate-limited marketplace API.
pub(crate) fn with_marketplace_routes<S, C>(limiter: Arc<RateLimiter<S, C>>) -> Router
where
    S: RateLimitStore + 'static,
    C: Clock + 'static,
{
    let limited = Router::new()
        .route(QUOTE_PATH, post(quote_endpoint))
        .route(DISTANCE_PATH, get(distance_endpoint))
        .layer(middleware::from_fn_with_state(limiter, enforce::<S, C>));

    Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .merge(limited)
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn quote_endpoint(
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<PricingResult>, AppError> {
    let Json(payload) =
        payload.map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))?;
    let risk_tier = RiskTier::try_from(payload.risk_tier)?;
    let result = compute_price(payload.daily_rate, payload.days, risk_tier)?;
    Ok(Json(result))
}

pub(crate) async fn distance_endpoint(
    query: Result<Query<DistanceQuery>, QueryRejection>,
) -> Result<Json<DistanceResponse>, AppError> {
    let Query(query) =
        query.map_err(|rejection| AppError::InvalidRequest(rejection.body_text()))?;
    let from = Coordinates::new(query.from_lat, query.from_lng)?;
    let to = Coordinates::new(query.to_lat, query.to_lng)?;
    let miles = haversine_miles(from, to)?;
    Ok(Json(DistanceResponse { miles }))
}

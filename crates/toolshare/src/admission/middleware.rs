use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{debug, error};

use super::clock::Clock;
use super::limiter::{Admission, RateLimiter};
use super::store::RateLimitStore;

pub const LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

const ANONYMOUS: &str = "anonymous";

/// Caller identity used as the rate-limit key.
///
/// Takes the first hop of `X-Forwarded-For`, then `X-Real-IP`.
pub fn client_identifier(headers: &HeaderMap) -> String {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());

    let real_ip = || {
        headers
            .get("x-real-ip")
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    forwarded
        .or_else(real_ip)
        .unwrap_or(ANONYMOUS)
        .to_string()
}

/// Middleware for `axum::middleware::from_fn_with_state`.
pub async fn enforce<S, C>(
    State(limiter): State<Arc<RateLimiter<S, C>>>,
    request: Request,
    next: Next,
) -> Response
where
    S: RateLimitStore + 'static,
    C: Clock + 'static,
{
    let identifier = client_identifier(request.headers());

    let admission = match limiter.check(&identifier) {
        Ok(admission) => admission,
        Err(err) => {
            error!(%identifier, error = %err, "admission check failed");
            let body = Json(json!({ "error": "Rate limiting unavailable" }));
            return (StatusCode::SERVICE_UNAVAILABLE, body).into_response();
        }
    };

    if !admission.success {
        debug!(%identifier, reset = %admission.reset, "request throttled");
        let wait_ms = (admission.reset - limiter.now()).num_milliseconds().max(0) as u64;
        let retry_after = wait_ms.div_ceil(1000).max(1);

        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": "Too many requests" })),
        )
            .into_response();
        apply_headers(response.headers_mut(), &admission);
        response.headers_mut().insert(
            axum::http::header::RETRY_AFTER,
            HeaderValue::from(retry_after),
        );
        return response;
    }

    let mut response = next.run(request).await;
    apply_headers(response.headers_mut(), &admission);
    response
}

fn apply_headers(headers: &mut HeaderMap, admission: &Admission) {
    headers.insert(
        HeaderName::from_static(LIMIT_HEADER),
        HeaderValue::from(admission.limit),
    );
    headers.insert(
        HeaderName::from_static(REMAINING_HEADER),
        HeaderValue::from(admission.remaining),
    );
    headers.insert(
        HeaderName::from_static(RESET_HEADER),
        HeaderValue::from(admission.reset.timestamp_millis()),
    );
}

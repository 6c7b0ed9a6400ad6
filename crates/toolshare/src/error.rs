use crate::admission::AdmissionError;
use crate::config::ConfigError;
use crate::refunds::{GatewayError, JobStoreError, ProcessorError};
use crate::telemetry::TelemetryError;
use crate::validation::ValidationError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Validation(ValidationError),
    /// Request body or query that could not be decoded.
    InvalidRequest(String),
    Admission(AdmissionError),
    Refunds(ProcessorError),
    Gateway(GatewayError),
    JobStore(JobStoreError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Validation(err) => write!(f, "{}", err),
            AppError::InvalidRequest(message) => write!(f, "invalid request: {}", message),
            AppError::Admission(err) => write!(f, "admission error: {}", err),
            AppError::Refunds(err) => write!(f, "refund error: {}", err),
            AppError::Gateway(err) => write!(f, "payment gateway error: {}", err),
            AppError::JobStore(err) => write!(f, "job store error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Validation(err) => Some(err),
            AppError::InvalidRequest(_) => None,
            AppError::Admission(err) => Some(err),
            AppError::Refunds(err) => Some(err),
            AppError::Gateway(err) => Some(err),
            AppError::JobStore(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Validation(_) | AppError::InvalidRequest(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::Admission(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Refunds(_)
            | AppError::Gateway(_)
            | AppError::JobStore(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ValidationError> for AppError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<AdmissionError> for AppError {
    fn from(value: AdmissionError) -> Self {
        Self::Admission(value)
    }
}

impl From<ProcessorError> for AppError {
    fn from(value: ProcessorError) -> Self {
        Self::Refunds(value)
    }
}

impl From<GatewayError> for AppError {
    fn from(value: GatewayError) -> Self {
        Self::Gateway(value)
    }
}

impl From<JobStoreError> for AppError {
    fn from(value: JobStoreError) -> Self {
        Self::JobStore(value)
    }
}

use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::admission::{RateLimitPolicy, DEFAULT_MAX_TRACKED};
use crate::refunds::stripe::DEFAULT_API_BASE;
use crate::refunds::DEFAULT_BATCH_SIZE;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub admission: AdmissionConfig,
    pub refunds: RefundConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let admission = AdmissionConfig {
            limit: parse_or("RATE_LIMIT_MAX_REQUESTS", RateLimitPolicy::DEFAULT_LIMIT)?,
            window_ms: parse_or("RATE_LIMIT_WINDOW_MS", RateLimitPolicy::DEFAULT_WINDOW_MS)?,
            max_tracked: parse_or("RATE_LIMIT_MAX_TRACKED", DEFAULT_MAX_TRACKED)?,
        };
        admission.policy()?;

        let stripe = non_empty("STRIPE_SECRET_KEY").map(|secret_key| StripeConfig {
            secret_key,
            api_base: non_empty("STRIPE_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
        });

        let job_store = match (non_empty("SUPABASE_URL"), non_empty("SUPABASE_SERVICE_ROLE_KEY")) {
            (Some(url), Some(service_key)) => Some(JobStoreConfig { url, service_key }),
            _ => None,
        };

        let refunds = RefundConfig {
            batch_size: parse_or("REFUND_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
            cron_secret: non_empty("CRON_SECRET"),
            http_timeout: Duration::from_secs(parse_or("STRIPE_TIMEOUT_SECS", 30u64)?),
            stripe,
            job_store,
        };
        if refunds.batch_size == 0 {
            return Err(ConfigError::InvalidNumber {
                variable: "REFUND_BATCH_SIZE",
            });
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            admission,
            refunds,
        })
    }
}

fn non_empty(variable: &str) -> Option<String> {
    env::var(variable)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_or<T: FromStr>(variable: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty(variable) {
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { variable }),
        None => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Quota applied to rate-limited routes.
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    pub limit: u32,
    pub window_ms: i64,
    pub max_tracked: usize,
}

impl AdmissionConfig {
    pub fn policy(&self) -> Result<RateLimitPolicy, ConfigError> {
        RateLimitPolicy::new(self.limit, self.window_ms).map_err(|_| ConfigError::InvalidRateLimit)
    }
}

/// Refund pass settings and credentials for its collaborators.
#[derive(Clone)]
pub struct RefundConfig {
    pub batch_size: usize,
    pub cron_secret: Option<String>,
    pub http_timeout: Duration,
    pub stripe: Option<StripeConfig>,
    pub job_store: Option<JobStoreConfig>,
}

impl RefundConfig {
    /// Both collaborators are configured.
    pub fn is_enabled(&self) -> bool {
        self.stripe.is_some() && self.job_store.is_some()
    }
}

// Credentials stay out of Debug output.
impl fmt::Debug for RefundConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefundConfig")
            .field("batch_size", &self.batch_size)
            .field("cron_secret", &self.cron_secret.as_ref().map(|_| "<redacted>"))
            .field("http_timeout", &self.http_timeout)
            .field("stripe", &self.stripe.as_ref().map(|s| &s.api_base))
            .field("job_store", &self.job_store.as_ref().map(|j| &j.url))
            .finish()
    }
}

#[derive(Clone)]
pub struct StripeConfig {
    pub secret_key: String,
    pub api_base: String,
}

#[derive(Clone)]
pub struct JobStoreConfig {
    pub url: String,
    pub service_key: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { variable: &'static str },
    InvalidRateLimit,
    RefundsDisabled,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { variable } => {
                write!(f, "{variable} must be a positive number")
            }
            ConfigError::InvalidRateLimit => write!(
                f,
                "RATE_LIMIT_MAX_REQUESTS must be positive and RATE_LIMIT_WINDOW_MS between 1 and 86400000"
            ),
            ConfigError::RefundsDisabled => write!(
                f,
                "refund processing requires STRIPE_SECRET_KEY, SUPABASE_URL and SUPABASE_SERVICE_ROLE_KEY"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::InvalidPort
            | ConfigError::InvalidNumber { .. }
            | ConfigError::InvalidRateLimit
            | ConfigError::RefundsDisabled => None,
        }
    }
}

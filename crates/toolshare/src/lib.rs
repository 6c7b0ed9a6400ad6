pub mod admission;
pub mod config;
pub mod error;
pub mod geo;
pub mod pricing;
pub mod refunds;
pub mod telemetry;
pub mod validation;

//! Refund job processing.
//!
//! Refunds are queued as rows in an external job store. A scheduler hits the
//! cron route, which runs one [`RefundProcessor::run_pass`]: up to a batch of
//! pending jobs is pushed through the payment gateway one at a time and each
//! job is written back as processed or failed on its own.

pub mod domain;
pub mod postgrest;
pub mod processor;
pub mod repository;
pub mod router;
pub mod stripe;

#[cfg(test)]
mod tests;

pub use domain::{
    to_minor_units, AmountError, GatewayRefund, PassReport, RefundFailure, RefundJob, RefundJobId,
    RefundJobStatus, RefundOutcome, RefundRequest, RefundSuccess,
};
pub use postgrest::PostgrestJobStore;
pub use processor::{ProcessorError, RefundProcessor, DEFAULT_BATCH_SIZE};
pub use repository::{GatewayError, JobStoreError, PaymentGateway, RefundJobStore};
pub use router::{refund_router, CronTrigger, PROCESS_REFUNDS_PATH};
pub use stripe::StripeGateway;

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefundJobId(pub String);

impl fmt::Display for RefundJobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefundJobStatus {
    Pending,
    Processed,
    Failed,
}

impl RefundJobStatus {
    pub fn label(self) -> &'static str {
        match self {
            RefundJobStatus::Pending => "pending",
            RefundJobStatus::Processed => "processed",
            RefundJobStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, RefundJobStatus::Pending)
    }
}

/// A queued refund as stored in the `refund_jobs` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefundJob {
    pub id: RefundJobId,
    pub payment_intent_id: String,
    /// Partial refund in dollars; absent means refund the full charge.
    #[serde(default)]
    pub amount: Option<Decimal>,
    pub status: RefundJobStatus,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
}

impl RefundJob {
    pub fn pending(id: impl Into<String>, payment_intent_id: impl Into<String>) -> Self {
        Self {
            id: RefundJobId(id.into()),
            payment_intent_id: payment_intent_id.into(),
            amount: None,
            status: RefundJobStatus::Pending,
            error_message: None,
            processed_at: None,
        }
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    /// Key sent with the gateway call so a replayed job cannot refund twice.
    pub fn idempotency_key(&self) -> String {
        format!("refund-job-{}", self.id)
    }

    /// Builds the gateway request, converting any partial amount to cents.
    pub fn refund_request(&self) -> Result<RefundRequest, AmountError> {
        let amount = self.amount.map(to_minor_units).transpose()?;
        Ok(RefundRequest {
            payment_intent_id: self.payment_intent_id.clone(),
            amount,
            idempotency_key: self.idempotency_key(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("refund amount must be positive (got {0})")]
    NotPositive(Decimal),
    #[error("refund amount {0} cannot be expressed in cents")]
    OutOfRange(Decimal),
}

/// Converts dollars to cents, rounding half away from zero.
pub fn to_minor_units(amount: Decimal) -> Result<i64, AmountError> {
    if amount <= Decimal::ZERO {
        return Err(AmountError::NotPositive(amount));
    }
    let cents = amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or(AmountError::OutOfRange(amount))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    match cents.to_i64() {
        Some(cents) if cents > 0 => Ok(cents),
        Some(_) => Err(AmountError::NotPositive(amount)),
        None => Err(AmountError::OutOfRange(amount)),
    }
}

/// Refund creation call sent to the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundRequest {
    pub payment_intent_id: String,
    /// Minor units; `None` refunds the whole charge.
    pub amount: Option<i64>,
    pub idempotency_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayRefund {
    pub id: String,
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundSuccess {
    pub id: RefundJobId,
    pub refund_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundFailure {
    pub id: RefundJobId,
    pub error: String,
}

/// Per-job entry in a pass report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RefundOutcome {
    Success { id: RefundJobId, refund_id: String },
    Failed { id: RefundJobId, error: String },
}

impl RefundOutcome {
    pub fn id(&self) -> &RefundJobId {
        match self {
            RefundOutcome::Success { id, .. } | RefundOutcome::Failed { id, .. } => id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RefundOutcome::Success { .. })
    }
}

impl From<Result<RefundSuccess, RefundFailure>> for RefundOutcome {
    fn from(result: Result<RefundSuccess, RefundFailure>) -> Self {
        match result {
            Ok(RefundSuccess { id, refund_id }) => RefundOutcome::Success { id, refund_id },
            Err(RefundFailure { id, error }) => RefundOutcome::Failed { id, error },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassReport {
    NoPending,
    Processed(Vec<RefundOutcome>),
}

impl PassReport {
    pub fn outcomes(&self) -> &[RefundOutcome] {
        match self {
            PassReport::NoPending => &[],
            PassReport::Processed(outcomes) => outcomes,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes().iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes().len() - self.succeeded()
    }
}

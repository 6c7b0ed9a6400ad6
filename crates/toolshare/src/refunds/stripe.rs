use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::domain::{GatewayRefund, RefundRequest};
use super::repository::{GatewayError, PaymentGateway};

pub const DEFAULT_API_BASE: &str = "https://api.stripe.com";

/// Payment gateway backed by the Stripe Refunds API.
pub struct StripeGateway {
    client: reqwest::Client,
    api_base: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct StripeRefund {
    id: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StripeErrorBody {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

impl StripeGateway {
    pub fn new(
        secret_key: impl Into<String>,
        api_base: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        })
    }

    fn refunds_url(&self) -> String {
        format!("{}/v1/refunds", self.api_base)
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_refund(&self, request: RefundRequest) -> Result<GatewayRefund, GatewayError> {
        let mut form = vec![("payment_intent", request.payment_intent_id)];
        if let Some(amount) = request.amount {
            form.push(("amount", amount.to_string()));
        }

        let response = self
            .client
            .post(self.refunds_url())
            .bearer_auth(&self.secret_key)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&form)
            .send()
            .await
            .map_err(|err| GatewayError::Transport(err.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let refund: StripeRefund = response
                .json()
                .await
                .map_err(|err| GatewayError::Transport(format!("unreadable refund response: {err}")))?;
            return Ok(GatewayRefund {
                id: refund.id,
                status: refund.status,
            });
        }

        let message = response
            .json::<StripeErrorBody>()
            .await
            .ok()
            .and_then(|body| body.error.message)
            .unwrap_or_else(|| format!("stripe responded with {status}"));

        Err(GatewayError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

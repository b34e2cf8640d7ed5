//! Stripe Checkout client.
//!
//! Creates hosted checkout sessions via `POST /v1/checkout/sessions`. The
//! request is form encoded with Stripe's bracketed keys
//! (`line_items[0][price_data][unit_amount]`).

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::Deserialize;

use super::{CheckoutSession, PaymentError, PaymentGateway, SessionRequest};
use crate::config::StripeConfig;

#[derive(Debug, Deserialize)]
struct SessionResponse {
    id: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

/// Stripe API client for checkout sessions.
#[derive(Clone)]
pub struct StripeGateway {
    client: reqwest::Client,
    config: StripeConfig,
}

impl StripeGateway {
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: StripeConfig) -> Result<Self, PaymentError> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;
        Ok(Self { client, config })
    }

    fn form(request: &SessionRequest) -> Vec<(String, String)> {
        let mut form = vec![
            ("mode".to_owned(), "payment".to_owned()),
            ("success_url".to_owned(), request.success_url.clone()),
            ("cancel_url".to_owned(), request.cancel_url.clone()),
            (
                "client_reference_id".to_owned(),
                request.client_reference_id.clone(),
            ),
        ];
        for (i, line) in request.lines.iter().enumerate() {
            let key = |field: &str| format!("line_items[{i}]{field}");
            form.push((key("[price_data][currency]"), request.currency.clone()));
            form.push((key("[price_data][product_data][name]"), line.name.clone()));
            form.push((
                key("[price_data][unit_amount]"),
                line.unit_amount.to_string(),
            ));
            form.push((key("[quantity]"), line.quantity.to_string()));
        }
        form
    }
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_session(
        &self,
        request: &SessionRequest,
    ) -> Result<CheckoutSession, PaymentError> {
        let url = format!(
            "{}/v1/checkout/sessions",
            self.config.api_base.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.config.secret_key.expose_secret())
            .form(&Self::form(request))
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .ok()
                .and_then(|e| e.error.message)
                .unwrap_or(body);
            tracing::warn!(status = status.as_u16(), %message, "stripe rejected checkout session");
            return Err(PaymentError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let session: SessionResponse = response
            .json()
            .await
            .map_err(|e| PaymentError::Parse(e.to_string()))?;

        Ok(CheckoutSession {
            id: session.id,
            url: session.url,
        })
    }
}

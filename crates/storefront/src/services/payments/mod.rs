//! Checkout: turn submitted line items into a payment-provider session.
//!
//! The provider sits behind [`PaymentGateway`] so the checkout logic can be
//! exercised without network access. [`stripe::StripeGateway`] is the
//! production implementation.

pub mod stripe;

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use wardrobe_core::{TOTAL_INTEGER_DIGITS, UserId, check_amount, to_minor_units};

use crate::config::CheckoutConfig;
use crate::db::{OrderStore, RepositoryError};
use crate::models::{LineItem, NewOrder};

pub use stripe::StripeGateway;

#[derive(Debug, Error)]
pub enum PaymentError {
    /// The submitted items cannot be charged.
    #[error("invalid checkout request: {0}")]
    InvalidRequest(String),

    /// No provider credentials configured.
    #[error("payments are not configured")]
    NotConfigured,

    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider answered with an error.
    #[error("provider error: {status} - {message}")]
    Provider { status: u16, message: String },

    /// Provider answered with something unreadable.
    #[error("parse error: {0}")]
    Parse(String),

    /// The session was created but the order could not be recorded.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// A line item in provider terms: integer minor units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChargeLine {
    pub name: String,
    pub unit_amount: i64,
    pub quantity: u32,
}

/// Everything the provider needs to open a hosted checkout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRequest {
    pub lines: Vec<ChargeLine>,
    pub currency: String,
    pub success_url: String,
    pub cancel_url: String,
    /// Our user id, echoed back by the provider on confirmation.
    pub client_reference_id: String,
}

/// Handle returned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
}

/// External checkout-session creation.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_session(&self, request: &SessionRequest)
    -> Result<CheckoutSession, PaymentError>;
}

/// Convert client line items into provider lines.
///
/// # Errors
///
/// Returns `PaymentError::InvalidRequest` for an empty list, a blank name, a
/// zero quantity, or a price that is negative or too large.
pub fn charge_lines(items: &[LineItem]) -> Result<Vec<ChargeLine>, PaymentError> {
    if items.is_empty() {
        return Err(PaymentError::InvalidRequest(
            "at least one item is required".to_owned(),
        ));
    }

    items
        .iter()
        .map(|item| {
            if item.name.trim().is_empty() {
                return Err(PaymentError::InvalidRequest(
                    "item name cannot be empty".to_owned(),
                ));
            }
            let quantity = item.effective_quantity();
            if quantity == 0 {
                return Err(PaymentError::InvalidRequest(format!(
                    "quantity for {} must be at least 1",
                    item.name
                )));
            }
            let unit_amount = to_minor_units(item.price)
                .map_err(|e| PaymentError::InvalidRequest(format!("{}: {e}", item.name)))?;
            Ok(ChargeLine {
                name: item.name.clone(),
                unit_amount,
                quantity,
            })
        })
        .collect()
}

/// Sum of `unit_amount × quantity` over `lines`, in major units.
///
/// The total is derived from the minor units sent to the provider, so the
/// recorded amount is exactly what the customer is charged.
///
/// # Errors
///
/// Returns `PaymentError::InvalidRequest` when the total overflows or exceeds
/// what an order can store.
pub fn order_total(lines: &[ChargeLine]) -> Result<Decimal, PaymentError> {
    let too_large = || PaymentError::InvalidRequest("order total too large".to_owned());

    let cents = lines.iter().try_fold(0_i64, |total, line| {
        line.unit_amount
            .checked_mul(i64::from(line.quantity))
            .and_then(|subtotal| total.checked_add(subtotal))
            .ok_or_else(too_large)
    })?;

    let amount = Decimal::new(cents, 2);
    check_amount(amount, TOTAL_INTEGER_DIGITS).map_err(|_| too_large())?;
    Ok(amount)
}

/// Creates checkout sessions and records the resulting orders.
#[derive(Clone)]
pub struct CheckoutService {
    gateway: Option<Arc<dyn PaymentGateway>>,
    orders: Arc<dyn OrderStore>,
    config: CheckoutConfig,
}

impl CheckoutService {
    #[must_use]
    pub fn new(
        gateway: Option<Arc<dyn PaymentGateway>>,
        orders: Arc<dyn OrderStore>,
        config: CheckoutConfig,
    ) -> Self {
        Self {
            gateway,
            orders,
            config,
        }
    }

    /// Open a checkout session for `user` and record the order.
    ///
    /// The provider is called exactly once; its failures are returned as-is.
    ///
    /// # Errors
    ///
    /// Returns `PaymentError::InvalidRequest` for unchargeable items,
    /// `PaymentError::NotConfigured` without a provider, or the provider's error.
    #[instrument(skip(self, items, address), fields(items = items.len()))]
    pub async fn checkout(
        &self,
        user: UserId,
        items: Vec<LineItem>,
        address: Option<serde_json::Value>,
    ) -> Result<CheckoutSession, PaymentError> {
        let lines = charge_lines(&items)?;
        let amount = order_total(&lines)?;
        let gateway = self.gateway.as_ref().ok_or(PaymentError::NotConfigured)?;

        let session = gateway
            .create_session(&SessionRequest {
                lines,
                currency: self.config.currency.clone(),
                success_url: self.config.success_url.clone(),
                cancel_url: self.config.cancel_url.clone(),
                client_reference_id: user.to_string(),
            })
            .await?;

        let order = self
            .orders
            .create_order(NewOrder {
                user_id: user,
                items,
                amount,
                address,
                checkout_session_id: Some(session.id.clone()),
            })
            .await?;

        tracing::info!(
            order_id = %order.id,
            session_id = %session.id,
            %amount,
            "checkout session created"
        );
        Ok(session)
    }
}

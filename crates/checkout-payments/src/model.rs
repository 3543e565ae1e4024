//! Gateway Data Model
//!
//! Local projections of the Stripe objects the checkout flow touches.
//! Payment state lives at Stripe; these are transient views keyed by ID.

use std::collections::HashMap;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{PaymentError, Result};

/// Default currency for new payment intents
pub const DEFAULT_CURRENCY: &str = "usd";

/// Stripe payment intent statuses
pub mod status {
    pub const REQUIRES_PAYMENT_METHOD: &str = "requires_payment_method";
    pub const REQUIRES_CONFIRMATION: &str = "requires_confirmation";
    pub const REQUIRES_ACTION: &str = "requires_action";
    pub const PROCESSING: &str = "processing";
    pub const REQUIRES_CAPTURE: &str = "requires_capture";
    pub const CANCELED: &str = "canceled";
    pub const SUCCEEDED: &str = "succeeded";
}

/// A payment intent as seen by the checkout flow
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    /// Stripe payment intent ID (`pi_...`)
    pub id: String,

    /// Amount in minor units (cents)
    pub amount: i64,

    /// Lowercase ISO currency code
    pub currency: String,

    /// Stripe status, verbatim
    pub status: String,

    /// Secret handed to Stripe.js to finish the payment in the browser
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Unix timestamp
    pub created: i64,

    #[serde(default)]
    pub customer: Option<String>,

    /// Card used, when Stripe returned the expanded payment method
    #[serde(default)]
    pub card: Option<CardSummary>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardSummary {
    /// Stripe brand name (`visa`, `mastercard`, `amex`, ...)
    pub brand: String,
    pub last4: String,
    pub exp_month: i64,
    pub exp_year: i64,
}

/// Parameters for a new payment intent
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatePaymentIntent {
    /// Amount in minor units
    pub amount: i64,
    pub currency: String,
    pub customer: Option<String>,

    /// Explicit method types; empty means automatic payment methods
    pub payment_method_types: Vec<String>,
    pub metadata: HashMap<String, String>,
}

impl CreatePaymentIntent {
    pub fn new(amount: i64, currency: impl Into<String>) -> Self {
        Self {
            amount,
            currency: currency.into(),
            customer: None,
            payment_method_types: Vec::new(),
            metadata: HashMap::new(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateCustomer {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: String,

    /// Stripe payment method type (`card`, `us_bank_account`, ...)
    pub kind: String,
    pub customer: Option<String>,
    pub card: Option<CardSummary>,
}

/// Refund, shaped like the Stripe refund object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refund {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_intent: Option<String>,
}

/// Convert a major-unit amount (dollars) into minor units (cents).
///
/// Rounds half away from zero, so `50.005` becomes `5001`.
pub fn to_minor_units(amount: Decimal) -> Result<i64> {
    if amount <= Decimal::ZERO {
        return Err(PaymentError::InvalidRequest(format!(
            "amount must be positive, got {amount}"
        )));
    }

    let out_of_range = || PaymentError::InvalidRequest(format!("amount out of range: {amount}"));

    amount
        .checked_mul(Decimal::ONE_HUNDRED)
        .ok_or_else(out_of_range)?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .ok_or_else(out_of_range)
}

/// Format minor units as a two-place decimal string (`10000` -> `"100.00"`).
pub fn format_minor_units(amount: i64) -> String {
    Decimal::new(amount, 2).to_string()
}

//! Legacy Gateway Compatibility
//!
//! The checkout pages were written against a previous gateway's response
//! shape. This module translates Stripe payment intents into that shape:
//! legacy status names, decimal amount strings and the legacy error container.
//!
//! ```text
//! Stripe status            Legacy status
//! ─────────────────────    ──────────────────────
//! requires_payment_method  Authorizing
//! requires_confirmation    Authorizing
//! requires_action          Authorizing
//! processing               SubmittedForSettlement
//! requires_capture         Authorized
//! canceled                 Voided
//! succeeded                Settled
//! anything else            (unchanged)
//! ```

use chrono::DateTime;
use serde::{Deserialize, Serialize};

use crate::error::PaymentError;
use crate::model::{CardSummary, PaymentIntent, format_minor_units, status};

pub const AUTHORIZING: &str = "Authorizing";
pub const SUBMITTED_FOR_SETTLEMENT: &str = "SubmittedForSettlement";
pub const AUTHORIZED: &str = "Authorized";
pub const VOIDED: &str = "Voided";
pub const SETTLED: &str = "Settled";

/// Statuses the result pages treat as a successful transaction.
///
/// Both vocabularies appear on purpose: some callers classify the raw Stripe
/// status, others the already-mapped legacy one.
pub const SUCCESS_STATUSES: [&str; 6] = [
    status::SUCCEEDED,
    status::PROCESSING,
    status::REQUIRES_CAPTURE,
    SETTLED,
    AUTHORIZED,
    SUBMITTED_FOR_SETTLEMENT,
];

/// Map a Stripe status to the legacy gateway's status name.
///
/// Unknown inputs come back unchanged.
pub fn map_status(stripe_status: &str) -> &str {
    match stripe_status {
        status::REQUIRES_PAYMENT_METHOD | status::REQUIRES_CONFIRMATION | status::REQUIRES_ACTION => {
            AUTHORIZING
        }
        status::PROCESSING => SUBMITTED_FOR_SETTLEMENT,
        status::REQUIRES_CAPTURE => AUTHORIZED,
        status::CANCELED => VOIDED,
        status::SUCCEEDED => SETTLED,
        other => other,
    }
}

/// Whether a status (Stripe or legacy) counts as a successful transaction
pub fn is_successful(status: &str) -> bool {
    SUCCESS_STATUSES.contains(&status)
}

/// Banner shown on the transaction page
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatusDisplay {
    pub header: &'static str,
    pub icon: &'static str,
    pub message: String,
}

impl StatusDisplay {
    pub fn for_status(status: &str) -> Self {
        if is_successful(status) {
            Self {
                header: "Sweet Success!",
                icon: "success",
                message: "Your test transaction has been successfully processed. \
                          See the Stripe API response and try again."
                    .into(),
            }
        } else {
            Self {
                header: "Transaction Failed",
                icon: "fail",
                message: format!(
                    "Your test transaction has a status of {status}. \
                     See the Stripe API response and try again."
                ),
            }
        }
    }

    pub fn is_success(&self) -> bool {
        self.icon == "success"
    }
}

/// A payment intent in the legacy transaction shape
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyTransaction {
    pub id: String,

    #[serde(rename = "type")]
    pub kind: String,

    /// Legacy status name
    pub status: String,

    /// Decimal string in major units (`"100.00"`)
    pub amount: String,

    /// Uppercase ISO code
    pub currency_iso_code: String,

    /// RFC 3339
    pub created_at: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub credit_card: Option<LegacyCreditCard>,
}

impl LegacyTransaction {
    pub fn from_intent(intent: &PaymentIntent) -> Self {
        Self {
            id: intent.id.clone(),
            kind: "sale".into(),
            status: map_status(&intent.status).to_string(),
            amount: format_minor_units(intent.amount),
            currency_iso_code: intent.currency.to_ascii_uppercase(),
            created_at: DateTime::from_timestamp(intent.created, 0).map(|t| t.to_rfc3339()),
            credit_card: intent.card.as_ref().map(LegacyCreditCard::from_card),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyCreditCard {
    pub card_type: String,
    pub last4: String,

    /// `MM/YYYY`
    pub expiration_date: String,
}

impl LegacyCreditCard {
    pub fn from_card(card: &CardSummary) -> Self {
        Self {
            card_type: legacy_card_type(&card.brand).to_string(),
            last4: card.last4.clone(),
            expiration_date: format!("{:02}/{}", card.exp_month, card.exp_year),
        }
    }
}

/// Legacy card type names; unknown brands pass through
pub fn legacy_card_type(brand: &str) -> &str {
    match brand {
        "visa" => "Visa",
        "mastercard" => "MasterCard",
        "amex" => "American Express",
        "discover" => "Discover",
        "jcb" => "JCB",
        "diners" => "Diners Club",
        "unionpay" => "UnionPay",
        other => other,
    }
}

/// Legacy result container
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyResult {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<LegacyTransaction>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    pub errors: LegacyErrors,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyErrors {
    pub deep_errors: Vec<LegacyError>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyError {
    pub attribute: String,
    pub code: String,
    pub message: String,
}

impl LegacyResult {
    pub fn from_intent(intent: &PaymentIntent) -> Self {
        let transaction = LegacyTransaction::from_intent(intent);
        if is_successful(&transaction.status) {
            return Self {
                success: true,
                transaction: Some(transaction),
                message: None,
                errors: LegacyErrors::default(),
            };
        }

        let message = format!("Transaction status: {}", transaction.status);
        Self {
            success: false,
            errors: LegacyErrors {
                deep_errors: vec![LegacyError {
                    attribute: "status".into(),
                    code: intent.status.clone(),
                    message: message.clone(),
                }],
            },
            transaction: Some(transaction),
            message: Some(message),
        }
    }

    /// Error container carrying only the user-facing message
    pub fn from_error(err: &PaymentError) -> Self {
        let code = match err {
            PaymentError::Gateway { .. } => "gateway_error",
            PaymentError::InvalidRequest(_) => "invalid_request",
            PaymentError::WebhookSignature(_) | PaymentError::WebhookParse(_) => "webhook_error",
            PaymentError::Config(_) => "configuration_error",
        };
        Self {
            success: false,
            transaction: None,
            message: Some(err.user_message().into()),
            errors: LegacyErrors {
                deep_errors: vec![LegacyError {
                    attribute: "base".into(),
                    code: code.into(),
                    message: err.user_message().into(),
                }],
            },
        }
    }
}

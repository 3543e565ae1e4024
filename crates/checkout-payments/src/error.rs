//! Payment Error Types

use std::fmt;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, PaymentError>;

/// Gateway operation that produced an error.
///
/// The display form is the prefix every wrapped processor error carries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayOperation {
    CreatePaymentIntent,
    RetrievePaymentIntent,
    ConfirmPaymentIntent,
    CreateCustomer,
    RetrieveCustomer,
    AttachPaymentMethod,
    ListPaymentMethods,
    CreateRefund,
}

impl GatewayOperation {
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::CreatePaymentIntent => "Failed to create payment intent",
            Self::RetrievePaymentIntent => "Failed to retrieve payment intent",
            Self::ConfirmPaymentIntent => "Failed to confirm payment intent",
            Self::CreateCustomer => "Failed to create customer",
            Self::RetrieveCustomer => "Failed to retrieve customer",
            Self::AttachPaymentMethod => "Failed to attach payment method",
            Self::ListPaymentMethods => "Failed to list payment methods",
            Self::CreateRefund => "Failed to create refund",
        }
    }
}

impl fmt::Display for GatewayOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Payment-related errors
#[derive(Error, Debug)]
pub enum PaymentError {
    /// Stripe API call failed
    #[error("{operation}: {message}")]
    Gateway {
        operation: GatewayOperation,
        message: String,
    },

    /// Request rejected before reaching Stripe (bad ID, bad amount, ...)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Webhook signature verification failed
    #[error("Webhook signature invalid: {0}")]
    WebhookSignature(String),

    /// Webhook payload parsing failed
    #[error("Webhook parse error: {0}")]
    WebhookParse(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PaymentError {
    pub fn gateway(operation: GatewayOperation, err: impl fmt::Display) -> Self {
        Self::Gateway {
            operation,
            message: err.to_string(),
        }
    }

    /// Whether the caller sent something we refused to forward.
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }

    /// Get user-friendly message
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::Gateway { .. } => "Payment processing failed. Please try again.",
            Self::InvalidRequest(_) => "The request was invalid. Please check your input.",
            Self::WebhookSignature(_) => "Webhook signature verification failed.",
            Self::Config(_) => "Service configuration error.",
            Self::WebhookParse(_) => "An error occurred processing your request.",
        }
    }
}

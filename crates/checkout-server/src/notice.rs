//! Checkout Notices
//!
//! A notice is the message shown on the checkout form after a redirect. It
//! travels in the redirect URL (`/checkouts/new?notice=...`) instead of a
//! session, so it shows again whenever that URL is reloaded or revisited.

pub const NEW_CHECKOUT_PATH: &str = "/checkouts/new";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    /// `POST /checkouts` without a payment intent ID
    MissingPaymentIntent,

    /// Stripe lookup failed while handling the checkout form
    RetrievalFailed,

    /// Stripe wants 3DS or another confirmation step
    RequiresVerification,

    /// Any other non-success status
    PaymentUnsuccessful { status: String },

    /// Stripe redirected back without `redirect_status=succeeded`
    PaymentIncomplete,

    /// Transaction page could not load the payment intent
    TransactionUnavailable,
}

impl Notice {
    pub const fn code(&self) -> &'static str {
        match self {
            Self::MissingPaymentIntent => "missing_payment_intent",
            Self::RetrievalFailed => "retrieval_failed",
            Self::RequiresVerification => "requires_verification",
            Self::PaymentUnsuccessful { .. } => "payment_unsuccessful",
            Self::PaymentIncomplete => "payment_incomplete",
            Self::TransactionUnavailable => "transaction_unavailable",
        }
    }

    /// Decode a notice from query parameters; unknown codes yield `None`
    pub fn from_code(code: &str, status: Option<&str>) -> Option<Self> {
        let notice = match code {
            "missing_payment_intent" => Self::MissingPaymentIntent,
            "retrieval_failed" => Self::RetrievalFailed,
            "requires_verification" => Self::RequiresVerification,
            "payment_unsuccessful" => Self::PaymentUnsuccessful {
                status: status.unwrap_or("unknown").to_string(),
            },
            "payment_incomplete" => Self::PaymentIncomplete,
            "transaction_unavailable" => Self::TransactionUnavailable,
            _ => return None,
        };
        Some(notice)
    }

    pub fn message(&self) -> String {
        match self {
            Self::MissingPaymentIntent => "Payment intent ID is required".into(),
            Self::RetrievalFailed => "Unable to retrieve payment details. Please try again.".into(),
            Self::RequiresVerification => {
                "Payment requires additional verification. Please complete the payment process.".into()
            }
            Self::PaymentUnsuccessful { status } => format!("Payment was not successful. Status: {status}"),
            Self::PaymentIncomplete => "Payment was not completed. Please try again.".into(),
            Self::TransactionUnavailable => "Transaction not found. Please try again.".into(),
        }
    }

    /// Checkout form URL carrying this notice
    pub fn location(&self) -> String {
        let mut params = vec![("notice", self.code())];
        if let Self::PaymentUnsuccessful { status } = self {
            params.push(("status", status.as_str()));
        }

        match serde_urlencoded::to_string(&params) {
            Ok(query) => format!("{NEW_CHECKOUT_PATH}?{query}"),
            Err(_) => NEW_CHECKOUT_PATH.to_string(),
        }
    }
}

//! HTML Pages
//!
//! Tera templates compiled into the binary. Every `.html` template is
//! autoescaped.

use checkout_payments::{LegacyTransaction, PaymentIntent, StatusDisplay};
use serde::Serialize;
use tera::{Context, Tera};

/// Default value of the amount field on the checkout form
pub const DEFAULT_AMOUNT: &str = "10";

const TEMPLATES: [(&str, &str); 3] = [
    ("layout.html", include_str!("../templates/layout.html")),
    ("new.html", include_str!("../templates/new.html")),
    ("show.html", include_str!("../templates/show.html")),
];

/// Checkout form context
#[derive(Debug, Serialize)]
pub struct NewCheckoutPage<'a> {
    pub publishable_key: &'a str,
    pub notice: Option<String>,
    pub amount: &'a str,
}

/// Transaction page context
#[derive(Debug, Serialize)]
pub struct ShowPage {
    pub transaction: LegacyTransaction,
    pub display: StatusDisplay,

    /// Status as Stripe reported it
    pub stripe_status: String,

    /// Pretty-printed intent, without the client secret
    pub response_json: String,
}

impl ShowPage {
    pub fn from_intent(intent: &PaymentIntent) -> Self {
        let transaction = LegacyTransaction::from_intent(intent);
        let display = StatusDisplay::for_status(&transaction.status);

        let redacted = PaymentIntent {
            client_secret: None,
            ..intent.clone()
        };
        let response_json = serde_json::to_string_pretty(&redacted).unwrap_or_default();

        Self {
            transaction,
            display,
            stripe_status: intent.status.clone(),
            response_json,
        }
    }
}

pub struct Views {
    tera: Tera,
}

impl Views {
    pub fn new() -> tera::Result<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(TEMPLATES)?;
        Ok(Self { tera })
    }

    pub fn new_checkout(&self, page: &NewCheckoutPage<'_>) -> tera::Result<String> {
        self.render("new.html", page)
    }

    pub fn show(&self, page: &ShowPage) -> tera::Result<String> {
        self.render("show.html", page)
    }

    fn render(&self, template: &str, page: &impl Serialize) -> tera::Result<String> {
        let context = Context::from_serialize(page)?;
        self.tera.render(template, &context)
    }
}

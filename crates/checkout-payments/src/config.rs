//! Stripe Configuration

use std::fmt;

use crate::error::{PaymentError, Result};

pub const SECRET_KEY_VAR: &str = "STRIPE_SECRET_KEY";
pub const PUBLISHABLE_KEY_VAR: &str = "STRIPE_PUBLISHABLE_KEY";
pub const WEBHOOK_SECRET_VAR: &str = "STRIPE_WEBHOOK_SECRET";

/// Stripe credentials, fixed at process start
#[derive(Clone)]
pub struct StripeConfig {
    /// Server-side API key (`sk_...`)
    pub secret_key: String,

    /// Browser-side key handed to Stripe.js (`pk_...`)
    pub publishable_key: String,

    /// Webhook signing secret; the webhook endpoint refuses to work without it
    pub webhook_secret: Option<String>,
}

impl StripeConfig {
    /// Build and validate a config from explicit values
    pub fn new(
        secret_key: impl Into<String>,
        publishable_key: impl Into<String>,
        webhook_secret: Option<String>,
    ) -> Result<Self> {
        let config = Self {
            secret_key: secret_key.into(),
            publishable_key: publishable_key.into(),
            webhook_secret: webhook_secret.filter(|s| !s.is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Create from environment variables
    ///
    /// Both API keys are required; the webhook secret is optional here.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let secret_key = lookup(SECRET_KEY_VAR)
            .ok_or_else(|| PaymentError::Config(format!("{SECRET_KEY_VAR} not set")))?;
        let publishable_key = lookup(PUBLISHABLE_KEY_VAR)
            .ok_or_else(|| PaymentError::Config(format!("{PUBLISHABLE_KEY_VAR} not set")))?;

        Self::new(secret_key, publishable_key, lookup(WEBHOOK_SECRET_VAR))
    }

    fn validate(&self) -> Result<()> {
        if !self.secret_key.starts_with("sk_") {
            return Err(PaymentError::Config(format!(
                "{SECRET_KEY_VAR} must start with sk_"
            )));
        }
        if !self.publishable_key.starts_with("pk_") {
            return Err(PaymentError::Config(format!(
                "{PUBLISHABLE_KEY_VAR} must start with pk_"
            )));
        }
        Ok(())
    }

    pub fn is_test_mode(&self) -> bool {
        self.secret_key.starts_with("sk_test_")
    }

    /// `"test"` or `"live"`
    pub fn mode(&self) -> &'static str {
        if self.is_test_mode() { "test" } else { "live" }
    }
}

impl fmt::Debug for StripeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeConfig")
            .field("secret_key", &"[redacted]")
            .field("publishable_key", &self.publishable_key)
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

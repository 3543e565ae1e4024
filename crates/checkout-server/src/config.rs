//! Server Configuration

use checkout_payments::{Result, StripeConfig};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Everything the server reads from the environment at startup
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub stripe: StripeConfig,
}

impl ServerConfig {
    /// Missing Stripe API keys are fatal
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into()),
            stripe: StripeConfig::from_env()?,
        })
    }
}

/// Log filter directives from `RUST_LOG`. Read after `.env` is loaded.
pub fn log_filter() -> String {
    log_filter_from(|name| std::env::var(name).ok())
}

fn log_filter_from(lookup: impl Fn(&str) -> Option<String>) -> String {
    lookup("RUST_LOG")
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.into())
}

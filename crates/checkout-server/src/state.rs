//! Application State

use std::sync::Arc;

use checkout_payments::{PaymentGateway, StripeConfig, WebhookDispatcher};

use crate::views::Views;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Payment processor (Stripe in production, a fake in tests)
    pub gateway: Arc<dyn PaymentGateway>,

    /// Webhook verification and dispatch
    pub webhooks: Arc<WebhookDispatcher>,

    /// Stripe keys, fixed at startup
    pub config: Arc<StripeConfig>,

    /// Compiled page templates
    pub views: Arc<Views>,
}

impl AppState {
    pub fn new(gateway: Arc<dyn PaymentGateway>, config: StripeConfig) -> tera::Result<Self> {
        Ok(Self {
            webhooks: Arc::new(WebhookDispatcher::new(gateway.clone())),
            gateway,
            config: Arc::new(config),
            views: Arc::new(Views::new()?),
        })
    }
}

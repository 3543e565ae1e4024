//! Stripe checkout demo server
//!
//! Reads Stripe keys from the environment (or `.env`) and serves the
//! checkout pages, the JSON API and the webhook endpoint.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkout_payments::{PaymentGateway, StripeGateway};
use checkout_server::{AppState, ServerConfig, app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment, RUST_LOG included
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(checkout_server::config::log_filter()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env().inspect_err(|e| {
        tracing::error!("{e}");
        tracing::error!("  Set STRIPE_SECRET_KEY and STRIPE_PUBLISHABLE_KEY in .env");
    })?;

    tracing::info!(mode = config.stripe.mode(), "✓ Stripe configured");
    if config.stripe.webhook_secret.is_none() {
        tracing::warn!("⚠ STRIPE_WEBHOOK_SECRET not set - /stripe/webhooks will answer 500");
    }

    let gateway: Arc<dyn PaymentGateway> = Arc::new(StripeGateway::new(&config.stripe));
    let state = AppState::new(gateway, config.stripe)?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 checkout server running on http://{}", config.bind_addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /checkouts/new              - Checkout form");
    tracing::info!("  POST /checkouts                  - Submit checkout");
    tracing::info!("  GET  /checkouts/:id              - Transaction result");
    tracing::info!("  POST /api/create-payment-intent  - Create payment intent");
    tracing::info!("  GET  /api/transactions/:id       - Legacy transaction view");
    tracing::info!("  POST /stripe/webhooks            - Stripe webhooks");
    tracing::info!("");

    axum::serve(listener, app(state)).await?;

    Ok(())
}

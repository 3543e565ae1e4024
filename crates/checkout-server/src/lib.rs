//! # checkout-server
//!
//! Axum server for the Stripe checkout demo: checkout pages, a small JSON
//! API over the payment gateway, and the Stripe webhook endpoint.

pub mod config;
pub mod handlers;
pub mod notice;
pub mod state;
pub mod views;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use config::ServerConfig;
pub use state::AppState;

use crate::handlers::{
    attach_payment_method, complete_checkout, confirm_payment_intent, create_checkout,
    create_customer, create_payment_intent, get_customer, get_transaction, health_check, index,
    list_payment_methods, new_checkout, refund_transaction, show_checkout, stripe_webhook,
};

/// Build the application router
pub fn app(state: AppState) -> Router {
    Router::new()
        // Pages
        .route("/", get(index))
        .route("/checkouts", post(create_checkout))
        .route("/checkouts/new", get(new_checkout))
        .route("/checkouts/complete", get(complete_checkout))
        .route("/checkouts/{id}", get(show_checkout))

        // Health
        .route("/health", get(health_check))

        // Payments API
        .route("/api/create-payment-intent", post(create_payment_intent))
        .route("/api/payment-intents/{id}/confirm", post(confirm_payment_intent))
        .route("/api/transactions/{id}", get(get_transaction))
        .route("/api/transactions/{id}/refund", post(refund_transaction))
        .route("/api/customers", post(create_customer))
        .route("/api/customers/{id}", get(get_customer))
        .route(
            "/api/customers/{id}/payment-methods",
            get(list_payment_methods).post(attach_payment_method),
        )

        // Webhooks
        .route("/stripe/webhooks", post(stripe_webhook))

        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

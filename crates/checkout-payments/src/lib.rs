//! # checkout-payments
//!
//! Stripe integration for the checkout demo.
//!
//! ## Flow
//!
//! ```text
//! ┌─────────┐     ┌──────────┐     ┌────────────────┐     ┌────────┐
//! │ Browser │────▶│  Router  │────▶│ PaymentGateway │────▶│ Stripe │
//! └─────────┘     └──────────┘     └────────────────┘     └────────┘
//!      ▲               │
//!      │          ┌────▼─────┐
//!      └──────────│  compat  │  Stripe status ─▶ legacy status
//!                 └──────────┘
//! ```
//!
//! Stripe does all of the real work (authorization, card checks, fraud,
//! webhook signing). This crate shapes requests and responses:
//!
//! - [`gateway`]: the [`PaymentGateway`] trait and its Stripe implementation.
//!   Every processor error is wrapped with an operation prefix.
//! - [`compat`]: translation into the previous gateway's response shape
//!   (status names, decimal amounts, error container).
//! - [`webhook`]: signature verification plus dispatch on event type.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use checkout_payments::{CreatePaymentIntent, PaymentGateway, StripeConfig, StripeGateway};
//!
//! let config = StripeConfig::from_env()?;
//! let gateway = StripeGateway::new(&config);
//!
//! let intent = gateway
//!     .create_payment_intent(CreatePaymentIntent::new(5000, "usd"))
//!     .await?;
//!
//! // Hand intent.client_secret to Stripe.js
//! ```

pub mod compat;
mod config;
mod error;
pub mod gateway;
mod model;
pub mod webhook;

pub use compat::{LegacyResult, LegacyTransaction, StatusDisplay, is_successful, map_status};
pub use config::StripeConfig;
pub use error::{GatewayOperation, PaymentError, Result};
pub use gateway::{PaymentGateway, StripeGateway};
pub use model::{
    CardSummary, CreateCustomer, CreatePaymentIntent, Customer, DEFAULT_CURRENCY, PaymentIntent,
    PaymentMethod, Refund, format_minor_units, status, to_minor_units,
};
pub use webhook::{VerifiedEvent, WebhookDispatcher, WebhookEvent};

//! Stripe Gateway Adapter
//!
//! Every processor call goes through [`PaymentGateway`]. The server holds one
//! `Arc<dyn PaymentGateway>` built at startup; tests swap in a fake.

use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;
use stripe::{
    AttachPaymentMethod, Client, CreateCustomer as StripeCreateCustomer,
    CreatePaymentIntent as StripeCreatePaymentIntent, CreatePaymentIntentAutomaticPaymentMethods,
    Currency, Customer as StripeCustomer, CustomerId, ListPaymentMethods,
    PaymentIntent as StripePaymentIntent, PaymentIntentId, PaymentMethod as StripePaymentMethod,
    PaymentMethodId, PaymentMethodTypeFilter, Webhook, WebhookError,
};

use crate::config::StripeConfig;
use crate::error::{GatewayOperation, PaymentError, Result};
use crate::model::{
    CardSummary, CreateCustomer, CreatePaymentIntent, Customer, PaymentIntent, PaymentMethod, Refund,
};
use crate::webhook::VerifiedEvent;

/// Payment processor operations used by the checkout flow
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(&self, request: CreatePaymentIntent) -> Result<PaymentIntent>;

    /// Retrieve a payment intent, with card details when available
    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent>;

    async fn confirm_payment_intent(
        &self,
        id: &str,
        payment_method: Option<&str>,
    ) -> Result<PaymentIntent>;

    async fn create_customer(&self, request: CreateCustomer) -> Result<Customer>;

    async fn retrieve_customer(&self, id: &str) -> Result<Customer>;

    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> Result<PaymentMethod>;

    /// Card payment methods saved on a customer
    async fn list_payment_methods(&self, customer_id: &str) -> Result<Vec<PaymentMethod>>;

    /// Refund a payment intent; `amount` in minor units, `None` for a full refund
    async fn create_refund(&self, payment_intent_id: &str, amount: Option<i64>) -> Result<Refund>;

    /// Verify a webhook signature and decode the event
    fn construct_event(&self, payload: &str, signature: &str, secret: &str) -> Result<VerifiedEvent>;
}

/// [`PaymentGateway`] backed by the Stripe API
pub struct StripeGateway {
    client: Client,
}

impl StripeGateway {
    pub fn new(config: &StripeConfig) -> Self {
        Self {
            client: Client::new(config.secret_key.clone()),
        }
    }
}

/// Form body for `POST /v1/payment_intents/:id/confirm`
#[derive(Serialize)]
struct ConfirmParams<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_method: Option<&'a str>,
    expand: &'a [&'a str],
}

/// Form body for `POST /v1/refunds`
#[derive(Serialize)]
struct RefundParams<'a> {
    payment_intent: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    amount: Option<i64>,
}

#[async_trait]
impl PaymentGateway for StripeGateway {
    async fn create_payment_intent(&self, request: CreatePaymentIntent) -> Result<PaymentIntent> {
        let op = GatewayOperation::CreatePaymentIntent;
        let currency = parse_currency(&request.currency)?;
        let customer = request
            .customer
            .as_deref()
            .map(|id| parse_id::<CustomerId>(id, "customer"))
            .transpose()?;

        let mut params = StripeCreatePaymentIntent::new(request.amount, currency);
        params.customer = customer;
        if request.payment_method_types.is_empty() {
            params.automatic_payment_methods = Some(CreatePaymentIntentAutomaticPaymentMethods {
                enabled: true,
                ..Default::default()
            });
        } else {
            params.payment_method_types = Some(request.payment_method_types);
        }
        if !request.metadata.is_empty() {
            params.metadata = Some(request.metadata);
        }

        let intent = StripePaymentIntent::create(&self.client, params)
            .await
            .map_err(|e| PaymentError::gateway(op, e))?;

        tracing::info!(
            payment_intent_id = %intent.id,
            amount = intent.amount,
            currency = %intent.currency,
            "Created payment intent"
        );

        Ok(intent_from_stripe(intent))
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent> {
        let op = GatewayOperation::RetrievePaymentIntent;
        let id = parse_id::<PaymentIntentId>(id, "payment intent")?;

        let intent = StripePaymentIntent::retrieve(&self.client, &id, &["payment_method"])
            .await
            .map_err(|e| PaymentError::gateway(op, e))?;

        Ok(intent_from_stripe(intent))
    }

    async fn confirm_payment_intent(
        &self,
        id: &str,
        payment_method: Option<&str>,
    ) -> Result<PaymentIntent> {
        let op = GatewayOperation::ConfirmPaymentIntent;
        let id = parse_id::<PaymentIntentId>(id, "payment intent")?;
        if let Some(pm) = payment_method {
            parse_id::<PaymentMethodId>(pm, "payment method")?;
        }

        let params = ConfirmParams {
            payment_method,
            expand: &["payment_method"],
        };
        let intent: StripePaymentIntent = self
            .client
            .post_form(&format!("/payment_intents/{id}/confirm"), params)
            .await
            .map_err(|e| PaymentError::gateway(op, e))?;

        tracing::info!(payment_intent_id = %intent.id, status = %intent.status, "Confirmed payment intent");

        Ok(intent_from_stripe(intent))
    }

    async fn create_customer(&self, request: CreateCustomer) -> Result<Customer> {
        let op = GatewayOperation::CreateCustomer;

        let mut params = StripeCreateCustomer::new();
        params.email = request.email.as_deref();
        params.name = request.name.as_deref();

        let customer = StripeCustomer::create(&self.client, params)
            .await
            .map_err(|e| PaymentError::gateway(op, e))?;

        tracing::info!(customer_id = %customer.id, "Created customer");

        Ok(customer_from_stripe(customer))
    }

    async fn retrieve_customer(&self, id: &str) -> Result<Customer> {
        let op = GatewayOperation::RetrieveCustomer;
        let id = parse_id::<CustomerId>(id, "customer")?;

        let customer = StripeCustomer::retrieve(&self.client, &id, &[])
            .await
            .map_err(|e| PaymentError::gateway(op, e))?;

        Ok(customer_from_stripe(customer))
    }

    async fn attach_payment_method(
        &self,
        payment_method_id: &str,
        customer_id: &str,
    ) -> Result<PaymentMethod> {
        let op = GatewayOperation::AttachPaymentMethod;
        let payment_method_id = parse_id::<PaymentMethodId>(payment_method_id, "payment method")?;
        let customer = parse_id::<CustomerId>(customer_id, "customer")?;

        let method = StripePaymentMethod::attach(
            &self.client,
            &payment_method_id,
            AttachPaymentMethod { customer },
        )
        .await
        .map_err(|e| PaymentError::gateway(op, e))?;

        tracing::info!(payment_method_id = %method.id, customer_id, "Attached payment method");

        Ok(method_from_stripe(method))
    }

    async fn list_payment_methods(&self, customer_id: &str) -> Result<Vec<PaymentMethod>> {
        let op = GatewayOperation::ListPaymentMethods;
        let customer = parse_id::<CustomerId>(customer_id, "customer")?;

        let mut params = ListPaymentMethods::new();
        params.customer = Some(customer);
        params.type_ = Some(PaymentMethodTypeFilter::Card);

        let list = StripePaymentMethod::list(&self.client, &params)
            .await
            .map_err(|e| PaymentError::gateway(op, e))?;

        Ok(list.data.into_iter().map(method_from_stripe).collect())
    }

    async fn create_refund(&self, payment_intent_id: &str, amount: Option<i64>) -> Result<Refund> {
        let op = GatewayOperation::CreateRefund;
        let id = parse_id::<PaymentIntentId>(payment_intent_id, "payment intent")?;

        let params = RefundParams {
            payment_intent: id.as_str(),
            amount,
        };
        let refund: Refund = self
            .client
            .post_form("/refunds", params)
            .await
            .map_err(|e| PaymentError::gateway(op, e))?;

        tracing::info!(
            refund_id = %refund.id,
            payment_intent_id = %id,
            amount = refund.amount,
            "Created refund"
        );

        Ok(refund)
    }

    fn construct_event(&self, payload: &str, signature: &str, secret: &str) -> Result<VerifiedEvent> {
        match Webhook::construct_event(payload, signature, secret) {
            // BadParse is only returned after the signature and timestamp check out
            Ok(_) | Err(WebhookError::BadParse(_)) => VerifiedEvent::from_payload(payload),
            Err(e) => Err(PaymentError::WebhookSignature(e.to_string())),
        }
    }
}

fn parse_id<T: FromStr>(raw: &str, kind: &str) -> Result<T> {
    raw.parse::<T>()
        .map_err(|_| PaymentError::InvalidRequest(format!("invalid {kind} id: {raw:?}")))
}

fn parse_currency(code: &str) -> Result<Currency> {
    serde_json::from_value(serde_json::Value::String(code.to_ascii_lowercase()))
        .map_err(|_| PaymentError::InvalidRequest(format!("unsupported currency: {code:?}")))
}

fn intent_from_stripe(intent: StripePaymentIntent) -> PaymentIntent {
    let card = intent
        .payment_method
        .as_ref()
        .and_then(|pm| pm.as_object())
        .and_then(card_from_method);

    PaymentIntent {
        id: intent.id.to_string(),
        amount: intent.amount,
        currency: intent.currency.to_string(),
        status: intent.status.to_string(),
        client_secret: intent.client_secret,
        created: intent.created,
        customer: intent.customer.as_ref().map(|c| c.id().to_string()),
        card,
    }
}

fn card_from_method(method: &StripePaymentMethod) -> Option<CardSummary> {
    method.card.as_ref().map(|card| CardSummary {
        brand: card.brand.clone(),
        last4: card.last4.clone(),
        exp_month: card.exp_month,
        exp_year: card.exp_year,
    })
}

fn method_from_stripe(method: StripePaymentMethod) -> PaymentMethod {
    PaymentMethod {
        id: method.id.to_string(),
        kind: method.type_.to_string(),
        customer: method.customer.as_ref().map(|c| c.id().to_string()),
        card: card_from_method(&method),
    }
}

fn customer_from_stripe(customer: StripeCustomer) -> Customer {
    Customer {
        id: customer.id.to_string(),
        email: customer.email,
        name: customer.name,
    }
}

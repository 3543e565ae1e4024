//! Shared test helpers: an in-memory gateway and request shortcuts
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use checkout_payments::{
    CreateCustomer, CreatePaymentIntent, Customer, GatewayOperation, PaymentError, PaymentGateway,
    PaymentIntent, PaymentMethod, Refund, Result, StripeConfig, VerifiedEvent,
};
use checkout_server::{AppState, app};

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";

/// Signature header the fake gateway accepts
pub const VALID_SIGNATURE: &str = "t=1700000000,v1=valid";

/// In-memory stand-in for Stripe
#[derive(Default)]
pub struct FakeGateway {
    pub intents: Mutex<HashMap<String, PaymentIntent>>,
    pub created: Mutex<Vec<CreatePaymentIntent>>,
    pub refunds: Mutex<Vec<(String, Option<i64>)>>,
    pub customers: Mutex<HashMap<String, Customer>>,
    pub methods: Mutex<Vec<PaymentMethod>>,
    pub fail_create: bool,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing_create() -> Arc<Self> {
        Arc::new(Self {
            fail_create: true,
            ..Self::default()
        })
    }

    pub fn with_intent(self: Arc<Self>, id: &str, status: &str, amount: i64) -> Arc<Self> {
        self.intents.lock().unwrap().insert(id.to_string(), intent(id, status, amount));
        self
    }

    pub fn created_requests(&self) -> Vec<CreatePaymentIntent> {
        self.created.lock().unwrap().clone()
    }
}

pub fn intent(id: &str, status: &str, amount: i64) -> PaymentIntent {
    PaymentIntent {
        id: id.to_string(),
        amount,
        currency: "usd".into(),
        status: status.to_string(),
        client_secret: Some(format!("{id}_secret_test")),
        created: 1_700_000_000,
        customer: None,
        card: None,
    }
}

fn not_found(operation: GatewayOperation, kind: &str, id: &str) -> PaymentError {
    PaymentError::gateway(operation, format!("No such {kind}: '{id}'"))
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_payment_intent(&self, request: CreatePaymentIntent) -> Result<PaymentIntent> {
        if self.fail_create {
            return Err(PaymentError::gateway(
                GatewayOperation::CreatePaymentIntent,
                "Amount must be at least $0.50 usd",
            ));
        }

        let mut created = self.created.lock().unwrap();
        created.push(request.clone());
        let id = format!("pi_fake{}", created.len());

        let mut new_intent = intent(&id, "requires_payment_method", request.amount);
        new_intent.currency = request.currency;
        self.intents.lock().unwrap().insert(id, new_intent.clone());
        Ok(new_intent)
    }

    async fn retrieve_payment_intent(&self, id: &str) -> Result<PaymentIntent> {
        self.intents
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(GatewayOperation::RetrievePaymentIntent, "payment_intent", id))
    }

    async fn confirm_payment_intent(&self, id: &str, _payment_method: Option<&str>) -> Result<PaymentIntent> {
        let mut intents = self.intents.lock().unwrap();
        let intent = intents
            .get_mut(id)
            .ok_or_else(|| not_found(GatewayOperation::ConfirmPaymentIntent, "payment_intent", id))?;
        intent.status = "succeeded".into();
        Ok(intent.clone())
    }

    async fn create_customer(&self, request: CreateCustomer) -> Result<Customer> {
        let mut customers = self.customers.lock().unwrap();
        let customer = Customer {
            id: format!("cus_fake{}", customers.len() + 1),
            email: request.email,
            name: request.name,
        };
        customers.insert(customer.id.clone(), customer.clone());
        Ok(customer)
    }

    async fn retrieve_customer(&self, id: &str) -> Result<Customer> {
        if !id.starts_with("cus_") {
            return Err(PaymentError::InvalidRequest(format!("invalid customer id: {id:?}")));
        }
        self.customers
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(GatewayOperation::RetrieveCustomer, "customer", id))
    }

    async fn attach_payment_method(&self, payment_method_id: &str, customer_id: &str) -> Result<PaymentMethod> {
        let method = PaymentMethod {
            id: payment_method_id.to_string(),
            kind: "card".into(),
            customer: Some(customer_id.to_string()),
            card: None,
        };
        self.methods.lock().unwrap().push(method.clone());
        Ok(method)
    }

    async fn list_payment_methods(&self, customer_id: &str) -> Result<Vec<PaymentMethod>> {
        Ok(self
            .methods
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.customer.as_deref() == Some(customer_id))
            .cloned()
            .collect())
    }

    async fn create_refund(&self, payment_intent_id: &str, amount: Option<i64>) -> Result<Refund> {
        let intent = self.retrieve_payment_intent(payment_intent_id).await.map_err(|_| {
            not_found(GatewayOperation::CreateRefund, "payment_intent", payment_intent_id)
        })?;
        self.refunds
            .lock()
            .unwrap()
            .push((payment_intent_id.to_string(), amount));
        Ok(Refund {
            id: "re_fake1".into(),
            amount: amount.unwrap_or(intent.amount),
            currency: intent.currency,
            status: Some("succeeded".into()),
            payment_intent: Some(payment_intent_id.to_string()),
        })
    }

    /// Accepts only [`VALID_SIGNATURE`] with [`WEBHOOK_SECRET`]; the payload is a
    /// Stripe-style event (`id`, `type`, `data.object`)
    fn construct_event(&self, payload: &str, signature: &str, secret: &str) -> Result<VerifiedEvent> {
        if !signature.contains("t=") {
            return Err(PaymentError::WebhookSignature("Unable to extract timestamp".into()));
        }
        if signature != VALID_SIGNATURE || secret != WEBHOOK_SECRET {
            return Err(PaymentError::WebhookSignature("No signatures found matching".into()));
        }

        VerifiedEvent::from_payload(payload)
    }
}

/// Stripe-style `stripe-signature` header for `payload`, stamped now
pub fn sign(payload: &str, secret: &str) -> String {
    let timestamp = chrono::Utc::now().timestamp();
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    format!("t={timestamp},v1={}", hex::encode(mac.finalize().into_bytes()))
}

pub fn test_config(webhook_secret: Option<&str>) -> StripeConfig {
    StripeConfig::new("sk_test_fake", "pk_test_fake", webhook_secret.map(str::to_string)).unwrap()
}

pub fn test_app(gateway: Arc<FakeGateway>) -> Router {
    let state = AppState::new(gateway, test_config(Some(WEBHOOK_SECRET))).unwrap();
    app(state)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl TestResponse {
    pub fn location(&self) -> &str {
        self.headers
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }
}

pub async fn send(app: Router, request: Request<Body>) -> TestResponse {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    TestResponse {
        status,
        headers,
        body: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}

pub async fn get(app: Router, uri: &str) -> TestResponse {
    send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
}

pub async fn post_form(app: Router, uri: &str, body: &str) -> TestResponse {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_json(app: Router, uri: &str, body: &Value) -> TestResponse {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_webhook(app: Router, payload: &str, signature: Option<&str>) -> TestResponse {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/stripe/webhooks")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(signature) = signature {
        builder = builder.header("stripe-signature", signature);
    }
    send(app, builder.body(Body::from(payload.to_string())).unwrap()).await
}

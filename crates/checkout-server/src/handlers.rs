//! HTTP Handlers

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use checkout_payments::{
    CreateCustomer, CreatePaymentIntent, Customer, DEFAULT_CURRENCY, LegacyResult, PaymentError,
    PaymentIntent, PaymentMethod, format_minor_units, status, to_minor_units,
};

use crate::notice::{NEW_CHECKOUT_PATH, Notice};
use crate::state::AppState;
use crate::views::{DEFAULT_AMOUNT, NewCheckoutPage, ShowPage};

pub const PAYMENT_INTENT_FAILED: &str = "Payment intent creation failed. Please try again.";
pub const WEBHOOK_SIGNATURE_FAILED: &str = "Webhook signature verification failed.";

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub stripe_mode: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl ErrorResponse {
    fn plain(error: &str) -> Json<Self> {
        Json(Self {
            error: error.into(),
            code: None,
        })
    }

    fn with_code(error: &str, code: &'static str) -> Json<Self> {
        Json(Self {
            error: error.into(),
            code: Some(code),
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct NewCheckoutQuery {
    pub notice: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteQuery {
    pub payment_intent: Option<String>,
    pub redirect_status: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub payment_intent_id: Option<String>,
}

/// Body of `POST /api/create-payment-intent`; `amount` is in major units
#[derive(Debug, Deserialize)]
pub struct CreatePaymentIntentRequest {
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentIntentResponse {
    pub client_secret: String,
    pub payment_intent_id: String,
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmRequest {
    #[serde(default)]
    pub payment_method: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefundRequest {
    /// Major units; omitted for a full refund
    #[serde(default)]
    pub amount: Option<Decimal>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundResponse {
    pub refund_id: String,
    pub status: Option<String>,
    pub amount: String,
}

#[derive(Debug, Deserialize)]
pub struct AttachPaymentMethodRequest {
    pub payment_method_id: String,
}

type ApiResult<T> = Result<T, (StatusCode, Json<LegacyResult>)>;

// ============================================================================
// Pages
// ============================================================================

pub async fn index() -> Response {
    found(NEW_CHECKOUT_PATH)
}

/// Checkout form
pub async fn new_checkout(
    State(state): State<AppState>,
    Query(query): Query<NewCheckoutQuery>,
) -> Response {
    let notice = query
        .notice
        .as_deref()
        .and_then(|code| Notice::from_code(code, query.status.as_deref()));

    let page = NewCheckoutPage {
        publishable_key: &state.config.publishable_key,
        notice: notice.map(|n| n.message()),
        amount: DEFAULT_AMOUNT,
    };
    html(state.views.new_checkout(&page))
}

/// Return URL for Stripe.js redirects
pub async fn complete_checkout(Query(query): Query<CompleteQuery>) -> Response {
    match (query.payment_intent.as_deref(), query.redirect_status.as_deref()) {
        (Some(id), Some(status::SUCCEEDED)) if is_object_id(id) => found(&format!("/checkouts/{id}")),
        (id, redirect_status) => {
            tracing::warn!(payment_intent_id = ?id, redirect_status = ?redirect_status, "Checkout not completed");
            found(&Notice::PaymentIncomplete.location())
        }
    }
}

/// Transaction page
pub async fn show_checkout(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.gateway.retrieve_payment_intent(&id).await {
        Ok(intent) => html(state.views.show(&ShowPage::from_intent(&intent))),
        Err(e) => {
            tracing::error!(payment_intent_id = %id, error = %e, "Failed to load transaction");
            found(&Notice::TransactionUnavailable.location())
        }
    }
}

/// Checkout form submission
pub async fn create_checkout(State(state): State<AppState>, body: Bytes) -> Response {
    let form = parse_checkout_form(&body);

    let Some(id) = form.payment_intent_id.filter(|id| !id.trim().is_empty()) else {
        return found(&Notice::MissingPaymentIntent.location());
    };

    match state.gateway.retrieve_payment_intent(id.trim()).await {
        Ok(intent) => found(&checkout_redirect(&intent)),
        Err(e) => {
            tracing::error!(payment_intent_id = %id, error = %e, "Failed to retrieve payment intent");
            found(&Notice::RetrievalFailed.location())
        }
    }
}

/// Where to send the browser once the payment intent is known
fn checkout_redirect(intent: &PaymentIntent) -> String {
    match intent.status.as_str() {
        status::SUCCEEDED => format!("/checkouts/{}", intent.id),
        status::REQUIRES_ACTION | status::REQUIRES_CONFIRMATION => Notice::RequiresVerification.location(),
        other => Notice::PaymentUnsuccessful {
            status: other.to_string(),
        }
        .location(),
    }
}

// ============================================================================
// API
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        stripe_mode: state.config.mode(),
    })
}

/// Create the payment intent the Stripe.js form confirms
pub async fn create_payment_intent(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<CreatePaymentIntentResponse>, (StatusCode, Json<ErrorResponse>)> {
    let rejected = || (StatusCode::BAD_REQUEST, ErrorResponse::plain(PAYMENT_INTENT_FAILED));

    let request = parse_create_request(&body).map_err(|e| {
        tracing::warn!(error = %e, "Rejected payment intent request");
        rejected()
    })?;

    let intent = state.gateway.create_payment_intent(request).await.map_err(|e| {
        tracing::error!(error = %e, "Payment intent creation failed");
        rejected()
    })?;

    let client_secret = intent.client_secret.ok_or_else(|| {
        tracing::error!(payment_intent_id = %intent.id, "Stripe returned no client secret");
        rejected()
    })?;

    Ok(Json(CreatePaymentIntentResponse {
        client_secret,
        payment_intent_id: intent.id,
    }))
}

fn parse_create_request(body: &[u8]) -> checkout_payments::Result<CreatePaymentIntent> {
    let request: CreatePaymentIntentRequest =
        serde_json::from_slice(body).map_err(|e| PaymentError::InvalidRequest(e.to_string()))?;

    let amount = request
        .amount
        .ok_or_else(|| PaymentError::InvalidRequest("amount is required".into()))?;
    let currency = request
        .currency
        .filter(|c| !c.trim().is_empty())
        .map_or_else(|| DEFAULT_CURRENCY.to_string(), |c| c.trim().to_ascii_lowercase());

    Ok(CreatePaymentIntent::new(to_minor_units(amount)?, currency))
}

/// Stripe webhook handler
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, (StatusCode, Json<ErrorResponse>)> {
    let secret = state.config.webhook_secret.as_deref().ok_or_else(|| {
        tracing::error!("STRIPE_WEBHOOK_SECRET not set - cannot verify webhooks");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::with_code("Webhook secret not configured", "WEBHOOK_NOT_CONFIGURED"),
        )
    })?;

    let invalid = || {
        (
            StatusCode::BAD_REQUEST,
            ErrorResponse::with_code(WEBHOOK_SIGNATURE_FAILED, "INVALID_SIGNATURE"),
        )
    };

    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!("Webhook without stripe-signature header");
            invalid()
        })?;

    let payload = std::str::from_utf8(&body).map_err(|_| {
        tracing::warn!("Webhook payload is not UTF-8");
        invalid()
    })?;

    let event = state.webhooks.verify(payload, signature, secret).map_err(|e| match e {
        PaymentError::WebhookSignature(_) => {
            tracing::warn!(error = %e, "Webhook signature failed");
            invalid()
        }
        other => {
            tracing::error!(error = %other, "Verified webhook payload could not be read");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::with_code("Webhook processing failed", "WEBHOOK_ERROR"),
            )
        }
    })?;

    state.webhooks.dispatch(&event).map_err(|e| {
        tracing::error!(event_id = %event.id, error = %e, "Webhook processing error");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorResponse::with_code("Webhook processing failed", "WEBHOOK_ERROR"),
        )
    })?;

    Ok(Json(WebhookAck { received: true }))
}

/// Payment intent in the legacy transaction shape
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<LegacyResult>> {
    let intent = state
        .gateway
        .retrieve_payment_intent(&id)
        .await
        .map_err(api_error)?;
    Ok(Json(LegacyResult::from_intent(&intent)))
}

pub async fn confirm_payment_intent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<LegacyResult>> {
    let request: ConfirmRequest = parse_json_or_default(&body).map_err(api_error)?;
    let intent = state
        .gateway
        .confirm_payment_intent(&id, request.payment_method.as_deref())
        .await
        .map_err(api_error)?;
    Ok(Json(LegacyResult::from_intent(&intent)))
}

pub async fn refund_transaction(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<RefundResponse>> {
    let request: RefundRequest = parse_json_or_default(&body).map_err(api_error)?;
    let amount = request.amount.map(to_minor_units).transpose().map_err(api_error)?;

    let refund = state
        .gateway
        .create_refund(&id, amount)
        .await
        .map_err(api_error)?;

    Ok(Json(RefundResponse {
        refund_id: refund.id,
        status: refund.status,
        amount: format_minor_units(refund.amount),
    }))
}

pub async fn create_customer(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let request: CreateCustomer = parse_json_or_default(&body).map_err(api_error)?;
    let customer = state.gateway.create_customer(request).await.map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(customer)))
}

pub async fn get_customer(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Customer>> {
    let customer = state.gateway.retrieve_customer(&id).await.map_err(api_error)?;
    Ok(Json(customer))
}

pub async fn list_payment_methods(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
) -> ApiResult<Json<Vec<PaymentMethod>>> {
    let methods = state
        .gateway
        .list_payment_methods(&customer_id)
        .await
        .map_err(api_error)?;
    Ok(Json(methods))
}

pub async fn attach_payment_method(
    State(state): State<AppState>,
    Path(customer_id): Path<String>,
    body: Bytes,
) -> ApiResult<Json<PaymentMethod>> {
    let request: AttachPaymentMethodRequest = serde_json::from_slice(&body)
        .map_err(|e| api_error(PaymentError::InvalidRequest(e.to_string())))?;
    let method = state
        .gateway
        .attach_payment_method(&request.payment_method_id, &customer_id)
        .await
        .map_err(api_error)?;
    Ok(Json(method))
}

// ============================================================================
// Helpers
// ============================================================================

/// `302 Found`
fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

fn html(page: tera::Result<String>) -> Response {
    match page {
        Ok(body) => Html(body).into_response(),
        Err(e) => {
            tracing::error!(error = ?e, "Template rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

fn api_error(err: PaymentError) -> (StatusCode, Json<LegacyResult>) {
    let status = if err.is_client_error() {
        tracing::warn!(error = %err, "Rejected API request");
        StatusCode::BAD_REQUEST
    } else {
        tracing::error!(error = %err, "Stripe request failed");
        StatusCode::BAD_GATEWAY
    };
    (status, Json(LegacyResult::from_error(&err)))
}

/// Form-encoded first (the checkout form), JSON as a fallback
fn parse_checkout_form(body: &[u8]) -> CheckoutForm {
    match serde_urlencoded::from_bytes::<CheckoutForm>(body) {
        Ok(form) if form.payment_intent_id.is_some() => form,
        _ => serde_json::from_slice(body).unwrap_or_default(),
    }
}

fn parse_json_or_default<T: DeserializeOwned + Default>(body: &[u8]) -> checkout_payments::Result<T> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| PaymentError::InvalidRequest(e.to_string()))
}

/// Stripe object IDs are `prefix_` plus alphanumerics
fn is_object_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intent(status: &str) -> PaymentIntent {
        PaymentIntent {
            id: "pi_123".into(),
            amount: 1000,
            currency: "usd".into(),
            status: status.into(),
            client_secret: None,
            created: 0,
            customer: None,
            card: None,
        }
    }

    #[test]
    fn test_checkout_redirect_by_status() {
        assert_eq!(checkout_redirect(&intent("succeeded")), "/checkouts/pi_123");
        assert_eq!(
            checkout_redirect(&intent("requires_action")),
            "/checkouts/new?notice=requires_verification"
        );
        assert_eq!(
            checkout_redirect(&intent("requires_confirmation")),
            "/checkouts/new?notice=requires_verification"
        );
        assert_eq!(
            checkout_redirect(&intent("canceled")),
            "/checkouts/new?notice=payment_unsuccessful&status=canceled"
        );
    }

    #[test]
    fn test_parse_create_request_defaults_currency() {
        let request = parse_create_request(br#"{"amount": 50.00}"#).unwrap();
        assert_eq!(request.amount, 5000);
        assert_eq!(request.currency, "usd");

        let request = parse_create_request(br#"{"amount": "12.5", "currency": "EUR"}"#).unwrap();
        assert_eq!(request.amount, 1250);
        assert_eq!(request.currency, "eur");
    }

    #[test]
    fn test_parse_create_request_rejects_bad_amounts() {
        assert!(parse_create_request(b"{}").is_err());
        assert!(parse_create_request(br#"{"amount": 0}"#).is_err());
        assert!(parse_create_request(br#"{"amount": "ten"}"#).is_err());
        assert!(parse_create_request(b"not json").is_err());
    }

    #[test]
    fn test_parse_checkout_form() {
        let form = parse_checkout_form(b"payment_intent_id=pi_1&amount=10");
        assert_eq!(form.payment_intent_id.as_deref(), Some("pi_1"));

        let form = parse_checkout_form(br#"{"payment_intent_id": "pi_2"}"#);
        assert_eq!(form.payment_intent_id.as_deref(), Some("pi_2"));

        assert!(parse_checkout_form(b"").payment_intent_id.is_none());
    }

    #[test]
    fn test_parse_json_or_default() {
        let refund: RefundRequest = parse_json_or_default(b"").unwrap();
        assert!(refund.amount.is_none());
        let refund: RefundRequest = parse_json_or_default(br#"{"amount": "2.50"}"#).unwrap();
        assert_eq!(refund.amount, Some(Decimal::new(250, 2)));
        assert!(parse_json_or_default::<RefundRequest>(b"[").is_err());
    }

    #[test]
    fn test_is_object_id() {
        assert!(is_object_id("pi_3Mtw"));
        assert!(!is_object_id("../admin"));
        assert!(!is_object_id("pi_1?x=y"));
        assert!(!is_object_id(""));
    }
}

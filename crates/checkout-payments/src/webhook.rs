//! Stripe Webhook Handling
//!
//! Two stages: the signature is verified through the gateway, then the event
//! is classified and logged. Handlers only log, so a replayed event simply
//! logs again.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{PaymentError, Result};
use crate::gateway::PaymentGateway;

/// Event that passed signature verification
#[derive(Clone, Debug, PartialEq)]
pub struct VerifiedEvent {
    /// Stripe event ID (`evt_...`)
    pub id: String,

    /// Event type, e.g. `payment_intent.succeeded`
    pub event_type: String,

    /// `data.object` payload
    pub object: Value,
}

impl VerifiedEvent {
    /// Read `id`, `type` and `data.object` from a payload whose signature has
    /// already been checked.
    ///
    /// Works on the raw JSON, so event and object types Stripe adds later keep
    /// their real names and still reach the unhandled branch.
    pub fn from_payload(payload: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct RawEvent {
            id: String,
            #[serde(rename = "type")]
            event_type: String,
            #[serde(default)]
            data: RawData,
        }

        #[derive(Default, Deserialize)]
        struct RawData {
            #[serde(default)]
            object: Value,
        }

        let raw: RawEvent =
            serde_json::from_str(payload).map_err(|e| PaymentError::WebhookParse(e.to_string()))?;

        Ok(Self {
            id: raw.id,
            event_type: raw.event_type,
            object: raw.data.object,
        })
    }
}

/// Parsed webhook event
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    PaymentIntentSucceeded {
        payment_intent_id: String,
        amount: i64,
        currency: String,
    },

    PaymentIntentFailed {
        payment_intent_id: String,
        failure_message: Option<String>,
    },

    PaymentMethodAttached {
        payment_method_id: String,
        customer_id: Option<String>,
    },

    CustomerCreated {
        customer_id: String,
        email: Option<String>,
    },

    ChargeRefunded {
        charge_id: String,
        amount_refunded: i64,
    },

    /// Unhandled event type (still acknowledged)
    Unhandled { event_type: String },
}

impl WebhookEvent {
    /// Classify a verified event by its type
    pub fn from_verified(event: &VerifiedEvent) -> Result<Self> {
        let object = &event.object;

        let parsed = match event.event_type.as_str() {
            "payment_intent.succeeded" => Self::PaymentIntentSucceeded {
                payment_intent_id: object_id(event)?,
                amount: int_field(object, "amount"),
                currency: str_field(object, "currency").unwrap_or_default(),
            },
            "payment_intent.payment_failed" => Self::PaymentIntentFailed {
                payment_intent_id: object_id(event)?,
                failure_message: object
                    .get("last_payment_error")
                    .and_then(|e| e.get("message"))
                    .and_then(Value::as_str)
                    .map(str::to_string),
            },
            "payment_method.attached" => Self::PaymentMethodAttached {
                payment_method_id: object_id(event)?,
                customer_id: expandable_id(object, "customer"),
            },
            "customer.created" => Self::CustomerCreated {
                customer_id: object_id(event)?,
                email: str_field(object, "email"),
            },
            "charge.refunded" => Self::ChargeRefunded {
                charge_id: object_id(event)?,
                amount_refunded: int_field(object, "amount_refunded"),
            },
            other => Self::Unhandled {
                event_type: other.to_string(),
            },
        };

        Ok(parsed)
    }
}

/// Webhook dispatcher
pub struct WebhookDispatcher {
    gateway: Arc<dyn PaymentGateway>,
}

impl WebhookDispatcher {
    pub fn new(gateway: Arc<dyn PaymentGateway>) -> Self {
        Self { gateway }
    }

    /// Verify webhook signature and parse event
    pub fn verify(&self, payload: &str, signature: &str, secret: &str) -> Result<VerifiedEvent> {
        self.gateway.construct_event(payload, signature, secret)
    }

    /// Process a verified event
    pub fn dispatch(&self, event: &VerifiedEvent) -> Result<WebhookEvent> {
        tracing::info!(event_id = %event.id, event_type = %event.event_type, "Processing Stripe webhook");

        let parsed = WebhookEvent::from_verified(event)?;

        match &parsed {
            WebhookEvent::PaymentIntentSucceeded {
                payment_intent_id,
                amount,
                currency,
            } => {
                tracing::info!(
                    payment_intent_id = %payment_intent_id,
                    amount,
                    currency = %currency,
                    "PaymentIntent succeeded"
                );
            }

            WebhookEvent::PaymentIntentFailed {
                payment_intent_id,
                failure_message,
            } => {
                tracing::warn!(
                    payment_intent_id = %payment_intent_id,
                    reason = ?failure_message,
                    "PaymentIntent failed"
                );
            }

            WebhookEvent::PaymentMethodAttached {
                payment_method_id,
                customer_id,
            } => {
                tracing::info!(
                    payment_method_id = %payment_method_id,
                    customer_id = ?customer_id,
                    "PaymentMethod attached"
                );
            }

            WebhookEvent::CustomerCreated { customer_id, email } => {
                tracing::info!(customer_id = %customer_id, email = ?email, "Customer created");
            }

            WebhookEvent::ChargeRefunded {
                charge_id,
                amount_refunded,
            } => {
                tracing::info!(charge_id = %charge_id, amount_refunded, "Charge refunded");
            }

            WebhookEvent::Unhandled { event_type } => {
                tracing::debug!(event_type = %event_type, "Unhandled webhook event");
            }
        }

        Ok(parsed)
    }
}

fn object_id(event: &VerifiedEvent) -> Result<String> {
    str_field(&event.object, "id").ok_or_else(|| {
        PaymentError::WebhookParse(format!("{} event {} has no object id", event.event_type, event.id))
    })
}

fn str_field(object: &Value, key: &str) -> Option<String> {
    object.get(key).and_then(Value::as_str).map(str::to_string)
}

fn int_field(object: &Value, key: &str) -> i64 {
    object.get(key).and_then(Value::as_i64).unwrap_or_default()
}

/// A field that is either an ID string or an expanded object with an `id`
fn expandable_id(object: &Value, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(id) => Some(id.clone()),
        Value::Object(expanded) => expanded.get("id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(event_type: &str, object: Value) -> VerifiedEvent {
        VerifiedEvent {
            id: "evt_1".into(),
            event_type: event_type.into(),
            object,
        }
    }

    #[test]
    fn test_from_payload_keeps_raw_type_and_object() {
        let payload = json!({
            "id": "evt_9",
            "object": "event",
            "type": "billing.meter.created",
            "data": { "object": { "id": "mtr_1", "object": "billing.meter" } },
        })
        .to_string();

        let event = VerifiedEvent::from_payload(&payload).unwrap();
        assert_eq!(event.id, "evt_9");
        assert_eq!(event.event_type, "billing.meter.created");
        assert_eq!(event.object["object"], "billing.meter");
    }

    #[test]
    fn test_from_payload_requires_id_and_type() {
        let err = VerifiedEvent::from_payload(r#"{"type": "customer.created"}"#).unwrap_err();
        assert!(matches!(err, PaymentError::WebhookParse(_)));
        assert!(VerifiedEvent::from_payload("not json").is_err());
    }

    #[test]
    fn test_known_event_types() {
        let succeeded = WebhookEvent::from_verified(&event(
            "payment_intent.succeeded",
            json!({"id": "pi_1", "object": "payment_intent", "amount": 2500, "currency": "usd"}),
        ))
        .unwrap();
        assert_eq!(
            succeeded,
            WebhookEvent::PaymentIntentSucceeded {
                payment_intent_id: "pi_1".into(),
                amount: 2500,
                currency: "usd".into(),
            }
        );

        let failed = WebhookEvent::from_verified(&event(
            "payment_intent.payment_failed",
            json!({"id": "pi_2", "last_payment_error": {"message": "Your card was declined."}}),
        ))
        .unwrap();
        assert_eq!(
            failed,
            WebhookEvent::PaymentIntentFailed {
                payment_intent_id: "pi_2".into(),
                failure_message: Some("Your card was declined.".into()),
            }
        );

        let attached = WebhookEvent::from_verified(&event(
            "payment_method.attached",
            json!({"id": "pm_1", "customer": {"id": "cus_1", "object": "customer"}}),
        ))
        .unwrap();
        assert_eq!(
            attached,
            WebhookEvent::PaymentMethodAttached {
                payment_method_id: "pm_1".into(),
                customer_id: Some("cus_1".into()),
            }
        );

        let created = WebhookEvent::from_verified(&event("customer.created", json!({"id": "cus_9"}))).unwrap();
        assert_eq!(
            created,
            WebhookEvent::CustomerCreated {
                customer_id: "cus_9".into(),
                email: None,
            }
        );

        let refunded = WebhookEvent::from_verified(&event(
            "charge.refunded",
            json!({"id": "ch_1", "amount_refunded": 1000}),
        ))
        .unwrap();
        assert_eq!(
            refunded,
            WebhookEvent::ChargeRefunded {
                charge_id: "ch_1".into(),
                amount_refunded: 1000,
            }
        );
    }

    #[test]
    fn test_unknown_event_type_is_unhandled() {
        let parsed = WebhookEvent::from_verified(&event("invoice.paid", json!({}))).unwrap();
        assert_eq!(
            parsed,
            WebhookEvent::Unhandled {
                event_type: "invoice.paid".into()
            }
        );
    }

    #[test]
    fn test_known_event_without_object_id_fails() {
        let err = WebhookEvent::from_verified(&event("customer.created", json!({"email": "a@b.c"}))).unwrap_err();
        assert!(matches!(err, PaymentError::WebhookParse(_)));
    }
}

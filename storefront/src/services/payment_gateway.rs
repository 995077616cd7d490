// storefront/src/services/payment_gateway.rs

//! Hosted payment gateway boundary.
//!
//! The gateway creates an intent for an amount, the shopper pays on the
//! gateway's page, and the gateway hands back a payment handle plus a
//! signature over `intent|payment` made with the shared secret.
//!
//! An intent belongs to the shopper who opened it. It stays confirmable until
//! it has paid for an order or its time to live runs out.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use parking_lot::Mutex;
use serde::Serialize;
use sha2::Sha256;
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntent {
  pub handle: String,
  #[serde(skip)]
  pub user_id: Uuid,
  pub amount_cents: i64,
  pub currency: String,
  pub receipt: String,
  /// Public key id the client needs to open the gateway checkout.
  pub key_id: String,
  pub expires_at: DateTime<Utc>,
}

impl PaymentIntent {
  pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
    now >= self.expires_at
  }
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
  async fn create_payment_intent(&self, user_id: Uuid, amount_cents: i64) -> Result<PaymentIntent>;

  /// Open intents only. Expired and consumed intents are not returned.
  async fn find_intent(&self, handle: &str) -> Result<Option<PaymentIntent>>;

  /// Retires an intent once the order it paid for has been committed.
  async fn consume_intent(&self, handle: &str) -> Result<()>;

  fn verify_confirmation(&self, intent_handle: &str, payment_handle: &str, signature: &str) -> bool;
}

pub const DEFAULT_INTENT_TTL_MINUTES: i64 = 30;

pub struct HmacPaymentGateway {
  key_id: String,
  secret: String,
  currency: String,
  intent_ttl: Duration,
  intents: Mutex<HashMap<String, PaymentIntent>>,
}

impl HmacPaymentGateway {
  pub fn new(key_id: impl Into<String>, secret: impl Into<String>, currency: impl Into<String>) -> Self {
    Self {
      key_id: key_id.into(),
      secret: secret.into(),
      currency: currency.into(),
      intent_ttl: Duration::minutes(DEFAULT_INTENT_TTL_MINUTES),
      intents: Mutex::new(HashMap::new()),
    }
  }

  pub fn with_intent_ttl(mut self, ttl: Duration) -> Self {
    self.intent_ttl = ttl;
    self
  }

  /// Number of intents still held, expired ones included until the next purge.
  pub fn held_intents(&self) -> usize {
    self.intents.lock().len()
  }

  fn mac(&self, intent_handle: &str, payment_handle: &str) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
      .map_err(|e| AppError::Gateway(format!("HMAC key error: {}", e)))?;
    mac.update(intent_handle.as_bytes());
    mac.update(b"|");
    mac.update(payment_handle.as_bytes());
    Ok(mac)
  }

  /// Lowercase hex signature the gateway attaches to a confirmation.
  pub fn sign(&self, intent_handle: &str, payment_handle: &str) -> Result<String> {
    Ok(hex::encode(self.mac(intent_handle, payment_handle)?.finalize().into_bytes()))
  }
}

#[async_trait]
impl PaymentGateway for HmacPaymentGateway {
  #[instrument(name = "gateway::create_payment_intent", skip(self))]
  async fn create_payment_intent(&self, user_id: Uuid, amount_cents: i64) -> Result<PaymentIntent> {
    if amount_cents <= 0 {
      return Err(AppError::Validation("Payment amount must be greater than zero".to_string()));
    }
    let now = Utc::now();
    let intent = PaymentIntent {
      handle: format!("order_{}", Uuid::new_v4().simple()),
      user_id,
      amount_cents,
      currency: self.currency.clone(),
      receipt: format!("receipt_{}", Uuid::new_v4().simple()),
      key_id: self.key_id.clone(),
      expires_at: now + self.intent_ttl,
    };

    let mut intents = self.intents.lock();
    let before = intents.len();
    intents.retain(|_, held| !held.is_expired_at(now));
    if intents.len() < before {
      debug!(purged = before - intents.len(), "Expired payment intents purged.");
    }
    intents.insert(intent.handle.clone(), intent.clone());
    drop(intents);

    info!(intent_handle = %intent.handle, %user_id, "Payment intent created.");
    Ok(intent)
  }

  async fn find_intent(&self, handle: &str) -> Result<Option<PaymentIntent>> {
    let now = Utc::now();
    Ok(
      self
        .intents
        .lock()
        .get(handle)
        .filter(|intent| !intent.is_expired_at(now))
        .cloned(),
    )
  }

  async fn consume_intent(&self, handle: &str) -> Result<()> {
    if self.intents.lock().remove(handle).is_some() {
      debug!(intent_handle = handle, "Payment intent consumed.");
    }
    Ok(())
  }

  fn verify_confirmation(&self, intent_handle: &str, payment_handle: &str, signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else {
      warn!(intent_handle, "Payment signature is not valid hex.");
      return false;
    };
    match self.mac(intent_handle, payment_handle) {
      // Constant-time comparison.
      Ok(mac) => mac.verify_slice(&expected).is_ok(),
      Err(_) => false,
    }
  }
}

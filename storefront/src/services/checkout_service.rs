// storefront/src/services/checkout_service.rs

//! Order placement.
//!
//! Cash-on-delivery orders are placed in one step. Gateway orders take two:
//! `begin_gateway_checkout` prices the cart and opens a payment intent
//! without touching stock, and `confirm_gateway_payment` verifies the
//! gateway's signature before running the same checkout that COD uses.

use pipeline::{ContextData, PipelineResultExt};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{Order, OrderCharges, PaymentMethod};
use crate::pipelines::contexts::CheckoutCtxData;
use crate::services::payment_gateway::PaymentIntent;
use crate::state::AppState;
use crate::store::Storefront;

/// A gateway payment whose confirmation signature has been checked.
///
/// Only this module can build one, so the checkout pipeline never sees an
/// unverified payment.
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
  intent: PaymentIntent,
  payment_handle: String,
}

impl VerifiedPayment {
  pub fn intent_handle(&self) -> &str {
    &self.intent.handle
  }

  pub fn payment_handle(&self) -> &str {
    &self.payment_handle
  }

  /// Amount the shopper was asked to pay when the intent was created.
  pub fn amount_cents(&self) -> i64 {
    self.intent.amount_cents
  }
}

#[derive(Debug, Clone)]
pub enum CheckoutPayment {
  Cod,
  Gateway(VerifiedPayment),
}

#[derive(Debug, Clone)]
pub struct PlaceOrder {
  pub user_id: Uuid,
  pub delivery_address_id: Uuid,
  pub payment: CheckoutPayment,
}

/// Result of the first gateway phase: what the shopper is about to pay.
#[derive(Debug, Clone)]
pub struct GatewayCheckout {
  pub intent: PaymentIntent,
  pub charges: OrderCharges,
}

pub struct CheckoutService<S: Storefront> {
  app_state: AppState<S>,
}

impl<S: Storefront> CheckoutService<S> {
  pub fn new(app_state: AppState<S>) -> Self {
    Self { app_state }
  }

  #[instrument(
    name = "checkout_service::place_order",
    skip(self, request),
    fields(user_id = %request.user_id, address_id = %request.delivery_address_id),
    err(Display)
  )]
  pub async fn place_order(&self, request: PlaceOrder) -> Result<Order> {
    let (payment_method, confirmed) = match request.payment {
      CheckoutPayment::Cod => (PaymentMethod::Cod, None),
      CheckoutPayment::Gateway(verified) => (PaymentMethod::Gateway, Some(verified)),
    };
    let ctx = ContextData::new(CheckoutCtxData::new(
      self.app_state.clone(),
      request.user_id,
      request.delivery_address_id,
      payment_method,
      confirmed,
    ));

    self
      .app_state
      .pipelines
      .checkout
      .run_atomic(&*self.app_state.store, ctx.clone(), self.app_state.config.transaction_timeout)
      .await
      .completed_or(|| AppError::Internal("Checkout pipeline stopped unexpectedly".to_string()))?;

    let order = ctx
      .read()
      .order
      .clone()
      .ok_or_else(|| AppError::Internal("Checkout completed without an order".to_string()))?;
    info!(order_id = %order.id, total_cents = order.total_amount_cents, "Order placed.");
    Ok(order)
  }

  /// Prices the cart and opens a gateway intent for the total.
  #[instrument(
    name = "checkout_service::begin_gateway_checkout",
    skip(self),
    fields(user_id = %user_id, address_id = %delivery_address_id),
    err(Display)
  )]
  pub async fn begin_gateway_checkout(&self, user_id: Uuid, delivery_address_id: Uuid) -> Result<GatewayCheckout> {
    let ctx = ContextData::new(CheckoutCtxData::new(
      self.app_state.clone(),
      user_id,
      delivery_address_id,
      PaymentMethod::Gateway,
      None,
    ));

    self
      .app_state
      .pipelines
      .checkout_quote
      .run_atomic(&*self.app_state.store, ctx.clone(), self.app_state.config.transaction_timeout)
      .await
      .completed_or(|| AppError::Internal("Quote pipeline stopped unexpectedly".to_string()))?;

    let charges = ctx
      .read()
      .charges
      .ok_or_else(|| AppError::Internal("Quote completed without charges".to_string()))?;
    let intent = self
      .app_state
      .gateway
      .create_payment_intent(user_id, charges.total_cents)
      .await?;
    info!(intent_handle = %intent.handle, amount_cents = intent.amount_cents, "Gateway checkout started.");
    Ok(GatewayCheckout { intent, charges })
  }

  #[instrument(
    name = "checkout_service::confirm_gateway_payment",
    skip(self, signature),
    fields(user_id = %user_id, address_id = %delivery_address_id),
    err(Display)
  )]
  pub async fn confirm_gateway_payment(
    &self,
    user_id: Uuid,
    delivery_address_id: Uuid,
    intent_handle: &str,
    payment_handle: &str,
    signature: &str,
  ) -> Result<Order> {
    let intent_handle = intent_handle.trim();
    let payment_handle = payment_handle.trim();
    if intent_handle.is_empty() || payment_handle.is_empty() {
      return Err(AppError::Validation(
        "Both the intent handle and the payment handle are required".to_string(),
      ));
    }

    if !self
      .app_state
      .gateway
      .verify_confirmation(intent_handle, payment_handle, signature)
    {
      warn!(intent_handle, payment_handle, "Payment confirmation signature rejected.");
      return Err(AppError::PaymentSignatureInvalid);
    }

    let intent = self
      .app_state
      .gateway
      .find_intent(intent_handle)
      .await?
      .ok_or_else(|| AppError::Validation(format!("Unknown payment intent '{}'", intent_handle)))?;
    if intent.user_id != user_id {
      warn!(intent_handle, %user_id, owner = %intent.user_id, "Payment intent confirmed by another user.");
      return Err(AppError::Forbidden("Payment intent belongs to another user".to_string()));
    }

    let verified = VerifiedPayment {
      intent,
      payment_handle: payment_handle.to_string(),
    };
    let order = self
      .place_order(PlaceOrder {
        user_id,
        delivery_address_id,
        payment: CheckoutPayment::Gateway(verified),
      })
      .await?;

    // The order is already committed.
    if let Err(e) = self.app_state.gateway.consume_intent(intent_handle).await {
      warn!(intent_handle, error = %e, "Could not retire paid payment intent.");
    }
    Ok(order)
  }
}

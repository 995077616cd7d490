// storefront/src/pipelines/checkout_pipeline.rs

//! Cart to order conversion.
//!
//! Every business rule (empty cart, address, stock, payment match) is checked
//! before the first write. The writes then run in the same transaction, so a
//! failure in any of them rolls back the others.

use chrono::Utc;
use pipeline::{ContextData, Pipeline, PipelineControl, TxSlot};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::order::{PAYMENT_STATUS_PAID, PAYMENT_STATUS_PENDING_COD};
use crate::models::{Order, OrderItem, OrderStatus, ShippingAddress};
use crate::pipelines::contexts::CheckoutCtxData;
use crate::store::Storefront;

type Ctx<S> = ContextData<CheckoutCtxData<S>>;

/// Steps that only read. The quote pipeline is exactly this prefix.
const QUOTE_STEPS: [&str; 6] = [
  "load_cart_for_checkout",
  "ensure_cart_not_empty",
  "resolve_delivery_address",
  "verify_stock_levels",
  "snapshot_order_items",
  "compute_order_total",
];

pub fn build_checkout_pipeline<S: Storefront>() -> Pipeline<CheckoutCtxData<S>, AppError> {
  let mut p = Pipeline::<CheckoutCtxData<S>, AppError>::new(&[
    ("load_cart_for_checkout", false, None),
    ("ensure_cart_not_empty", false, None),
    ("resolve_delivery_address", false, None),
    ("verify_stock_levels", false, None),
    ("snapshot_order_items", false, None),
    ("compute_order_total", false, None),
    (
      "match_confirmed_payment",
      false,
      Some(Arc::new(|ctx: Ctx<S>| ctx.read().confirmed_payment.is_none())),
    ),
    ("reserve_stock", false, None),
    ("persist_order", false, None),
    ("clear_cart", false, None),
  ]);

  p.on_root("load_cart_for_checkout", load_cart_for_checkout::<S>);
  p.on_root("ensure_cart_not_empty", ensure_cart_not_empty::<S>);
  p.on_root("resolve_delivery_address", resolve_delivery_address::<S>);
  p.on_root("verify_stock_levels", verify_stock_levels::<S>);
  p.on_root("snapshot_order_items", snapshot_order_items::<S>);
  p.on_root("compute_order_total", compute_order_total::<S>);
  p.on_root("match_confirmed_payment", match_confirmed_payment::<S>);
  p.on_root("reserve_stock", reserve_stock::<S>);
  p.on_root("persist_order", persist_order::<S>);
  p.on_root("clear_cart", clear_cart::<S>);
  p
}

/// Read-only prefix of checkout: everything needed to price the cart, nothing
/// that writes. Used before sending the shopper to the payment gateway.
pub fn build_checkout_quote_pipeline<S: Storefront>() -> Pipeline<CheckoutCtxData<S>, AppError> {
  let mut p = build_checkout_pipeline::<S>();
  let write_steps: Vec<String> = p
    .step_names()
    .into_iter()
    .filter(|name| !QUOTE_STEPS.contains(name))
    .map(str::to_string)
    .collect();
  for step in write_steps {
    p.remove_step(&step);
  }
  p
}

fn handles<S: Storefront>(ctx: &Ctx<S>) -> (Arc<S>, TxSlot<S::Tx>, Uuid) {
  let guard = ctx.read();
  (guard.app_state.store.clone(), guard.tx.clone(), guard.user_id)
}

async fn load_cart_for_checkout<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let (store, slot, user_id) = handles(&ctx);
  let mut tx = slot.lock().await?;

  let cart_lines = store.cart_lines(&mut *tx, user_id).await?;
  let product_ids: Vec<Uuid> = cart_lines.iter().map(|l| l.product_id).collect();
  let products = if product_ids.is_empty() {
    Vec::new()
  } else {
    store.products_for_checkout(&mut *tx, &product_ids).await?
  };
  info!(
    "Checkout Pipeline (User {}): Loaded cart with {} line(s).",
    user_id,
    cart_lines.len()
  );

  let mut guard = ctx.write();
  guard.cart_lines = cart_lines;
  guard.products = products;
  Ok(PipelineControl::Continue)
}

async fn ensure_cart_not_empty<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let guard = ctx.read();
  if guard.cart_lines.is_empty() {
    warn!("Checkout Pipeline (User {}): Cart is empty.", guard.user_id);
    return Err(AppError::EmptyCart);
  }
  Ok(PipelineControl::Continue)
}

async fn resolve_delivery_address<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let (store, slot, user_id) = handles(&ctx);
  let address_id = ctx.read().delivery_address_id;
  let mut tx = slot.lock().await?;

  let address = store
    .find_address(&mut *tx, user_id, address_id)
    .await?
    .ok_or(AppError::AddressNotFound(address_id))?;

  ctx.write().shipping_address = Some(ShippingAddress::from(&address));
  Ok(PipelineControl::Continue)
}

async fn verify_stock_levels<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let guard = ctx.read();
  for line in &guard.cart_lines {
    let product = guard
      .products
      .iter()
      .find(|p| p.id == line.product_id)
      .ok_or(AppError::ProductNotFound(line.product_id))?;
    if product.available_quantity < line.quantity {
      warn!(
        "Checkout Pipeline (User {}): Insufficient stock for {}. Available: {}, Requested: {}.",
        guard.user_id, product.name, product.available_quantity, line.quantity
      );
      return Err(AppError::InsufficientStock {
        product_name: product.name.clone(),
      });
    }
  }
  Ok(PipelineControl::Continue)
}

async fn snapshot_order_items<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let mut guard = ctx.write();
  let mut items = Vec::with_capacity(guard.cart_lines.len());
  for line in &guard.cart_lines {
    let product = guard
      .products
      .iter()
      .find(|p| p.id == line.product_id)
      .ok_or(AppError::ProductNotFound(line.product_id))?;
    items.push(OrderItem {
      product_id: product.id,
      name: product.name.clone(),
      quantity: line.quantity,
      unit_price_cents: product.price_cents,
      image: product.image.clone(),
    });
  }
  guard.order_items = items;
  Ok(PipelineControl::Continue)
}

async fn compute_order_total<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let mut guard = ctx.write();
  let charges = guard.app_state.pricing().quote(&guard.order_items, guard.payment_method);
  info!(
    "Checkout Pipeline (User {}): {} total {} (subtotal {}, fee {}, tax {}).",
    guard.user_id,
    guard.payment_method,
    charges.total_cents,
    charges.subtotal_cents,
    charges.cod_fee_cents,
    charges.tax_cents
  );
  guard.charges = Some(charges);
  Ok(PipelineControl::Continue)
}

async fn match_confirmed_payment<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let (store, slot, _) = handles(&ctx);
  let (payment, total_cents) = {
    let guard = ctx.read();
    let payment = guard
      .confirmed_payment
      .clone()
      .ok_or_else(|| AppError::Internal("confirmed payment missing".to_string()))?;
    let total = guard
      .charges
      .map(|c| c.total_cents)
      .ok_or_else(|| AppError::Internal("charges not computed".to_string()))?;
    (payment, total)
  };

  let mut tx = slot.lock().await?;
  if store
    .order_by_transaction_ref(&mut *tx, payment.payment_handle())
    .await?
    .is_some()
  {
    warn!(payment_handle = payment.payment_handle(), "Payment already used for an order.");
    return Err(AppError::DuplicatePayment(payment.payment_handle().to_string()));
  }

  if payment.amount_cents() != total_cents {
    warn!(
      intent_amount = payment.amount_cents(),
      total_cents, "Cart total changed since the payment intent was created."
    );
    return Err(AppError::PaymentAmountMismatch {
      expected_cents: payment.amount_cents(),
      actual_cents: total_cents,
    });
  }
  Ok(PipelineControl::Continue)
}

async fn reserve_stock<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let (store, slot, user_id) = handles(&ctx);
  let items = ctx.read().order_items.clone();
  let mut tx = slot.lock().await?;

  for item in &items {
    // Re-checked by the store itself; the earlier read is not trusted.
    if !store.try_decrement_stock(&mut *tx, item.product_id, item.quantity).await? {
      warn!(
        "Checkout Pipeline (User {}): Conditional decrement refused for {}.",
        user_id, item.name
      );
      return Err(AppError::InsufficientStock {
        product_name: item.name.clone(),
      });
    }
  }
  info!("Checkout Pipeline (User {}): Reserved stock for {} item(s).", user_id, items.len());
  Ok(PipelineControl::Continue)
}

async fn persist_order<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let (store, slot, user_id) = handles(&ctx);
  let order = {
    let guard = ctx.read();
    let shipping_address = guard
      .shipping_address
      .clone()
      .ok_or_else(|| AppError::Internal("shipping address not resolved".to_string()))?;
    let charges = guard
      .charges
      .ok_or_else(|| AppError::Internal("charges not computed".to_string()))?;
    let now = Utc::now();
    Order {
      id: Uuid::new_v4(),
      user_id,
      order_items: guard.order_items.clone(),
      shipping_address,
      charges,
      total_amount_cents: charges.total_cents,
      currency: guard.app_state.config.currency.clone(),
      payment_method: guard.payment_method,
      payment_status: match &guard.confirmed_payment {
        Some(_) => PAYMENT_STATUS_PAID.to_string(),
        None => PAYMENT_STATUS_PENDING_COD.to_string(),
      },
      transaction_ref: guard.confirmed_payment.as_ref().map(|p| p.payment_handle().to_string()),
      status: OrderStatus::Processing,
      return_reason: None,
      created_at: now,
      updated_at: now,
    }
  };

  let mut tx = slot.lock().await?;
  store.insert_order(&mut *tx, &order).await?;
  info!("Checkout Pipeline (User {}): Order {} recorded.", user_id, order.id);
  drop(tx);

  ctx.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

async fn clear_cart<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let (store, slot, user_id) = handles(&ctx);
  let mut tx = slot.lock().await?;
  store.clear_cart(&mut *tx, user_id).await?;
  Ok(PipelineControl::Continue)
}

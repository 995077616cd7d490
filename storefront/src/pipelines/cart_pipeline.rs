// storefront/src/pipelines/cart_pipeline.rs

//! Cart reads and edits. One pipeline serves every `CartOp`; steps that do
//! not apply to the operation are skipped.

use pipeline::{ContextData, Pipeline, PipelineControl, TxSlot};
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{CartLine, CartView};
use crate::pipelines::contexts::{CartCtxData, CartOp};
use crate::store::Storefront;

type Ctx<S> = ContextData<CartCtxData<S>>;

fn is_view<S: Storefront>(ctx: &Ctx<S>) -> bool {
  ctx.read().op == CartOp::View
}

/// Removal and viewing never need the product or its stock.
fn needs_product<S: Storefront>(ctx: &Ctx<S>) -> bool {
  let guard = ctx.read();
  guard.op != CartOp::View && guard.target_quantity.unwrap_or(0) > 0
}

pub fn build_cart_pipeline<S: Storefront>() -> Pipeline<CartCtxData<S>, AppError> {
  let mut p = Pipeline::<CartCtxData<S>, AppError>::new(&[
    ("validate_cart_input", false, None),
    ("load_cart_lines", false, None),
    ("resolve_line_quantity", false, Some(Arc::new(|ctx: Ctx<S>| is_view(&ctx)))),
    (
      "fetch_product_for_cart",
      false,
      Some(Arc::new(|ctx: Ctx<S>| !needs_product(&ctx))),
    ),
    (
      "check_product_stock_for_cart",
      false,
      Some(Arc::new(|ctx: Ctx<S>| !needs_product(&ctx))),
    ),
    ("apply_cart_mutation", false, Some(Arc::new(|ctx: Ctx<S>| is_view(&ctx)))),
    ("reload_cart", false, None),
  ]);

  p.on_root("validate_cart_input", validate_cart_input::<S>);
  p.on_root("load_cart_lines", load_cart_lines::<S>);
  p.on_root("resolve_line_quantity", resolve_line_quantity::<S>);
  p.on_root("fetch_product_for_cart", fetch_product_for_cart::<S>);
  p.on_root("check_product_stock_for_cart", check_product_stock_for_cart::<S>);
  p.on_root("apply_cart_mutation", apply_cart_mutation::<S>);
  p.on_root("reload_cart", reload_cart::<S>);
  p
}

fn handles<S: Storefront>(ctx: &Ctx<S>) -> (Arc<S>, TxSlot<S::Tx>, Uuid) {
  let guard = ctx.read();
  (guard.app_state.store.clone(), guard.tx.clone(), guard.user_id)
}

async fn validate_cart_input<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let op = ctx.read().op;
  match op {
    CartOp::Add { quantity, .. } if quantity < 1 => {
      warn!("Cart Pipeline: Invalid quantity ({}) to add.", quantity);
      Err(AppError::Validation("Quantity must be at least 1".to_string()))
    }
    CartOp::Set { quantity, .. } if quantity < 0 => {
      warn!("Cart Pipeline: Invalid quantity ({}) to set.", quantity);
      Err(AppError::Validation("Quantity must not be negative".to_string()))
    }
    _ => Ok(PipelineControl::Continue),
  }
}

async fn load_cart_lines<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let (store, slot, user_id) = handles(&ctx);
  let mut tx = slot.lock().await?;
  let lines = store.cart_lines(&mut *tx, user_id).await?;
  drop(tx);

  ctx.write().lines = lines;
  Ok(PipelineControl::Continue)
}

async fn resolve_line_quantity<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let mut guard = ctx.write();
  let existing = |product_id: Uuid| guard.lines.iter().find(|l| l.product_id == product_id).map(|l| l.quantity);

  let target = match guard.op {
    CartOp::View => return Ok(PipelineControl::Continue),
    CartOp::Add { product_id, quantity } => existing(product_id)
      .unwrap_or(0)
      .checked_add(quantity)
      .ok_or_else(|| AppError::Validation("Cart quantity is too large".to_string()))?,
    CartOp::Set { product_id, quantity } => {
      existing(product_id).ok_or(AppError::CartItemNotFound(product_id))?;
      quantity
    }
    CartOp::Remove { product_id } => {
      existing(product_id).ok_or(AppError::CartItemNotFound(product_id))?;
      0
    }
  };
  guard.target_quantity = Some(target);
  Ok(PipelineControl::Continue)
}

async fn fetch_product_for_cart<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let (store, slot, _) = handles(&ctx);
  let product_id = ctx
    .read()
    .op
    .product_id()
    .ok_or_else(|| AppError::Internal("cart operation has no product".to_string()))?;
  let mut tx = slot.lock().await?;

  let product = store
    .products_for_checkout(&mut *tx, &[product_id])
    .await?
    .into_iter()
    .next()
    .ok_or(AppError::ProductNotFound(product_id))?;
  drop(tx);

  ctx.write().product = Some(product);
  Ok(PipelineControl::Continue)
}

async fn check_product_stock_for_cart<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let guard = ctx.read();
  let requested = guard.target_quantity.unwrap_or(0);
  let product = guard
    .product
    .as_ref()
    .ok_or_else(|| AppError::Internal("product not loaded".to_string()))?;

  if product.available_quantity < requested {
    warn!(
      "Cart Pipeline: Insufficient stock for product {}. Available: {}, Requested: {}.",
      product.id, product.available_quantity, requested
    );
    return Err(AppError::InsufficientStock {
      product_name: product.name.clone(),
    });
  }
  Ok(PipelineControl::Continue)
}

async fn apply_cart_mutation<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let (store, slot, user_id) = handles(&ctx);
  let (product_id, quantity) = {
    let guard = ctx.read();
    let product_id = guard
      .op
      .product_id()
      .ok_or_else(|| AppError::Internal("cart operation has no product".to_string()))?;
    (product_id, guard.target_quantity.unwrap_or(0))
  };
  let mut tx = slot.lock().await?;

  if quantity == 0 {
    store.remove_cart_line(&mut *tx, user_id, product_id).await?;
    info!("Cart Pipeline (User {}): Removed product {}.", user_id, product_id);
  } else {
    store
      .put_cart_line(&mut *tx, user_id, CartLine { product_id, quantity })
      .await?;
    info!(
      "Cart Pipeline (User {}): Product {} now at quantity {}.",
      user_id, product_id, quantity
    );
  }
  Ok(PipelineControl::Continue)
}

async fn reload_cart<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let (store, slot, user_id) = handles(&ctx);
  let mut tx = slot.lock().await?;

  let mut lines = store.cart_lines(&mut *tx, user_id).await?;
  let product_ids: Vec<Uuid> = lines.iter().map(|l| l.product_id).collect();
  let products = if product_ids.is_empty() {
    Vec::new()
  } else {
    store.products_for_checkout(&mut *tx, &product_ids).await?
  };

  // Lines for products that left the catalog would block checkout.
  let orphaned: Vec<Uuid> = lines
    .iter()
    .map(|l| l.product_id)
    .filter(|id| !products.iter().any(|p| p.id == *id))
    .collect();
  for product_id in &orphaned {
    store.remove_cart_line(&mut *tx, user_id, *product_id).await?;
    info!(
      "Cart Pipeline (User {}): Dropped product {} that is no longer sold.",
      user_id, product_id
    );
  }
  drop(tx);
  lines.retain(|l| !orphaned.contains(&l.product_id));

  let mut guard = ctx.write();
  guard.cart = Some(CartView::assemble(&lines, &products));
  guard.lines = lines;
  Ok(PipelineControl::Continue)
}

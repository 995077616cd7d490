// storefront/src/pipelines/lifecycle_pipeline.rs

//! Status transitions after an order exists: customer cancellation, return
//! requests and the admin status override.
//!
//! The three pipelines share their first and last steps. Cancellation adds
//! the status gate and the restock in between, so the restock and the status
//! change commit together.

use chrono::Utc;
use pipeline::{ContextData, Pipeline, PipelineControl, TxSlot};
use std::sync::Arc;
use tracing::{info, warn};

use crate::errors::{AppError, Result};
use crate::models::{Order, OrderItem, OrderStatus, StatusChange};
use crate::pipelines::contexts::{Actor, LifecycleAction, OrderLifecycleCtxData};
use crate::store::Storefront;

type Ctx<S> = ContextData<OrderLifecycleCtxData<S>>;

fn base_pipeline<S: Storefront>() -> Pipeline<OrderLifecycleCtxData<S>, AppError> {
  let mut p = Pipeline::<OrderLifecycleCtxData<S>, AppError>::new(&[
    ("load_order_for_update", false, None),
    (
      "authorize_order_owner",
      false,
      Some(Arc::new(|ctx: Ctx<S>| ctx.read().actor == Actor::Admin)),
    ),
    ("record_status_change", false, None),
  ]);
  p.on_root("load_order_for_update", load_order_for_update::<S>);
  p.on_root("authorize_order_owner", authorize_order_owner::<S>);
  p.on_root("record_status_change", record_status_change::<S>);
  p
}

pub fn build_cancel_order_pipeline<S: Storefront>() -> Pipeline<OrderLifecycleCtxData<S>, AppError> {
  let mut p = base_pipeline::<S>();
  p.insert_after_step("authorize_order_owner", "ensure_cancellable", false, None);
  p.insert_after_step("ensure_cancellable", "restock_order_items", false, None);
  p.on_root("ensure_cancellable", ensure_cancellable::<S>);
  p.on_root("restock_order_items", restock_order_items::<S>);
  p
}

pub fn build_request_return_pipeline<S: Storefront>() -> Pipeline<OrderLifecycleCtxData<S>, AppError> {
  let mut p = base_pipeline::<S>();
  p.insert_after_step("authorize_order_owner", "ensure_returnable", false, None);
  p.on_root("ensure_returnable", ensure_returnable::<S>);
  p
}

/// Admin override: any known status may be set from any other.
pub fn build_update_status_pipeline<S: Storefront>() -> Pipeline<OrderLifecycleCtxData<S>, AppError> {
  let mut p = base_pipeline::<S>();
  p.insert_before_step("record_status_change", "skip_unchanged_status", false, None);
  p.on_root("skip_unchanged_status", skip_unchanged_status::<S>);
  p
}

fn loaded_order<S: Storefront>(ctx: &Ctx<S>) -> Result<Order> {
  ctx
    .read()
    .order
    .clone()
    .ok_or_else(|| AppError::Internal("order not loaded".to_string()))
}

fn handles<S: Storefront>(ctx: &Ctx<S>) -> (Arc<S>, TxSlot<S::Tx>) {
  let guard = ctx.read();
  (guard.app_state.store.clone(), guard.tx.clone())
}

async fn load_order_for_update<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let (store, slot) = handles(&ctx);
  let order_id = ctx.read().order_id;
  let mut tx = slot.lock().await?;

  let order = store
    .order_for_update(&mut *tx, order_id)
    .await?
    .ok_or(AppError::OrderNotFound(order_id))?;

  ctx.write().order = Some(order);
  Ok(PipelineControl::Continue)
}

async fn authorize_order_owner<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let guard = ctx.read();
  let owner = guard.order.as_ref().map(|o| o.user_id);
  match guard.actor {
    Actor::Customer(user_id) if owner == Some(user_id) => Ok(PipelineControl::Continue),
    Actor::Customer(user_id) => {
      warn!(order_id = %guard.order_id, %user_id, "User attempted to act on another user's order.");
      Err(AppError::NotOwner {
        order_id: guard.order_id,
      })
    }
    Actor::Admin => Ok(PipelineControl::Continue),
  }
}

async fn ensure_cancellable<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let order = loaded_order(&ctx)?;
  if !order.status.is_cancellable() {
    return Err(AppError::InvalidTransition {
      from: order.status,
      action: "cancel",
    });
  }

  let window = ctx.read().app_state.lifecycle_policy().cancellation_window;
  if let Some(window) = window {
    if Utc::now() - order.created_at > window {
      warn!(order_id = %order.id, "Cancellation window has elapsed.");
      return Err(AppError::CancellationWindowElapsed(order.id));
    }
  }
  Ok(PipelineControl::Continue)
}

async fn ensure_returnable<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let order = loaded_order(&ctx)?;
  if !order.status.is_returnable() {
    return Err(AppError::InvalidTransition {
      from: order.status,
      action: "request a return for",
    });
  }
  let reason_given = matches!(
    &ctx.read().action,
    LifecycleAction::RequestReturn { reason } if !reason.trim().is_empty()
  );
  if !reason_given {
    return Err(AppError::ReasonRequired);
  }
  Ok(PipelineControl::Continue)
}

/// Product rows are touched in id order, the same order checkout locks them
/// in, so a cancel and a checkout over the same products cannot deadlock.
fn restock_order(items: &[OrderItem]) -> Vec<&OrderItem> {
  let mut ordered: Vec<&OrderItem> = items.iter().collect();
  ordered.sort_by_key(|item| item.product_id);
  ordered
}

async fn restock_order_items<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let (store, slot) = handles(&ctx);
  let order = loaded_order(&ctx)?;
  let mut tx = slot.lock().await?;

  for item in restock_order(&order.order_items) {
    if !store.increment_stock(&mut *tx, item.product_id, item.quantity).await? {
      warn!(order_id = %order.id, product_id = %item.product_id, "Restock target no longer exists.");
      return Err(AppError::ProductNotFound(item.product_id));
    }
  }
  info!(order_id = %order.id, lines = order.order_items.len(), "Order items restocked.");
  Ok(PipelineControl::Continue)
}

async fn skip_unchanged_status<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let mut guard = ctx.write();
  let unchanged = match (&guard.action, &guard.order) {
    (LifecycleAction::SetStatus(target), Some(order)) => order.status == *target,
    _ => false,
  };
  if unchanged {
    guard.updated_order = guard.order.clone();
    return Ok(PipelineControl::Stop);
  }
  Ok(PipelineControl::Continue)
}

async fn record_status_change<S: Storefront>(ctx: Ctx<S>) -> Result<PipelineControl> {
  let (store, slot) = handles(&ctx);
  let (order_id, previous, change, actor) = {
    let guard = ctx.read();
    let previous = guard
      .order
      .as_ref()
      .map(|o| o.status)
      .ok_or_else(|| AppError::Internal("order not loaded".to_string()))?;
    let change = match &guard.action {
      LifecycleAction::Cancel => StatusChange::to(OrderStatus::Cancelled),
      LifecycleAction::RequestReturn { reason } => StatusChange {
        status: OrderStatus::ReturnRequested,
        return_reason: Some(reason.trim().to_string()),
      },
      LifecycleAction::SetStatus(status) => StatusChange::to(*status),
    };
    (guard.order_id, previous, change, guard.actor)
  };

  if previous.reopens_restocked_order(change.status) {
    warn!(
      order_id = %order_id,
      to = %change.status,
      "Reopening a cancelled order whose stock was already returned; a second cancel will restock again."
    );
  }

  let mut tx = slot.lock().await?;
  let updated = store.update_order_status(&mut *tx, order_id, &change).await?;
  drop(tx);

  info!(
    order_id = %order_id,
    from = %previous,
    to = %updated.status,
    actor = ?actor,
    "Order status changed."
  );
  ctx.write().updated_order = Some(updated);
  Ok(PipelineControl::Continue)
}

#[cfg(test)]
mod tests {
  use super::*;
  use uuid::Uuid;

  fn item(product_id: Uuid, quantity: i32) -> OrderItem {
    OrderItem {
      product_id,
      name: format!("item-{}", quantity),
      quantity,
      unit_price_cents: 1_000,
      image: None,
    }
  }

  #[test]
  fn restock_walks_products_in_id_order() {
    let low = Uuid::from_u128(1);
    let mid = Uuid::from_u128(2);
    let high = Uuid::from_u128(3);
    // Cart order, not id order.
    let items = vec![item(high, 1), item(low, 2), item(mid, 3)];

    let ids: Vec<Uuid> = restock_order(&items).into_iter().map(|i| i.product_id).collect();

    assert_eq!(ids, vec![low, mid, high]);
    assert_eq!(items[0].product_id, high, "the order snapshot itself is untouched");
  }
}

// storefront/src/services/order_lifecycle_service.rs

use pipeline::{ContextData, Pipeline, PipelineResult};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{Order, OrderStatus};
use crate::pipelines::contexts::{Actor, LifecycleAction, OrderLifecycleCtxData};
use crate::state::AppState;
use crate::store::Storefront;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecyclePolicy {
  /// When set, customers may only cancel within this long of placing the
  /// order. The status rule applies regardless.
  pub cancellation_window: Option<chrono::Duration>,
}

pub struct OrderLifecycleService<S: Storefront> {
  app_state: AppState<S>,
}

impl<S: Storefront> OrderLifecycleService<S> {
  pub fn new(app_state: AppState<S>) -> Self {
    Self { app_state }
  }

  async fn transition(
    &self,
    pipeline: &Pipeline<OrderLifecycleCtxData<S>, AppError>,
    order_id: Uuid,
    actor: Actor,
    action: LifecycleAction,
  ) -> Result<Order> {
    let ctx = ContextData::new(OrderLifecycleCtxData::new(
      self.app_state.clone(),
      order_id,
      actor,
      action,
    ));
    let outcome = pipeline
      .run_atomic(&*self.app_state.store, ctx.clone(), self.app_state.config.transaction_timeout)
      .await?;
    if outcome == PipelineResult::Stopped {
      debug!(%order_id, "Status change was a no-op.");
    }
    let updated = ctx.read().updated_order.clone();
    updated.ok_or_else(|| AppError::Internal("Status change finished without an order".to_string()))
  }

  /// Cancels a `Processing` order and puts its items back in stock.
  #[instrument(name = "order_lifecycle::cancel_order", skip(self), err(Display))]
  pub async fn cancel_order(&self, order_id: Uuid, user_id: Uuid) -> Result<Order> {
    self
      .transition(
        &self.app_state.pipelines.cancel_order,
        order_id,
        Actor::Customer(user_id),
        LifecycleAction::Cancel,
      )
      .await
  }

  #[instrument(name = "order_lifecycle::request_return", skip(self, reason), err(Display))]
  pub async fn request_return(&self, order_id: Uuid, user_id: Uuid, reason: &str) -> Result<Order> {
    let reason = reason.trim();
    if reason.is_empty() {
      return Err(AppError::ReasonRequired);
    }
    self
      .transition(
        &self.app_state.pipelines.request_return,
        order_id,
        Actor::Customer(user_id),
        LifecycleAction::RequestReturn {
          reason: reason.to_string(),
        },
      )
      .await
  }

  /// Admin override. Unknown status names are rejected; setting the current
  /// status returns the order unchanged.
  #[instrument(name = "order_lifecycle::update_status", skip(self), err(Display))]
  pub async fn update_status(&self, order_id: Uuid, status: &str) -> Result<Order> {
    let status: OrderStatus = status.parse().map_err(|e| {
      warn!(%order_id, status, "Rejected unknown order status.");
      e
    })?;
    self
      .transition(
        &self.app_state.pipelines.update_status,
        order_id,
        Actor::Admin,
        LifecycleAction::SetStatus(status),
      )
      .await
  }

  #[instrument(name = "order_lifecycle::orders_for_user", skip(self), err(Display))]
  pub async fn orders_for_user(&self, user_id: Uuid) -> Result<Vec<Order>> {
    let store = &*self.app_state.store;
    let mut tx = store.begin().await?;
    let orders = store.orders_for_user(&mut tx, user_id).await;
    store.rollback(tx).await?;
    orders
  }

  #[instrument(name = "order_lifecycle::order_for_user", skip(self), err(Display))]
  pub async fn order_for_user(&self, order_id: Uuid, user_id: Uuid) -> Result<Order> {
    let store = &*self.app_state.store;
    let mut tx = store.begin().await?;
    let order = store.order_for_update(&mut tx, order_id).await;
    store.rollback(tx).await?;

    let order = order?.ok_or(AppError::OrderNotFound(order_id))?;
    if order.user_id != user_id {
      warn!(%order_id, %user_id, "User attempted to read another user's order.");
      return Err(AppError::NotOwner { order_id });
    }
    Ok(order)
  }

  #[instrument(name = "order_lifecycle::all_orders", skip(self), err(Display))]
  pub async fn all_orders(&self) -> Result<Vec<Order>> {
    let store = &*self.app_state.store;
    let mut tx = store.begin().await?;
    let orders = store.all_orders(&mut tx).await;
    store.rollback(tx).await?;
    orders
  }
}

// storefront/src/services/cart_service.rs

use pipeline::{ContextData, PipelineResultExt};
use tracing::instrument;
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::CartView;
use crate::pipelines::contexts::{CartCtxData, CartOp};
use crate::state::AppState;
use crate::store::Storefront;

pub struct CartService<S: Storefront> {
  app_state: AppState<S>,
}

impl<S: Storefront> CartService<S> {
  pub fn new(app_state: AppState<S>) -> Self {
    Self { app_state }
  }

  async fn run(&self, user_id: Uuid, op: CartOp) -> Result<CartView> {
    let ctx = ContextData::new(CartCtxData::new(self.app_state.clone(), user_id, op));
    self
      .app_state
      .pipelines
      .cart
      .run_atomic(&*self.app_state.store, ctx.clone(), self.app_state.config.transaction_timeout)
      .await
      .completed_or(|| AppError::Internal("Cart pipeline stopped unexpectedly".to_string()))?;
    let cart = ctx.read().cart.clone();
    Ok(cart.unwrap_or_default())
  }

  #[instrument(name = "cart_service::view_cart", skip(self), err(Display))]
  pub async fn view_cart(&self, user_id: Uuid) -> Result<CartView> {
    self.run(user_id, CartOp::View).await
  }

  /// Adds `quantity` on top of what is already in the cart.
  #[instrument(name = "cart_service::add_to_cart", skip(self), err(Display))]
  pub async fn add_to_cart(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartView> {
    self.run(user_id, CartOp::Add { product_id, quantity }).await
  }

  /// A quantity of 0 removes the line.
  #[instrument(name = "cart_service::update_cart_item", skip(self), err(Display))]
  pub async fn update_cart_item(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<CartView> {
    self.run(user_id, CartOp::Set { product_id, quantity }).await
  }

  #[instrument(name = "cart_service::remove_cart_item", skip(self), err(Display))]
  pub async fn remove_cart_item(&self, user_id: Uuid, product_id: Uuid) -> Result<CartView> {
    self.run(user_id, CartOp::Remove { product_id }).await
  }
}

// storefront/src/pipelines/mod.rs

//! Pipelines used by the storefront, built once at startup and shared
//! through `AppState`.

use crate::errors::AppError;
use crate::store::Storefront;
use pipeline::Pipeline;

pub mod contexts;

pub mod cart_pipeline;
pub mod checkout_pipeline;
pub mod lifecycle_pipeline;

use contexts::{CartCtxData, CheckoutCtxData, OrderLifecycleCtxData};

pub struct Pipelines<S: Storefront> {
  pub checkout: Pipeline<CheckoutCtxData<S>, AppError>,
  /// Read-only prefix of `checkout`, for pricing a cart before payment.
  pub checkout_quote: Pipeline<CheckoutCtxData<S>, AppError>,
  pub cancel_order: Pipeline<OrderLifecycleCtxData<S>, AppError>,
  pub request_return: Pipeline<OrderLifecycleCtxData<S>, AppError>,
  pub update_status: Pipeline<OrderLifecycleCtxData<S>, AppError>,
  pub cart: Pipeline<CartCtxData<S>, AppError>,
}

impl<S: Storefront> Pipelines<S> {
  pub fn build() -> Self {
    Self {
      checkout: checkout_pipeline::build_checkout_pipeline(),
      checkout_quote: checkout_pipeline::build_checkout_quote_pipeline(),
      cancel_order: lifecycle_pipeline::build_cancel_order_pipeline(),
      request_return: lifecycle_pipeline::build_request_return_pipeline(),
      update_status: lifecycle_pipeline::build_update_status_pipeline(),
      cart: cart_pipeline::build_cart_pipeline(),
    }
  }
}

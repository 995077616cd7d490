// storefront/src/web/handlers/cart_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::CartService;
use crate::state::AppState;
use crate::store::Storefront;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequestPayload {
  pub product_id: Uuid,
  pub quantity: i32,
}

#[derive(Deserialize, Debug)]
pub struct UpdateCartItemPayload {
  pub quantity: i32,
}

#[instrument(name = "handler::view_cart", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn view_cart_handler<S: Storefront>(
  app_state: web::Data<AppState<S>>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let cart = CartService::new(app_state.get_ref().clone())
    .view_cart(auth_user.user_id)
    .await?;
  Ok(HttpResponse::Ok().json(cart))
}

#[instrument(
    name = "handler::add_to_cart",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id, product_id = %req_payload.product_id, quantity = %req_payload.quantity)
)]
pub async fn add_to_cart_handler<S: Storefront>(
  app_state: web::Data<AppState<S>>,
  req_payload: web::Json<AddToCartRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let cart = CartService::new(app_state.get_ref().clone())
    .add_to_cart(auth_user.user_id, req_payload.product_id, req_payload.quantity)
    .await?;
  info!("Product {} added to cart of user {}.", req_payload.product_id, auth_user.user_id);
  Ok(HttpResponse::Ok().json(cart))
}

#[instrument(
    name = "handler::update_cart_item",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id, product_id = %path)
)]
pub async fn update_cart_item_handler<S: Storefront>(
  app_state: web::Data<AppState<S>>,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdateCartItemPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let cart = CartService::new(app_state.get_ref().clone())
    .update_cart_item(auth_user.user_id, path.into_inner(), req_payload.quantity)
    .await?;
  Ok(HttpResponse::Ok().json(cart))
}

#[instrument(
    name = "handler::remove_cart_item",
    skip(app_state, auth_user),
    fields(user_id = %auth_user.user_id, product_id = %path)
)]
pub async fn remove_cart_item_handler<S: Storefront>(
  app_state: web::Data<AppState<S>>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let cart = CartService::new(app_state.get_ref().clone())
    .remove_cart_item(auth_user.user_id, path.into_inner())
    .await?;
  Ok(HttpResponse::Ok().json(cart))
}

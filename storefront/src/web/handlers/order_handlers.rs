// storefront/src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::OrderLifecycleService;
use crate::state::AppState;
use crate::store::Storefront;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
pub struct ReturnRequestPayload {
  #[serde(default)]
  pub reason: String,
}

#[instrument(name = "handler::my_orders", skip(app_state, auth_user), fields(user_id = %auth_user.user_id))]
pub async fn my_orders_handler<S: Storefront>(
  app_state: web::Data<AppState<S>>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let orders = OrderLifecycleService::new(app_state.get_ref().clone())
    .orders_for_user(auth_user.user_id)
    .await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(name = "handler::get_order", skip(app_state, auth_user), fields(user_id = %auth_user.user_id, order_id = %path))]
pub async fn get_order_handler<S: Storefront>(
  app_state: web::Data<AppState<S>>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = OrderLifecycleService::new(app_state.get_ref().clone())
    .order_for_user(path.into_inner(), auth_user.user_id)
    .await?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::cancel_order", skip(app_state, auth_user), fields(user_id = %auth_user.user_id, order_id = %path))]
pub async fn cancel_order_handler<S: Storefront>(
  app_state: web::Data<AppState<S>>,
  path: web::Path<Uuid>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = OrderLifecycleService::new(app_state.get_ref().clone())
    .cancel_order(path.into_inner(), auth_user.user_id)
    .await?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(
    name = "handler::request_return",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id, order_id = %path)
)]
pub async fn request_return_handler<S: Storefront>(
  app_state: web::Data<AppState<S>>,
  path: web::Path<Uuid>,
  req_payload: web::Json<ReturnRequestPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = OrderLifecycleService::new(app_state.get_ref().clone())
    .request_return(path.into_inner(), auth_user.user_id, &req_payload.reason)
    .await?;
  Ok(HttpResponse::Ok().json(order))
}

// storefront/src/web/handlers/checkout_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::{CheckoutPayment, CheckoutService, PlaceOrder};
use crate::state::AppState;
use crate::store::Storefront;
use crate::web::extractors::AuthenticatedUser;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAddressPayload {
  pub delivery_address_id: Uuid,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentPayload {
  pub intent_handle: String,
  pub payment_handle: String,
  pub signature: String,
  pub delivery_address_id: Uuid,
}

#[instrument(
    name = "handler::place_cod_order",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id, address_id = %req_payload.delivery_address_id)
)]
pub async fn place_cod_order_handler<S: Storefront>(
  app_state: web::Data<AppState<S>>,
  req_payload: web::Json<DeliveryAddressPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let order = CheckoutService::new(app_state.get_ref().clone())
    .place_order(PlaceOrder {
      user_id: auth_user.user_id,
      delivery_address_id: req_payload.delivery_address_id,
      payment: CheckoutPayment::Cod,
    })
    .await?;
  info!("COD order {} placed by user {}.", order.id, auth_user.user_id);
  Ok(HttpResponse::Created().json(order))
}

#[instrument(
    name = "handler::create_payment_intent",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id, address_id = %req_payload.delivery_address_id)
)]
pub async fn create_payment_intent_handler<S: Storefront>(
  app_state: web::Data<AppState<S>>,
  req_payload: web::Json<DeliveryAddressPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let checkout = CheckoutService::new(app_state.get_ref().clone())
    .begin_gateway_checkout(auth_user.user_id, req_payload.delivery_address_id)
    .await?;
  Ok(HttpResponse::Ok().json(json!({
    "intent": checkout.intent,
    "charges": checkout.charges,
  })))
}

#[instrument(
    name = "handler::verify_payment",
    skip(app_state, req_payload, auth_user),
    fields(user_id = %auth_user.user_id, intent_handle = %req_payload.intent_handle)
)]
pub async fn verify_payment_handler<S: Storefront>(
  app_state: web::Data<AppState<S>>,
  req_payload: web::Json<VerifyPaymentPayload>,
  auth_user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
  let payload = req_payload.into_inner();
  let order = CheckoutService::new(app_state.get_ref().clone())
    .confirm_gateway_payment(
      auth_user.user_id,
      payload.delivery_address_id,
      &payload.intent_handle,
      &payload.payment_handle,
      &payload.signature,
    )
    .await?;
  info!("Gateway order {} placed by user {}.", order.id, auth_user.user_id);
  Ok(HttpResponse::Created().json(order))
}

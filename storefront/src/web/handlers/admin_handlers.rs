// storefront/src/web/handlers/admin_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::services::OrderLifecycleService;
use crate::state::AppState;
use crate::store::Storefront;
use crate::web::extractors::AdminUser;

#[derive(Deserialize, Debug)]
pub struct UpdateStatusPayload {
  pub status: String,
}

#[instrument(name = "handler::all_orders", skip(app_state, admin), fields(admin_id = %admin.user_id))]
pub async fn all_orders_handler<S: Storefront>(
  app_state: web::Data<AppState<S>>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let orders = OrderLifecycleService::new(app_state.get_ref().clone())
    .all_orders()
    .await?;
  Ok(HttpResponse::Ok().json(orders))
}

#[instrument(
    name = "handler::update_order_status",
    skip(app_state, req_payload, admin),
    fields(admin_id = %admin.user_id, order_id = %path, status = %req_payload.status)
)]
pub async fn update_order_status_handler<S: Storefront>(
  app_state: web::Data<AppState<S>>,
  path: web::Path<Uuid>,
  req_payload: web::Json<UpdateStatusPayload>,
  admin: AdminUser,
) -> Result<HttpResponse, AppError> {
  let order = OrderLifecycleService::new(app_state.get_ref().clone())
    .update_status(path.into_inner(), &req_payload.status)
    .await?;
  info!("Admin {} set order {} to {}.", admin.user_id, order.id, order.status);
  Ok(HttpResponse::Ok().json(order))
}

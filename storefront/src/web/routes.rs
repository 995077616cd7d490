// storefront/src/web/routes.rs

use actix_web::web;

use crate::store::Storefront;
use crate::web::handlers::{admin_handlers, cart_handlers, checkout_handlers, order_handlers};

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

pub fn configure_app_routes<S: Storefront>(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/cart")
          .route("", web::get().to(cart_handlers::view_cart_handler::<S>))
          .route("/items", web::post().to(cart_handlers::add_to_cart_handler::<S>))
          .route(
            "/items/{product_id}",
            web::put().to(cart_handlers::update_cart_item_handler::<S>),
          )
          .route(
            "/items/{product_id}",
            web::delete().to(cart_handlers::remove_cart_item_handler::<S>),
          ),
      )
      .service(
        web::scope("/payments")
          .route(
            "/intents",
            web::post().to(checkout_handlers::create_payment_intent_handler::<S>),
          )
          .route("/verify", web::post().to(checkout_handlers::verify_payment_handler::<S>)),
      )
      .service(
        web::scope("/orders")
          .route("/cod", web::post().to(checkout_handlers::place_cod_order_handler::<S>))
          .route("/mine", web::get().to(order_handlers::my_orders_handler::<S>))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler::<S>))
          .route(
            "/{order_id}/cancel",
            web::post().to(order_handlers::cancel_order_handler::<S>),
          )
          .route(
            "/{order_id}/return",
            web::post().to(order_handlers::request_return_handler::<S>),
          ),
      )
      .service(
        web::scope("/admin")
          .route("/orders", web::get().to(admin_handlers::all_orders_handler::<S>))
          .route(
            "/orders/{order_id}/status",
            web::put().to(admin_handlers::update_order_status_handler::<S>),
          ),
      ),
  );
}

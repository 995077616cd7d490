// storefront/tests/http_tests.rs
mod common;

use actix_web::http::StatusCode;
use actix_web::{test, web, App};
use common::*;
use serde_json::{json, Value};
use storefront::store::MemoryStore;
use storefront::web::configure_app_routes;
use storefront::web::extractors::{USER_ID_HEADER, USER_ROLE_HEADER};

macro_rules! app {
  ($h:expr) => {
    test::init_service(
      App::new()
        .app_data(web::Data::new($h.state.clone()))
        .configure(configure_app_routes::<MemoryStore>),
    )
    .await
  };
}

#[actix_web::test]
async fn health_is_public() {
  let h = Harness::new().await;
  let app = app!(h);
  let resp = test::call_service(&app, test::TestRequest::get().uri("/api/v1/health").to_request()).await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[actix_web::test]
async fn requests_without_a_user_are_unauthenticated() {
  let h = Harness::new().await;
  let app = app!(h);
  let req = test::TestRequest::get().uri("/api/v1/cart").to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"]["code"], "UNAUTHENTICATED");
  assert_eq!(body["error"]["kind"], "authentication");
}

#[actix_web::test]
async fn cod_order_round_trip_over_http() {
  let h = Harness::new().await;
  let lamp = h.product("Desk Lamp", 10_000, 5).await;
  let app = app!(h);
  let user = h.user_id.to_string();

  let req = test::TestRequest::post()
    .uri("/api/v1/cart/items")
    .insert_header((USER_ID_HEADER, user.as_str()))
    .set_json(json!({ "productId": lamp, "quantity": 2 }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);

  let req = test::TestRequest::post()
    .uri("/api/v1/orders/cod")
    .insert_header((USER_ID_HEADER, user.as_str()))
    .set_json(json!({ "deliveryAddressId": h.address_id }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let order: Value = test::read_body_json(resp).await;
  assert_eq!(order["totalAmountCents"], 20_000 + COD_FEE_CENTS);
  assert_eq!(order["status"], "Processing");
  assert_eq!(order["paymentStatus"], "Pending (COD)");
  let order_id = order["id"].as_str().unwrap().to_string();

  let req = test::TestRequest::post()
    .uri(&format!("/api/v1/orders/{}/cancel", order_id))
    .insert_header((USER_ID_HEADER, user.as_str()))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let cancelled: Value = test::read_body_json(resp).await;
  assert_eq!(cancelled["status"], "Cancelled");
  assert_eq!(h.stock(lamp).await, 5);
}

#[actix_web::test]
async fn business_errors_carry_stable_codes() {
  let h = Harness::new().await;
  let app = app!(h);

  let req = test::TestRequest::post()
    .uri("/api/v1/orders/cod")
    .insert_header((USER_ID_HEADER, h.user_id.to_string()))
    .set_json(json!({ "deliveryAddressId": h.address_id }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"]["code"], "EMPTY_CART");
  assert_eq!(h.store.order_count().await, 0);
}

#[actix_web::test]
async fn admin_routes_require_the_admin_role() {
  let h = Harness::new().await;
  let lamp = h.product("Desk Lamp", 10_000, 5).await;
  h.fill_cart(h.user_id, &[(lamp, 1)]).await;
  let order = h.place_cod().await.unwrap();
  let app = app!(h);
  let uri = format!("/api/v1/admin/orders/{}/status", order.id);

  let req = test::TestRequest::put()
    .uri(&uri)
    .insert_header((USER_ID_HEADER, h.user_id.to_string()))
    .set_json(json!({ "status": "Shipped" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let req = test::TestRequest::put()
    .uri(&uri)
    .insert_header((USER_ID_HEADER, h.user_id.to_string()))
    .insert_header((USER_ROLE_HEADER, "admin"))
    .set_json(json!({ "status": "Teleported" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"]["code"], "UNKNOWN_STATUS");

  let req = test::TestRequest::put()
    .uri(&uri)
    .insert_header((USER_ID_HEADER, h.user_id.to_string()))
    .insert_header((USER_ROLE_HEADER, "admin"))
    .set_json(json!({ "status": "Shipped" }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let updated: Value = test::read_body_json(resp).await;
  assert_eq!(updated["status"], "Shipped");
}

#[actix_web::test]
async fn customers_cannot_read_each_others_orders() {
  let h = Harness::new().await;
  let lamp = h.product("Desk Lamp", 10_000, 5).await;
  h.fill_cart(h.user_id, &[(lamp, 1)]).await;
  let order = h.place_cod().await.unwrap();
  let app = app!(h);

  let req = test::TestRequest::get()
    .uri(&format!("/api/v1/orders/{}", order.id))
    .insert_header((USER_ID_HEADER, uuid::Uuid::new_v4().to_string()))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["error"]["code"], "NOT_OWNER");
}

// storefront/tests/gateway_tests.rs
mod common;

use common::*;
use storefront::errors::AppError;
use storefront::models::{OrderStatus, PaymentMethod};
use storefront::services::{GatewayCheckout, PaymentGateway};
use uuid::Uuid;

async fn begin(h: &Harness) -> GatewayCheckout {
  h.checkout()
    .begin_gateway_checkout(h.user_id, h.address_id)
    .await
    .expect("gateway checkout should start")
}

#[tokio::test]
async fn starting_a_gateway_checkout_moves_no_stock() {
  let h = Harness::new().await;
  let lamp = h.product("Desk Lamp", 10_025, 5).await;
  h.fill_cart(h.user_id, &[(lamp, 2)]).await;

  let checkout = begin(&h).await;

  assert_eq!(checkout.charges.subtotal_cents, 20_050);
  assert_eq!(checkout.charges.cod_fee_cents, 0);
  // Whole currency units only.
  assert_eq!(checkout.charges.total_cents, 20_100);
  assert_eq!(checkout.intent.amount_cents, checkout.charges.total_cents);
  assert_eq!(checkout.intent.key_id, GATEWAY_KEY_ID);
  assert_eq!(checkout.intent.currency, "INR");

  assert_eq!(h.stock(lamp).await, 5);
  assert_eq!(h.store.order_count().await, 0);
  assert_eq!(h.store.cart(h.user_id).await.map(|c| c.len()), Some(1));
}

#[tokio::test]
async fn gateway_checkout_rejects_an_empty_cart_before_creating_an_intent() {
  let h = Harness::new().await;
  let err = h
    .checkout()
    .begin_gateway_checkout(h.user_id, h.address_id)
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::EmptyCart));
}

#[tokio::test]
async fn a_verified_payment_places_a_paid_order() {
  let h = Harness::new().await;
  let lamp = h.product("Desk Lamp", 10_000, 5).await;
  h.fill_cart(h.user_id, &[(lamp, 2)]).await;
  let checkout = begin(&h).await;

  let signature = h.gateway.sign(&checkout.intent.handle, "pay_001").unwrap();
  let order = h
    .checkout()
    .confirm_gateway_payment(h.user_id, h.address_id, &checkout.intent.handle, "pay_001", &signature)
    .await
    .unwrap();

  assert_eq!(order.payment_method, PaymentMethod::Gateway);
  assert_eq!(order.payment_status, "Paid");
  assert_eq!(order.transaction_ref.as_deref(), Some("pay_001"));
  assert_eq!(order.status, OrderStatus::Processing);
  assert_eq!(order.total_amount_cents, 20_000);
  assert_eq!(h.stock(lamp).await, 3);
  assert_eq!(h.store.cart(h.user_id).await, Some(Vec::new()));
}

#[tokio::test]
async fn a_payment_handle_can_only_pay_for_one_order() {
  let h = Harness::new().await;
  let lamp = h.product("Desk Lamp", 10_000, 5).await;
  let service = h.checkout();

  h.fill_cart(h.user_id, &[(lamp, 1)]).await;
  let first = begin(&h).await;
  let signature = h.gateway.sign(&first.intent.handle, "pay_dup").unwrap();
  service
    .confirm_gateway_payment(h.user_id, h.address_id, &first.intent.handle, "pay_dup", &signature)
    .await
    .unwrap();

  // Replaying the paid intent finds nothing to confirm.
  h.fill_cart(h.user_id, &[(lamp, 1)]).await;
  let err = service
    .confirm_gateway_payment(h.user_id, h.address_id, &first.intent.handle, "pay_dup", &signature)
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("Unknown payment intent")));

  // A fresh intent cannot reuse the payment either.
  let second = begin(&h).await;
  let signature = h.gateway.sign(&second.intent.handle, "pay_dup").unwrap();
  let err = service
    .confirm_gateway_payment(h.user_id, h.address_id, &second.intent.handle, "pay_dup", &signature)
    .await
    .unwrap_err();

  assert!(matches!(err, AppError::DuplicatePayment(ref handle) if handle == "pay_dup"));
  assert_eq!(h.stock(lamp).await, 4);
  assert_eq!(h.store.order_count().await, 1);
  assert!(h.gateway.find_intent(&second.intent.handle).await.unwrap().is_some());
}

#[tokio::test]
async fn a_paid_intent_is_retired_and_other_intents_stay_open() {
  let h = Harness::new().await;
  let lamp = h.product("Desk Lamp", 10_000, 5).await;
  h.fill_cart(h.user_id, &[(lamp, 1)]).await;

  let abandoned = begin(&h).await;
  let paid = begin(&h).await;
  let signature = h.gateway.sign(&paid.intent.handle, "pay_010").unwrap();
  h.checkout()
    .confirm_gateway_payment(h.user_id, h.address_id, &paid.intent.handle, "pay_010", &signature)
    .await
    .unwrap();

  assert!(h.gateway.find_intent(&paid.intent.handle).await.unwrap().is_none());
  assert!(h.gateway.find_intent(&abandoned.intent.handle).await.unwrap().is_some());
  assert_eq!(h.gateway.held_intents(), 1);
}

#[tokio::test]
async fn an_intent_only_pays_for_the_shopper_who_opened_it() {
  let h = Harness::new().await;
  let lamp = h.product("Desk Lamp", 10_000, 5).await;
  h.fill_cart(h.user_id, &[(lamp, 1)]).await;
  let checkout = begin(&h).await;

  // Same cart total, different shopper.
  let intruder = Uuid::new_v4();
  let intruder_address = h.address_for(intruder).await;
  h.fill_cart(intruder, &[(lamp, 1)]).await;

  let signature = h.gateway.sign(&checkout.intent.handle, "pay_003").unwrap();
  let err = h
    .checkout()
    .confirm_gateway_payment(intruder, intruder_address, &checkout.intent.handle, "pay_003", &signature)
    .await
    .unwrap_err();

  assert!(matches!(err, AppError::Forbidden(_)), "got {:?}", err);
  assert_eq!(h.stock(lamp).await, 5);
  assert_eq!(h.store.order_count().await, 0);
  assert!(h.gateway.find_intent(&checkout.intent.handle).await.unwrap().is_some());
}

#[tokio::test]
async fn an_expired_intent_cannot_be_confirmed() {
  let mut config = test_config();
  config.payment_intent_ttl = chrono::Duration::zero();
  let h = Harness::with_config(config).await;
  let lamp = h.product("Desk Lamp", 10_000, 5).await;
  h.fill_cart(h.user_id, &[(lamp, 1)]).await;
  let checkout = begin(&h).await;

  let signature = h.gateway.sign(&checkout.intent.handle, "pay_004").unwrap();
  let err = h
    .checkout()
    .confirm_gateway_payment(h.user_id, h.address_id, &checkout.intent.handle, "pay_004", &signature)
    .await
    .unwrap_err();

  assert!(matches!(err, AppError::Validation(_)));
  assert_eq!(h.stock(lamp).await, 5);
  assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn a_bad_signature_places_nothing() {
  let h = Harness::new().await;
  let lamp = h.product("Desk Lamp", 10_000, 5).await;
  h.fill_cart(h.user_id, &[(lamp, 1)]).await;
  let checkout = begin(&h).await;

  let forged = h.gateway.sign(&checkout.intent.handle, "pay_other").unwrap();
  for signature in [forged.as_str(), "zz-not-hex", ""] {
    let err = h
      .checkout()
      .confirm_gateway_payment(h.user_id, h.address_id, &checkout.intent.handle, "pay_001", signature)
      .await
      .unwrap_err();
    assert!(matches!(err, AppError::PaymentSignatureInvalid), "got {:?}", err);
  }
  assert_eq!(h.stock(lamp).await, 5);
  assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn the_cart_total_must_still_match_the_intent() {
  let h = Harness::new().await;
  let lamp = h.product("Desk Lamp", 10_000, 5).await;
  h.fill_cart(h.user_id, &[(lamp, 1)]).await;
  let checkout = begin(&h).await;
  h.store.edit_product(lamp, |p| p.price_cents = 15_000).await;

  let signature = h.gateway.sign(&checkout.intent.handle, "pay_002").unwrap();
  let err = h
    .checkout()
    .confirm_gateway_payment(h.user_id, h.address_id, &checkout.intent.handle, "pay_002", &signature)
    .await
    .unwrap_err();

  match err {
    AppError::PaymentAmountMismatch {
      expected_cents,
      actual_cents,
    } => {
      assert_eq!(expected_cents, 10_000);
      assert_eq!(actual_cents, 15_000);
    }
    other => panic!("expected PaymentAmountMismatch, got {:?}", other),
  }
  assert_eq!(h.stock(lamp).await, 5);
  assert_eq!(h.store.order_count().await, 0);
}

#[tokio::test]
async fn confirmation_input_is_validated() {
  let h = Harness::new().await;
  let service = h.checkout();

  let err = service
    .confirm_gateway_payment(h.user_id, h.address_id, "  ", "pay_001", "00")
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::Validation(_)));

  let unknown = format!("order_{}", Uuid::new_v4().simple());
  let signature = h.gateway.sign(&unknown, "pay_001").unwrap();
  let err = service
    .confirm_gateway_payment(h.user_id, h.address_id, &unknown, "pay_001", &signature)
    .await
    .unwrap_err();
  assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("Unknown payment intent")));
}

// storefront/tests/common/mod.rs
#![allow(dead_code)]

use chrono::Utc;
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;
use uuid::Uuid;

use storefront::config::{AppConfig, LogFormat, StorageBackend};
use storefront::errors::Result;
use storefront::models::{Address, CartLine, Order, Product};
use storefront::services::{
  CartService, CheckoutPayment, CheckoutService, HmacPaymentGateway, OrderLifecycleService, PaymentGateway, PlaceOrder,
};
use storefront::state::AppState;
use storefront::store::MemoryStore;

pub const GATEWAY_KEY_ID: &str = "key_test";
pub const GATEWAY_SECRET: &str = "gateway-test-secret";
pub const COD_FEE_CENTS: i64 = 5_000;

// --- Tracing ---
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub fn test_config() -> AppConfig {
  AppConfig {
    server_host: "127.0.0.1".to_string(),
    server_port: 0,
    storage_backend: StorageBackend::Memory,
    database_url: None,
    database_max_connections: 1,
    run_migrations: false,
    currency: "INR".to_string(),
    cod_fee_cents: COD_FEE_CENTS,
    tax_rate_bps: 0,
    cancellation_window: None,
    transaction_timeout: Duration::from_secs(5),
    payment_gateway_key_id: GATEWAY_KEY_ID.to_string(),
    payment_gateway_key_secret: GATEWAY_SECRET.to_string(),
    payment_intent_ttl: chrono::Duration::minutes(30),
    log_format: LogFormat::Text,
  }
}

/// One in-memory storefront with a default shopper who has a saved address.
pub struct Harness {
  pub store: Arc<MemoryStore>,
  pub gateway: Arc<HmacPaymentGateway>,
  pub state: AppState<MemoryStore>,
  pub user_id: Uuid,
  pub address_id: Uuid,
}

impl Harness {
  pub async fn new() -> Self {
    Self::with_config(test_config()).await
  }

  pub async fn with_config(config: AppConfig) -> Self {
    setup_tracing();
    let store = Arc::new(MemoryStore::new());
    let gateway = Arc::new(
      HmacPaymentGateway::new(GATEWAY_KEY_ID, GATEWAY_SECRET, config.currency.clone())
        .with_intent_ttl(config.payment_intent_ttl),
    );
    let dyn_gateway: Arc<dyn PaymentGateway> = gateway.clone();
    let state = AppState::new(store.clone(), dyn_gateway, config);

    let user_id = Uuid::new_v4();
    let mut harness = Harness {
      store,
      gateway,
      state,
      user_id,
      address_id: Uuid::nil(),
    };
    harness.address_id = harness.address_for(user_id).await;
    harness
  }

  pub async fn product(&self, name: &str, price_cents: i64, stock: i32) -> Uuid {
    let now = Utc::now();
    let id = Uuid::new_v4();
    self
      .store
      .seed_product(Product {
        id,
        name: name.to_string(),
        description: None,
        price_cents,
        image: Some(format!("https://img.example/{}.png", id.simple())),
        available_quantity: stock,
        created_at: now,
        updated_at: now,
      })
      .await;
    id
  }

  pub async fn address_for(&self, user_id: Uuid) -> Uuid {
    let id = Uuid::new_v4();
    self
      .store
      .seed_address(Address {
        id,
        user_id,
        full_name: "Asha Rao".to_string(),
        phone: "+91 98450 00000".to_string(),
        line1: "12 MG Road".to_string(),
        line2: None,
        city: "Bengaluru".to_string(),
        state: "KA".to_string(),
        postal_code: "560001".to_string(),
        country: "IN".to_string(),
      })
      .await;
    id
  }

  pub async fn fill_cart(&self, user_id: Uuid, lines: &[(Uuid, i32)]) {
    let lines = lines
      .iter()
      .map(|&(product_id, quantity)| CartLine { product_id, quantity })
      .collect();
    self.store.seed_cart(user_id, lines).await;
  }

  pub async fn stock(&self, product_id: Uuid) -> i32 {
    self.store.stock(product_id).await.unwrap_or(-1)
  }

  pub fn checkout(&self) -> CheckoutService<MemoryStore> {
    CheckoutService::new(self.state.clone())
  }

  pub fn lifecycle(&self) -> OrderLifecycleService<MemoryStore> {
    OrderLifecycleService::new(self.state.clone())
  }

  pub fn cart(&self) -> CartService<MemoryStore> {
    CartService::new(self.state.clone())
  }

  /// COD checkout for the default shopper.
  pub async fn place_cod(&self) -> Result<Order> {
    self.place_cod_for(self.user_id, self.address_id).await
  }

  pub async fn place_cod_for(&self, user_id: Uuid, address_id: Uuid) -> Result<Order> {
    self
      .checkout()
      .place_order(PlaceOrder {
        user_id,
        delivery_address_id: address_id,
        payment: CheckoutPayment::Cod,
      })
      .await
  }
}

// storefront/src/store/mod.rs

//! Storage collaborators used by the order core.
//!
//! Every operation takes the open transaction explicitly as `&mut Self::Tx`.
//! The pipelines obtain it from their context's `TxSlot`, so a whole checkout
//! or cancellation reads and writes through one transaction.

pub mod memory;
pub mod postgres;

use crate::errors::Result;
use crate::models::{Address, CartLine, CheckoutProduct, Order, StatusChange};
use async_trait::async_trait;
use pipeline::Transactor;
use uuid::Uuid;

pub use memory::{FailPoint, MemoryStore};
pub use postgres::PgStore;

#[async_trait]
pub trait CartStore: Transactor<Error = crate::errors::AppError> {
  /// Lines in insertion order. Empty when the user has no cart yet.
  async fn cart_lines(&self, tx: &mut Self::Tx, user_id: Uuid) -> Result<Vec<CartLine>>;

  /// Creates the cart on first use. Replaces the quantity of an existing line
  /// for the same product, appends otherwise.
  async fn put_cart_line(&self, tx: &mut Self::Tx, user_id: Uuid, line: CartLine) -> Result<()>;

  async fn remove_cart_line(&self, tx: &mut Self::Tx, user_id: Uuid, product_id: Uuid) -> Result<bool>;

  /// Empties the cart. The cart itself is kept.
  async fn clear_cart(&self, tx: &mut Self::Tx, user_id: Uuid) -> Result<()>;
}

#[async_trait]
pub trait InventoryStore: Transactor<Error = crate::errors::AppError> {
  /// Reads the given products for the rest of the transaction. Unknown ids
  /// are simply absent from the result.
  async fn products_for_checkout(&self, tx: &mut Self::Tx, product_ids: &[Uuid]) -> Result<Vec<CheckoutProduct>>;

  /// Conditional decrement. Returns false, and changes nothing, when fewer
  /// than `quantity` units are available.
  async fn try_decrement_stock(&self, tx: &mut Self::Tx, product_id: Uuid, quantity: i32) -> Result<bool>;

  /// Returns false when the product no longer exists.
  async fn increment_stock(&self, tx: &mut Self::Tx, product_id: Uuid, quantity: i32) -> Result<bool>;
}

#[async_trait]
pub trait AddressBook: Transactor<Error = crate::errors::AppError> {
  async fn find_address(&self, tx: &mut Self::Tx, user_id: Uuid, address_id: Uuid) -> Result<Option<Address>>;
}

#[async_trait]
pub trait OrderLedger: Transactor<Error = crate::errors::AppError> {
  async fn insert_order(&self, tx: &mut Self::Tx, order: &Order) -> Result<Uuid>;

  /// Reads an order and holds it for the rest of the transaction.
  async fn order_for_update(&self, tx: &mut Self::Tx, order_id: Uuid) -> Result<Option<Order>>;

  async fn order_by_transaction_ref(&self, tx: &mut Self::Tx, transaction_ref: &str) -> Result<Option<Order>>;

  async fn update_order_status(&self, tx: &mut Self::Tx, order_id: Uuid, change: &StatusChange) -> Result<Order>;

  /// Newest first.
  async fn orders_for_user(&self, tx: &mut Self::Tx, user_id: Uuid) -> Result<Vec<Order>>;

  /// Newest first.
  async fn all_orders(&self, tx: &mut Self::Tx) -> Result<Vec<Order>>;
}

/// Everything the storefront needs from a backend.
pub trait Storefront: CartStore + InventoryStore + AddressBook + OrderLedger + 'static {}

impl<T> Storefront for T where T: CartStore + InventoryStore + AddressBook + OrderLedger + 'static {}

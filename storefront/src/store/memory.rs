// storefront/src/store/memory.rs

//! In-process backend.
//!
//! Transactions are serializable: `begin` takes the state lock and keeps it
//! until commit or rollback, and all writes go to a private copy that replaces
//! the shared state only on commit.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex as SyncMutex;
use pipeline::Transactor;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{AddressBook, CartStore, InventoryStore, OrderLedger};
use crate::errors::{AppError, Result};
use crate::models::{Address, CartLine, CheckoutProduct, Order, Product, StatusChange};

/// Operations that can be told to fail, to exercise rollback paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
  InsertOrder,
  ClearCart,
  DecrementStock,
  IncrementStock,
  UpdateOrderStatus,
}

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
  products: HashMap<Uuid, Product>,
  addresses: HashMap<Uuid, Address>,
  carts: HashMap<Uuid, Vec<CartLine>>,
  /// Insertion order, oldest first.
  orders: Vec<Order>,
}

pub struct MemoryTx {
  guard: OwnedMutexGuard<MemoryState>,
  working: MemoryState,
}

impl std::fmt::Debug for MemoryTx {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("MemoryTx").finish_non_exhaustive()
  }
}

#[derive(Clone, Default)]
pub struct MemoryStore {
  state: Arc<Mutex<MemoryState>>,
  fail_points: Arc<SyncMutex<HashSet<FailPoint>>>,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn fail_at(&self, point: FailPoint) {
    self.fail_points.lock().insert(point);
  }

  pub fn clear_fail_points(&self) {
    self.fail_points.lock().clear();
  }

  fn check(&self, point: FailPoint) -> Result<()> {
    if self.fail_points.lock().contains(&point) {
      warn!(?point, "Injected storage failure.");
      return Err(AppError::Storage(format!("injected failure at {:?}", point)));
    }
    Ok(())
  }

  // --- Seeding and inspection, outside of any transaction ---

  pub async fn seed_product(&self, product: Product) {
    self.state.lock().await.products.insert(product.id, product);
  }

  pub async fn seed_address(&self, address: Address) {
    self.state.lock().await.addresses.insert(address.id, address);
  }

  pub async fn seed_cart(&self, user_id: Uuid, lines: Vec<CartLine>) {
    self.state.lock().await.carts.insert(user_id, lines);
  }

  /// Applies a catalog edit, the way an admin product update would.
  pub async fn edit_product(&self, product_id: Uuid, edit: impl FnOnce(&mut Product)) -> bool {
    let mut state = self.state.lock().await;
    match state.products.get_mut(&product_id) {
      Some(product) => {
        edit(product);
        product.updated_at = Utc::now();
        true
      }
      None => false,
    }
  }

  pub async fn remove_product(&self, product_id: Uuid) -> bool {
    self.state.lock().await.products.remove(&product_id).is_some()
  }

  /// Moves an order's status directly, bypassing the lifecycle rules. Used to
  /// stage fixtures such as a delivered or aged order.
  pub async fn edit_order(&self, order_id: Uuid, edit: impl FnOnce(&mut Order)) -> bool {
    let mut state = self.state.lock().await;
    match state.orders.iter_mut().find(|o| o.id == order_id) {
      Some(order) => {
        edit(order);
        true
      }
      None => false,
    }
  }

  pub async fn stock(&self, product_id: Uuid) -> Option<i32> {
    self.state.lock().await.products.get(&product_id).map(|p| p.available_quantity)
  }

  pub async fn cart(&self, user_id: Uuid) -> Option<Vec<CartLine>> {
    self.state.lock().await.carts.get(&user_id).cloned()
  }

  pub async fn order(&self, order_id: Uuid) -> Option<Order> {
    self.state.lock().await.orders.iter().find(|o| o.id == order_id).cloned()
  }

  pub async fn order_count(&self) -> usize {
    self.state.lock().await.orders.len()
  }
}

#[async_trait]
impl Transactor for MemoryStore {
  type Tx = MemoryTx;
  type Error = AppError;

  async fn begin(&self) -> Result<MemoryTx> {
    let guard = Arc::clone(&self.state).lock_owned().await;
    let working = guard.clone();
    Ok(MemoryTx { guard, working })
  }

  async fn commit(&self, tx: MemoryTx) -> Result<()> {
    let MemoryTx { mut guard, working } = tx;
    *guard = working;
    debug!("Memory transaction committed.");
    Ok(())
  }

  async fn rollback(&self, tx: MemoryTx) -> Result<()> {
    drop(tx);
    debug!("Memory transaction rolled back.");
    Ok(())
  }
}

#[async_trait]
impl CartStore for MemoryStore {
  async fn cart_lines(&self, tx: &mut MemoryTx, user_id: Uuid) -> Result<Vec<CartLine>> {
    Ok(tx.working.carts.get(&user_id).cloned().unwrap_or_default())
  }

  async fn put_cart_line(&self, tx: &mut MemoryTx, user_id: Uuid, line: CartLine) -> Result<()> {
    if line.quantity < 1 {
      return Err(AppError::Validation("cart quantities must be at least 1".to_string()));
    }
    let lines = tx.working.carts.entry(user_id).or_default();
    match lines.iter_mut().find(|l| l.product_id == line.product_id) {
      Some(existing) => existing.quantity = line.quantity,
      None => lines.push(line),
    }
    Ok(())
  }

  async fn remove_cart_line(&self, tx: &mut MemoryTx, user_id: Uuid, product_id: Uuid) -> Result<bool> {
    let Some(lines) = tx.working.carts.get_mut(&user_id) else {
      return Ok(false);
    };
    let before = lines.len();
    lines.retain(|l| l.product_id != product_id);
    Ok(lines.len() != before)
  }

  async fn clear_cart(&self, tx: &mut MemoryTx, user_id: Uuid) -> Result<()> {
    self.check(FailPoint::ClearCart)?;
    if let Some(lines) = tx.working.carts.get_mut(&user_id) {
      lines.clear();
    }
    Ok(())
  }
}

#[async_trait]
impl InventoryStore for MemoryStore {
  async fn products_for_checkout(&self, tx: &mut MemoryTx, product_ids: &[Uuid]) -> Result<Vec<CheckoutProduct>> {
    Ok(
      product_ids
        .iter()
        .filter_map(|id| tx.working.products.get(id))
        .map(CheckoutProduct::from)
        .collect(),
    )
  }

  async fn try_decrement_stock(&self, tx: &mut MemoryTx, product_id: Uuid, quantity: i32) -> Result<bool> {
    self.check(FailPoint::DecrementStock)?;
    match tx.working.products.get_mut(&product_id) {
      Some(p) if p.available_quantity >= quantity => {
        p.available_quantity -= quantity;
        p.updated_at = Utc::now();
        Ok(true)
      }
      _ => Ok(false),
    }
  }

  async fn increment_stock(&self, tx: &mut MemoryTx, product_id: Uuid, quantity: i32) -> Result<bool> {
    self.check(FailPoint::IncrementStock)?;
    match tx.working.products.get_mut(&product_id) {
      Some(p) => {
        p.available_quantity += quantity;
        p.updated_at = Utc::now();
        Ok(true)
      }
      None => Ok(false),
    }
  }
}

#[async_trait]
impl AddressBook for MemoryStore {
  async fn find_address(&self, tx: &mut MemoryTx, user_id: Uuid, address_id: Uuid) -> Result<Option<Address>> {
    Ok(
      tx.working
        .addresses
        .get(&address_id)
        .filter(|a| a.user_id == user_id)
        .cloned(),
    )
  }
}

#[async_trait]
impl OrderLedger for MemoryStore {
  async fn insert_order(&self, tx: &mut MemoryTx, order: &Order) -> Result<Uuid> {
    self.check(FailPoint::InsertOrder)?;
    if let Some(reference) = &order.transaction_ref {
      if tx
        .working
        .orders
        .iter()
        .any(|o| o.transaction_ref.as_deref() == Some(reference.as_str()))
      {
        return Err(AppError::DuplicatePayment(reference.clone()));
      }
    }
    tx.working.orders.push(order.clone());
    Ok(order.id)
  }

  async fn order_for_update(&self, tx: &mut MemoryTx, order_id: Uuid) -> Result<Option<Order>> {
    Ok(tx.working.orders.iter().find(|o| o.id == order_id).cloned())
  }

  async fn order_by_transaction_ref(&self, tx: &mut MemoryTx, transaction_ref: &str) -> Result<Option<Order>> {
    Ok(
      tx.working
        .orders
        .iter()
        .find(|o| o.transaction_ref.as_deref() == Some(transaction_ref))
        .cloned(),
    )
  }

  async fn update_order_status(&self, tx: &mut MemoryTx, order_id: Uuid, change: &StatusChange) -> Result<Order> {
    self.check(FailPoint::UpdateOrderStatus)?;
    let order = tx
      .working
      .orders
      .iter_mut()
      .find(|o| o.id == order_id)
      .ok_or(AppError::OrderNotFound(order_id))?;
    order.status = change.status;
    if let Some(reason) = &change.return_reason {
      order.return_reason = Some(reason.clone());
    }
    order.updated_at = Utc::now();
    Ok(order.clone())
  }

  async fn orders_for_user(&self, tx: &mut MemoryTx, user_id: Uuid) -> Result<Vec<Order>> {
    Ok(
      tx.working
        .orders
        .iter()
        .rev()
        .filter(|o| o.user_id == user_id)
        .cloned()
        .collect(),
    )
  }

  async fn all_orders(&self, tx: &mut MemoryTx) -> Result<Vec<Order>> {
    Ok(tx.working.orders.iter().rev().cloned().collect())
  }
}

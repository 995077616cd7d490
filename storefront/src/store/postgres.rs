// storefront/src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pipeline::Transactor;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{AddressBook, CartStore, InventoryStore, OrderLedger};
use crate::errors::{AppError, Result};
use crate::models::{
  Address, CartLine, CheckoutProduct, Order, OrderCharges, OrderItem, ShippingAddress, StatusChange,
};

pub type PgTx = Transaction<'static, Postgres>;

const ORDER_COLUMNS: &str = "id, user_id, order_items, shipping_address, charges, total_amount_cents, currency, \
   payment_method, payment_status, transaction_ref, status, return_reason, created_at, updated_at";

#[derive(Clone)]
pub struct PgStore {
  pool: PgPool,
}

impl PgStore {
  pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
    let pool = PgPoolOptions::new()
      .max_connections(max_connections)
      .connect(database_url)
      .await?;
    info!(max_connections, "Connected to Postgres.");
    Ok(Self { pool })
  }

  pub fn from_pool(pool: PgPool) -> Self {
    Self { pool }
  }

  pub async fn migrate(&self) -> Result<()> {
    sqlx::migrate!("./migrations").run(&self.pool).await?;
    info!("Database migrations applied.");
    Ok(())
  }
}

#[derive(FromRow)]
struct OrderRow {
  id: Uuid,
  user_id: Uuid,
  order_items: Json<Vec<OrderItem>>,
  shipping_address: Json<ShippingAddress>,
  charges: Json<OrderCharges>,
  total_amount_cents: i64,
  currency: String,
  payment_method: String,
  payment_status: String,
  transaction_ref: Option<String>,
  status: String,
  return_reason: Option<String>,
  created_at: DateTime<Utc>,
  updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
  type Error = AppError;

  fn try_from(row: OrderRow) -> Result<Self> {
    Ok(Order {
      id: row.id,
      user_id: row.user_id,
      order_items: row.order_items.0,
      shipping_address: row.shipping_address.0,
      charges: row.charges.0,
      total_amount_cents: row.total_amount_cents,
      currency: row.currency,
      payment_method: row.payment_method.parse()?,
      payment_status: row.payment_status,
      transaction_ref: row.transaction_ref,
      status: row
        .status
        .parse()
        .map_err(|_| AppError::Storage(format!("order {} has unknown status '{}'", row.id, row.status)))?,
      return_reason: row.return_reason,
      created_at: row.created_at,
      updated_at: row.updated_at,
    })
  }
}

fn into_orders(rows: Vec<OrderRow>) -> Result<Vec<Order>> {
  rows.into_iter().map(Order::try_from).collect()
}

#[async_trait]
impl Transactor for PgStore {
  type Tx = PgTx;
  type Error = AppError;

  async fn begin(&self) -> Result<PgTx> {
    Ok(self.pool.begin().await?)
  }

  async fn commit(&self, tx: PgTx) -> Result<()> {
    Ok(tx.commit().await?)
  }

  async fn rollback(&self, tx: PgTx) -> Result<()> {
    Ok(tx.rollback().await?)
  }
}

#[async_trait]
impl CartStore for PgStore {
  #[instrument(name = "pg::cart_lines", skip(self, tx), err)]
  async fn cart_lines(&self, tx: &mut PgTx, user_id: Uuid) -> Result<Vec<CartLine>> {
    // Serializes concurrent checkouts of the same cart.
    sqlx::query("SELECT user_id FROM carts WHERE user_id = $1 FOR UPDATE")
      .bind(user_id)
      .fetch_optional(&mut **tx)
      .await?;
    let lines = sqlx::query_as::<_, CartLine>(
      "SELECT product_id, quantity FROM cart_items WHERE user_id = $1 ORDER BY id",
    )
    .bind(user_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(lines)
  }

  async fn put_cart_line(&self, tx: &mut PgTx, user_id: Uuid, line: CartLine) -> Result<()> {
    sqlx::query("INSERT INTO carts (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
      .bind(user_id)
      .execute(&mut **tx)
      .await?;
    sqlx::query(
      "INSERT INTO cart_items (user_id, product_id, quantity) VALUES ($1, $2, $3) \
       ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity",
    )
    .bind(user_id)
    .bind(line.product_id)
    .bind(line.quantity)
    .execute(&mut **tx)
    .await?;
    Ok(())
  }

  async fn remove_cart_line(&self, tx: &mut PgTx, user_id: Uuid, product_id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM cart_items WHERE user_id = $1 AND product_id = $2")
      .bind(user_id)
      .bind(product_id)
      .execute(&mut **tx)
      .await?;
    Ok(result.rows_affected() > 0)
  }

  async fn clear_cart(&self, tx: &mut PgTx, user_id: Uuid) -> Result<()> {
    sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
      .bind(user_id)
      .execute(&mut **tx)
      .await?;
    Ok(())
  }
}

#[async_trait]
impl InventoryStore for PgStore {
  async fn products_for_checkout(&self, tx: &mut PgTx, product_ids: &[Uuid]) -> Result<Vec<CheckoutProduct>> {
    // Row locks are taken in id order so two checkouts cannot deadlock.
    let products = sqlx::query_as::<_, CheckoutProduct>(
      "SELECT id, name, price_cents, image, available_quantity FROM products \
       WHERE id = ANY($1) ORDER BY id FOR UPDATE",
    )
    .bind(product_ids)
    .fetch_all(&mut **tx)
    .await?;
    Ok(products)
  }

  async fn try_decrement_stock(&self, tx: &mut PgTx, product_id: Uuid, quantity: i32) -> Result<bool> {
    let result = sqlx::query(
      "UPDATE products SET available_quantity = available_quantity - $1, updated_at = now() \
       WHERE id = $2 AND available_quantity >= $1",
    )
    .bind(quantity)
    .bind(product_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() == 1)
  }

  async fn increment_stock(&self, tx: &mut PgTx, product_id: Uuid, quantity: i32) -> Result<bool> {
    let result = sqlx::query(
      "UPDATE products SET available_quantity = available_quantity + $1, updated_at = now() WHERE id = $2",
    )
    .bind(quantity)
    .bind(product_id)
    .execute(&mut **tx)
    .await?;
    Ok(result.rows_affected() == 1)
  }
}

#[async_trait]
impl AddressBook for PgStore {
  async fn find_address(&self, tx: &mut PgTx, user_id: Uuid, address_id: Uuid) -> Result<Option<Address>> {
    let address = sqlx::query_as::<_, Address>(
      "SELECT id, user_id, full_name, phone, line1, line2, city, state, postal_code, country \
       FROM addresses WHERE id = $1 AND user_id = $2",
    )
    .bind(address_id)
    .bind(user_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(address)
  }
}

#[async_trait]
impl OrderLedger for PgStore {
  async fn insert_order(&self, tx: &mut PgTx, order: &Order) -> Result<Uuid> {
    let inserted = sqlx::query(&format!(
      "INSERT INTO orders ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
      ORDER_COLUMNS
    ))
    .bind(order.id)
    .bind(order.user_id)
    .bind(Json(&order.order_items))
    .bind(Json(&order.shipping_address))
    .bind(Json(&order.charges))
    .bind(order.total_amount_cents)
    .bind(&order.currency)
    .bind(order.payment_method.as_str())
    .bind(&order.payment_status)
    .bind(&order.transaction_ref)
    .bind(order.status.as_str())
    .bind(&order.return_reason)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut **tx)
    .await;

    match inserted {
      Ok(_) => Ok(order.id),
      Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() && order.transaction_ref.is_some() => {
        Err(AppError::DuplicatePayment(order.transaction_ref.clone().unwrap_or_default()))
      }
      Err(e) => Err(e.into()),
    }
  }

  async fn order_for_update(&self, tx: &mut PgTx, order_id: Uuid) -> Result<Option<Order>> {
    let row = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM orders WHERE id = $1 FOR UPDATE", ORDER_COLUMNS))
      .bind(order_id)
      .fetch_optional(&mut **tx)
      .await?;
    row.map(Order::try_from).transpose()
  }

  async fn order_by_transaction_ref(&self, tx: &mut PgTx, transaction_ref: &str) -> Result<Option<Order>> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
      "SELECT {} FROM orders WHERE transaction_ref = $1",
      ORDER_COLUMNS
    ))
    .bind(transaction_ref)
    .fetch_optional(&mut **tx)
    .await?;
    row.map(Order::try_from).transpose()
  }

  async fn update_order_status(&self, tx: &mut PgTx, order_id: Uuid, change: &StatusChange) -> Result<Order> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
      "UPDATE orders SET status = $2, return_reason = COALESCE($3, return_reason), updated_at = now() \
       WHERE id = $1 RETURNING {}",
      ORDER_COLUMNS
    ))
    .bind(order_id)
    .bind(change.status.as_str())
    .bind(&change.return_reason)
    .fetch_optional(&mut **tx)
    .await?;
    row.ok_or(AppError::OrderNotFound(order_id))?.try_into()
  }

  async fn orders_for_user(&self, tx: &mut PgTx, user_id: Uuid) -> Result<Vec<Order>> {
    let rows = sqlx::query_as::<_, OrderRow>(&format!(
      "SELECT {} FROM orders WHERE user_id = $1 ORDER BY created_at DESC",
      ORDER_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(&mut **tx)
    .await?;
    into_orders(rows)
  }

  async fn all_orders(&self, tx: &mut PgTx) -> Result<Vec<Order>> {
    let rows = sqlx::query_as::<_, OrderRow>(&format!("SELECT {} FROM orders ORDER BY created_at DESC", ORDER_COLUMNS))
      .fetch_all(&mut **tx)
      .await?;
    into_orders(rows)
  }
}

// storefront/src/models/product.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Catalog record. The catalog owns it; the order core only reads the price
/// and moves `available_quantity`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
  pub id: Uuid,
  pub name: String,
  pub description: Option<String>,
  pub price_cents: i64,
  pub image: Option<String>,
  pub available_quantity: i32,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// The slice of a product that checkout needs, read under the transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutProduct {
  pub id: Uuid,
  pub name: String,
  pub price_cents: i64,
  pub image: Option<String>,
  pub available_quantity: i32,
}

impl From<&Product> for CheckoutProduct {
  fn from(p: &Product) -> Self {
    CheckoutProduct {
      id: p.id,
      name: p.name.clone(),
      price_cents: p.price_cents,
      image: p.image.clone(),
      available_quantity: p.available_quantity,
    }
  }
}

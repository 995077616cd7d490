// storefront/src/models/address.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A saved address in a user's address book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Address {
  pub id: Uuid,
  pub user_id: Uuid,
  pub full_name: String,
  pub phone: String,
  pub line1: String,
  pub line2: Option<String>,
  pub city: String,
  pub state: String,
  pub postal_code: String,
  pub country: String,
}

/// Copy of an address embedded in an order. Later edits to the address book
/// never reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
  pub full_name: String,
  pub phone: String,
  pub line1: String,
  pub line2: Option<String>,
  pub city: String,
  pub state: String,
  pub postal_code: String,
  pub country: String,
}

impl From<&Address> for ShippingAddress {
  fn from(a: &Address) -> Self {
    ShippingAddress {
      full_name: a.full_name.clone(),
      phone: a.phone.clone(),
      line1: a.line1.clone(),
      line2: a.line2.clone(),
      city: a.city.clone(),
      state: a.state.clone(),
      postal_code: a.postal_code.clone(),
      country: a.country.clone(),
    }
  }
}

// storefront/src/models/cart.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::CheckoutProduct;

/// One line of a user's cart. A cart never holds two lines for the same
/// product, and `quantity` is always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
  pub product_id: Uuid,
  pub quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineView {
  pub product: CheckoutProduct,
  pub quantity: i32,
  pub line_total_cents: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
  pub lines: Vec<CartLineView>,
  pub subtotal_cents: i64,
}

impl CartView {
  /// Joins cart lines with their products. Lines whose product has
  /// disappeared from the catalog are left out.
  pub fn assemble(lines: &[CartLine], products: &[CheckoutProduct]) -> Self {
    let lines: Vec<CartLineView> = lines
      .iter()
      .filter_map(|line| {
        products.iter().find(|p| p.id == line.product_id).map(|p| CartLineView {
          product: p.clone(),
          quantity: line.quantity,
          line_total_cents: p.price_cents * i64::from(line.quantity),
        })
      })
      .collect();
    let subtotal_cents = lines.iter().map(|l| l.line_total_cents).sum();
    CartView { lines, subtotal_cents }
  }

  pub fn is_empty(&self) -> bool {
    self.lines.is_empty()
  }
}

// storefront/src/models/order.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::ShippingAddress;
use crate::errors::AppError;

pub const PAYMENT_STATUS_PENDING_COD: &str = "Pending (COD)";
pub const PAYMENT_STATUS_PAID: &str = "Paid";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
  Processing,
  Shipped,
  Delivered,
  Cancelled,
  #[serde(rename = "Return Requested")]
  ReturnRequested,
}

impl OrderStatus {
  pub const ALL: [OrderStatus; 5] = [
    OrderStatus::Processing,
    OrderStatus::Shipped,
    OrderStatus::Delivered,
    OrderStatus::Cancelled,
    OrderStatus::ReturnRequested,
  ];

  pub fn as_str(&self) -> &'static str {
    match self {
      OrderStatus::Processing => "Processing",
      OrderStatus::Shipped => "Shipped",
      OrderStatus::Delivered => "Delivered",
      OrderStatus::Cancelled => "Cancelled",
      OrderStatus::ReturnRequested => "Return Requested",
    }
  }

  /// Customers may cancel only before the order ships.
  pub fn is_cancellable(&self) -> bool {
    matches!(self, OrderStatus::Processing)
  }

  pub fn is_returnable(&self) -> bool {
    matches!(self, OrderStatus::Delivered)
  }

  /// A cancelled order has already given its stock back. Moving it to any
  /// other status puts it on a path where it can be cancelled and restocked
  /// again.
  pub fn reopens_restocked_order(&self, to: OrderStatus) -> bool {
    *self == OrderStatus::Cancelled && to != OrderStatus::Cancelled
  }
}

impl fmt::Display for OrderStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for OrderStatus {
  type Err = AppError;

  /// Case-insensitive; spaces, underscores and hyphens are ignored so that
  /// "Return Requested", "return_requested" and "RETURNREQUESTED" all parse.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalized: String = s
      .chars()
      .filter(|c| !matches!(c, ' ' | '_' | '-'))
      .map(|c| c.to_ascii_lowercase())
      .collect();
    OrderStatus::ALL
      .into_iter()
      .find(|status| status.as_str().replace(' ', "").to_ascii_lowercase() == normalized)
      .ok_or_else(|| AppError::UnknownStatus(s.to_string()))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
  #[serde(rename = "COD")]
  Cod,
  Gateway,
}

impl PaymentMethod {
  pub fn as_str(&self) -> &'static str {
    match self {
      PaymentMethod::Cod => "COD",
      PaymentMethod::Gateway => "Gateway",
    }
  }
}

impl fmt::Display for PaymentMethod {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for PaymentMethod {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "COD" => Ok(PaymentMethod::Cod),
      "Gateway" => Ok(PaymentMethod::Gateway),
      other => Err(AppError::Storage(format!("unknown payment method '{}'", other))),
    }
  }
}

/// Line item frozen at placement time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
  pub product_id: Uuid,
  pub name: String,
  pub quantity: i32,
  pub unit_price_cents: i64,
  pub image: Option<String>,
}

impl OrderItem {
  pub fn line_total_cents(&self) -> i64 {
    self.unit_price_cents * i64::from(self.quantity)
  }
}

/// How `total_cents` was reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCharges {
  pub subtotal_cents: i64,
  pub cod_fee_cents: i64,
  pub tax_cents: i64,
  pub total_cents: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
  pub id: Uuid,
  pub user_id: Uuid,
  pub order_items: Vec<OrderItem>,
  pub shipping_address: ShippingAddress,
  pub charges: OrderCharges,
  pub total_amount_cents: i64,
  pub currency: String,
  pub payment_method: PaymentMethod,
  pub payment_status: String,
  /// Gateway payment handle for prepaid orders.
  pub transaction_ref: Option<String>,
  pub status: OrderStatus,
  pub return_reason: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// The only fields of an order that change after it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
  pub status: OrderStatus,
  pub return_reason: Option<String>,
}

impl StatusChange {
  pub fn to(status: OrderStatus) -> Self {
    StatusChange {
      status,
      return_reason: None,
    }
  }
}

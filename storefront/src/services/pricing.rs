// storefront/src/services/pricing.rs

//! Order totals. All amounts are integer minor units.

use crate::models::{OrderCharges, OrderItem, PaymentMethod};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricingPolicy {
  /// Flat handling fee added to cash-on-delivery orders.
  pub cod_fee_cents: i64,
  /// Tax rate in basis points (1 bp = 0.01%).
  pub tax_rate_bps: i64,
}

impl PricingPolicy {
  pub fn quote(&self, items: &[OrderItem], method: PaymentMethod) -> OrderCharges {
    let subtotal_cents: i64 = items.iter().map(OrderItem::line_total_cents).sum();
    let tax_cents = div_round_half_up(subtotal_cents * self.tax_rate_bps, 10_000);
    let cod_fee_cents = match method {
      PaymentMethod::Cod => self.cod_fee_cents,
      PaymentMethod::Gateway => 0,
    };

    let raw_total = subtotal_cents + tax_cents + cod_fee_cents;
    // Gateways charge whole currency units.
    let total_cents = match method {
      PaymentMethod::Cod => raw_total,
      PaymentMethod::Gateway => div_round_half_up(raw_total, 100) * 100,
    };

    OrderCharges {
      subtotal_cents,
      cod_fee_cents,
      tax_cents,
      total_cents,
    }
  }
}

/// Non-negative inputs only.
fn div_round_half_up(numerator: i64, denominator: i64) -> i64 {
  (numerator + denominator / 2) / denominator
}

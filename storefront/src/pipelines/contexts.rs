// storefront/src/pipelines/contexts.rs

//! Data carried through each pipeline run. Handlers receive these wrapped in
//! `pipeline::ContextData`.
//!
//! Every context carries its own `TxSlot`; `Pipeline::run_atomic` fills it
//! for the duration of the run.

use pipeline::{Transactional, TxSlot};
use uuid::Uuid;

use crate::models::{
  CartLine, CartView, CheckoutProduct, Order, OrderCharges, OrderItem, OrderStatus, PaymentMethod, ShippingAddress,
};
use crate::services::checkout_service::VerifiedPayment;
use crate::state::AppState;
use crate::store::Storefront;

// --- Checkout ---

pub struct CheckoutCtxData<S: Storefront> {
  pub app_state: AppState<S>,
  pub tx: TxSlot<S::Tx>,

  pub user_id: Uuid,
  pub delivery_address_id: Uuid,
  pub payment_method: PaymentMethod,
  /// Present only for gateway orders whose confirmation has been verified.
  pub confirmed_payment: Option<VerifiedPayment>,

  pub cart_lines: Vec<CartLine>,
  pub products: Vec<CheckoutProduct>,
  pub shipping_address: Option<ShippingAddress>,
  pub order_items: Vec<OrderItem>,
  pub charges: Option<OrderCharges>,
  pub order: Option<Order>,
}

impl<S: Storefront> CheckoutCtxData<S> {
  pub fn new(
    app_state: AppState<S>,
    user_id: Uuid,
    delivery_address_id: Uuid,
    payment_method: PaymentMethod,
    confirmed_payment: Option<VerifiedPayment>,
  ) -> Self {
    Self {
      app_state,
      tx: TxSlot::new(),
      user_id,
      delivery_address_id,
      payment_method,
      confirmed_payment,
      cart_lines: Vec::new(),
      products: Vec::new(),
      shipping_address: None,
      order_items: Vec::new(),
      charges: None,
      order: None,
    }
  }
}

impl<S: Storefront> Transactional for CheckoutCtxData<S> {
  type Tx = S::Tx;

  fn tx_slot(&self) -> &TxSlot<S::Tx> {
    &self.tx
  }
}

// --- Order lifecycle ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
  Customer(Uuid),
  /// Operational override; ownership is not checked.
  Admin,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleAction {
  Cancel,
  RequestReturn { reason: String },
  SetStatus(OrderStatus),
}

pub struct OrderLifecycleCtxData<S: Storefront> {
  pub app_state: AppState<S>,
  pub tx: TxSlot<S::Tx>,

  pub order_id: Uuid,
  pub actor: Actor,
  pub action: LifecycleAction,

  pub order: Option<Order>,
  pub updated_order: Option<Order>,
}

impl<S: Storefront> OrderLifecycleCtxData<S> {
  pub fn new(app_state: AppState<S>, order_id: Uuid, actor: Actor, action: LifecycleAction) -> Self {
    Self {
      app_state,
      tx: TxSlot::new(),
      order_id,
      actor,
      action,
      order: None,
      updated_order: None,
    }
  }
}

impl<S: Storefront> Transactional for OrderLifecycleCtxData<S> {
  type Tx = S::Tx;

  fn tx_slot(&self) -> &TxSlot<S::Tx> {
    &self.tx
  }
}

// --- Cart ---

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CartOp {
  View,
  /// Adds to whatever quantity is already in the cart.
  Add { product_id: Uuid, quantity: i32 },
  /// Sets the line quantity; 0 removes the line.
  Set { product_id: Uuid, quantity: i32 },
  Remove { product_id: Uuid },
}

impl CartOp {
  pub fn product_id(&self) -> Option<Uuid> {
    match self {
      CartOp::View => None,
      CartOp::Add { product_id, .. } | CartOp::Set { product_id, .. } | CartOp::Remove { product_id } => {
        Some(*product_id)
      }
    }
  }
}

pub struct CartCtxData<S: Storefront> {
  pub app_state: AppState<S>,
  pub tx: TxSlot<S::Tx>,

  pub user_id: Uuid,
  pub op: CartOp,

  pub lines: Vec<CartLine>,
  /// Quantity the touched line ends up with; 0 means the line goes away.
  pub target_quantity: Option<i32>,
  pub product: Option<CheckoutProduct>,
  pub cart: Option<CartView>,
}

impl<S: Storefront> CartCtxData<S> {
  pub fn new(app_state: AppState<S>, user_id: Uuid, op: CartOp) -> Self {
    Self {
      app_state,
      tx: TxSlot::new(),
      user_id,
      op,
      lines: Vec::new(),
      target_quantity: None,
      product: None,
      cart: None,
    }
  }
}

impl<S: Storefront> Transactional for CartCtxData<S> {
  type Tx = S::Tx;

  fn tx_slot(&self) -> &TxSlot<S::Tx> {
    &self.tx
  }
}

// storefront/src/models/mod.rs

//! Records read and written by the order core.

pub mod address;
pub mod cart;
pub mod order;
pub mod product;

pub use address::{Address, ShippingAddress};
pub use cart::{CartLine, CartLineView, CartView};
pub use order::{Order, OrderCharges, OrderItem, OrderStatus, PaymentMethod, StatusChange};
pub use product::{CheckoutProduct, Product};

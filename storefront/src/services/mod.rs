// storefront/src/services/mod.rs

pub mod cart_service;
pub mod checkout_service;
pub mod order_lifecycle_service;
pub mod payment_gateway;
pub mod pricing;

pub use cart_service::CartService;
pub use checkout_service::{CheckoutPayment, CheckoutService, GatewayCheckout, PlaceOrder, VerifiedPayment};
pub use order_lifecycle_service::{LifecyclePolicy, OrderLifecycleService};
pub use payment_gateway::{HmacPaymentGateway, PaymentGateway, PaymentIntent};
pub use pricing::PricingPolicy;

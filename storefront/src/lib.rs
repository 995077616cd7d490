// storefront/src/lib.rs

//! Storefront order core: cart edits, checkout, payment confirmation and the
//! order status lifecycle, each run as one transaction over a `Storefront`
//! backend.

pub mod config;
pub mod errors;
pub mod models;
pub mod pipelines;
pub mod services;
pub mod state;
pub mod store;
pub mod web;

pub use errors::{AppError, Result};
pub use state::AppState;

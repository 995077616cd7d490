// storefront/src/errors.rs

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use pipeline::PipelineError;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::OrderStatus;

/// Coarse classification every `AppError` falls into. Drives the HTTP status
/// and lets callers branch on the category without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Validation,
  NotFound,
  Conflict,
  Authentication,
  Authorization,
  InvalidTransition,
  ExternalService,
  Persistence,
  Internal,
}

impl ErrorKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ErrorKind::Validation => "validation",
      ErrorKind::NotFound => "not_found",
      ErrorKind::Conflict => "conflict",
      ErrorKind::Authentication => "authentication",
      ErrorKind::Authorization => "authorization",
      ErrorKind::InvalidTransition => "invalid_transition",
      ErrorKind::ExternalService => "external_service",
      ErrorKind::Persistence => "persistence",
      ErrorKind::Internal => "internal",
    }
  }
}

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Authentication Failed: {0}")]
  Auth(String),

  #[error("Forbidden: {0}")]
  Forbidden(String),

  #[error("Cart is empty")]
  EmptyCart,

  #[error("Delivery address {0} not found")]
  AddressNotFound(Uuid),

  #[error("Product {0} not found")]
  ProductNotFound(Uuid),

  #[error("Product {0} is not in the cart")]
  CartItemNotFound(Uuid),

  #[error("Order {0} not found")]
  OrderNotFound(Uuid),

  #[error("Insufficient stock for {product_name}")]
  InsufficientStock { product_name: String },

  #[error("Order {order_id} does not belong to the requesting user")]
  NotOwner { order_id: Uuid },

  #[error("Cannot {action} an order that is {from}")]
  InvalidTransition { from: OrderStatus, action: &'static str },

  #[error("The cancellation window for order {0} has elapsed")]
  CancellationWindowElapsed(Uuid),

  #[error("A return reason is required")]
  ReasonRequired,

  #[error("Unknown order status '{0}'")]
  UnknownStatus(String),

  #[error("Payment {0} has already been used for an order")]
  DuplicatePayment(String),

  #[error("Payment amount mismatch: intent was {expected_cents}, order totals {actual_cents}")]
  PaymentAmountMismatch { expected_cents: i64, actual_cents: i64 },

  #[error("Payment confirmation signature is invalid")]
  PaymentSignatureInvalid,

  #[error("Payment Gateway Error: {0}")]
  Gateway(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Database(#[from] sqlx::Error),

  #[error("Migration Error: {0}")]
  Migration(#[from] sqlx::migrate::MigrateError),

  #[error("Storage Error: {0}")]
  Storage(String),

  #[error("Transaction aborted: {0}")]
  TransactionAborted(String),

  #[error("Workflow Error: {source}")]
  Workflow { source: PipelineError },

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

impl From<PipelineError> for AppError {
  fn from(source: PipelineError) -> Self {
    match source {
      PipelineError::TimedOut { .. } => AppError::TransactionAborted(source.to_string()),
      source => AppError::Workflow { source },
    }
  }
}

impl AppError {
  pub fn kind(&self) -> ErrorKind {
    match self {
      AppError::Validation(_) | AppError::EmptyCart | AppError::ReasonRequired | AppError::UnknownStatus(_) => {
        ErrorKind::Validation
      }
      AppError::Auth(_) => ErrorKind::Authentication,
      AppError::AddressNotFound(_)
      | AppError::ProductNotFound(_)
      | AppError::CartItemNotFound(_)
      | AppError::OrderNotFound(_) => ErrorKind::NotFound,
      AppError::InsufficientStock { .. } | AppError::DuplicatePayment(_) | AppError::PaymentAmountMismatch { .. } => {
        ErrorKind::Conflict
      }
      AppError::NotOwner { .. } | AppError::Forbidden(_) => ErrorKind::Authorization,
      AppError::InvalidTransition { .. } | AppError::CancellationWindowElapsed(_) => ErrorKind::InvalidTransition,
      AppError::PaymentSignatureInvalid | AppError::Gateway(_) => ErrorKind::ExternalService,
      AppError::Database(_) | AppError::Migration(_) | AppError::Storage(_) | AppError::TransactionAborted(_) => {
        ErrorKind::Persistence
      }
      AppError::Config(_) | AppError::Workflow { .. } | AppError::Internal(_) => ErrorKind::Internal,
    }
  }

  /// Stable machine-readable code for clients.
  pub fn code(&self) -> &'static str {
    match self {
      AppError::Validation(_) => "VALIDATION_FAILED",
      AppError::Auth(_) => "UNAUTHENTICATED",
      AppError::Forbidden(_) => "FORBIDDEN",
      AppError::EmptyCart => "EMPTY_CART",
      AppError::AddressNotFound(_) => "ADDRESS_NOT_FOUND",
      AppError::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
      AppError::CartItemNotFound(_) => "CART_ITEM_NOT_FOUND",
      AppError::OrderNotFound(_) => "ORDER_NOT_FOUND",
      AppError::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
      AppError::NotOwner { .. } => "NOT_OWNER",
      AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
      AppError::CancellationWindowElapsed(_) => "CANCELLATION_WINDOW_ELAPSED",
      AppError::ReasonRequired => "REASON_REQUIRED",
      AppError::UnknownStatus(_) => "UNKNOWN_STATUS",
      AppError::DuplicatePayment(_) => "DUPLICATE_PAYMENT",
      AppError::PaymentAmountMismatch { .. } => "PAYMENT_AMOUNT_MISMATCH",
      AppError::PaymentSignatureInvalid => "PAYMENT_SIGNATURE_INVALID",
      AppError::Gateway(_) => "PAYMENT_GATEWAY_ERROR",
      AppError::Config(_) => "CONFIGURATION_ERROR",
      AppError::Database(_) | AppError::Migration(_) | AppError::Storage(_) => "PERSISTENCE_ERROR",
      AppError::TransactionAborted(_) => "TRANSACTION_ABORTED",
      AppError::Workflow { .. } => "WORKFLOW_ERROR",
      AppError::Internal(_) => "INTERNAL_ERROR",
    }
  }

  /// Message safe to show to clients. Infrastructure details stay in the logs.
  fn public_message(&self) -> String {
    match self.kind() {
      ErrorKind::Persistence => "The operation could not be completed and was rolled back.".to_string(),
      ErrorKind::Internal => "An internal error occurred.".to_string(),
      _ => self.to_string(),
    }
  }
}

impl ResponseError for AppError {
  fn status_code(&self) -> StatusCode {
    match self {
      AppError::PaymentSignatureInvalid => StatusCode::PAYMENT_REQUIRED,
      AppError::Gateway(_) => StatusCode::BAD_GATEWAY,
      _ => match self.kind() {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict | ErrorKind::InvalidTransition => StatusCode::CONFLICT,
        ErrorKind::ExternalService => StatusCode::BAD_GATEWAY,
        ErrorKind::Persistence | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }

  fn error_response(&self) -> HttpResponse {
    let status = self.status_code();
    if status.is_server_error() {
      tracing::error!(application_error = %self, code = self.code(), "Responding with error");
    } else {
      tracing::warn!(application_error = %self, code = self.code(), "Responding with error");
    }
    HttpResponse::build(status).json(json!({
      "error": {
        "code": self.code(),
        "kind": self.kind().as_str(),
        "message": self.public_message(),
      }
    }))
  }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;

// storefront/src/config.rs

use crate::errors::{AppError, Result};
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
  Postgres,
  Memory,
}

impl FromStr for StorageBackend {
  type Err = AppError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "postgres" | "postgresql" => Ok(StorageBackend::Postgres),
      "memory" => Ok(StorageBackend::Memory),
      other => Err(AppError::Config(format!(
        "Invalid STORAGE_BACKEND '{}': expected 'postgres' or 'memory'",
        other
      ))),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
  Text,
  Json,
}

#[derive(Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,

  pub storage_backend: StorageBackend,
  pub database_url: Option<String>,
  pub database_max_connections: u32,
  pub run_migrations: bool,

  pub currency: String,
  pub cod_fee_cents: i64,
  pub tax_rate_bps: i64,
  /// Opt-in time box for customer cancellations, on top of the status rule.
  pub cancellation_window: Option<chrono::Duration>,
  pub transaction_timeout: Duration,

  pub payment_gateway_key_id: String,
  pub payment_gateway_key_secret: String,
  /// How long an unpaid payment intent stays confirmable.
  pub payment_intent_ttl: chrono::Duration,

  pub log_format: LogFormat,
}

// Secrets stay out of logs.
impl std::fmt::Debug for AppConfig {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("AppConfig")
      .field("server_host", &self.server_host)
      .field("server_port", &self.server_port)
      .field("storage_backend", &self.storage_backend)
      .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
      .field("database_max_connections", &self.database_max_connections)
      .field("run_migrations", &self.run_migrations)
      .field("currency", &self.currency)
      .field("cod_fee_cents", &self.cod_fee_cents)
      .field("tax_rate_bps", &self.tax_rate_bps)
      .field("cancellation_window", &self.cancellation_window)
      .field("transaction_timeout", &self.transaction_timeout)
      .field("payment_gateway_key_id", &self.payment_gateway_key_id)
      .field("payment_gateway_key_secret", &"[REDACTED]")
      .field("payment_intent_ttl", &self.payment_intent_ttl)
      .field("log_format", &self.log_format)
      .finish()
  }
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present
    Self::from_lookup(|name| env::var(name).ok())
  }

  /// Builds the configuration from an arbitrary variable source.
  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
    let required = |name: &str| get(name).ok_or_else(|| AppError::Config(format!("Missing environment variable '{}'", name)));

    let server_host = get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string());
    let server_port = parse_or(&get, "SERVER_PORT", 8080u16)?;

    let storage_backend = match get("STORAGE_BACKEND") {
      Some(raw) => raw.parse()?,
      None => StorageBackend::Postgres,
    };
    let database_url = get("DATABASE_URL");
    if storage_backend == StorageBackend::Postgres && database_url.is_none() {
      return Err(AppError::Config(
        "DATABASE_URL is required when STORAGE_BACKEND is 'postgres'".to_string(),
      ));
    }
    let database_max_connections = parse_or(&get, "DATABASE_MAX_CONNECTIONS", 10u32)?;
    let run_migrations = parse_or(&get, "RUN_MIGRATIONS", false)?;

    let currency = get("CURRENCY").unwrap_or_else(|| "INR".to_string());
    let cod_fee_cents = parse_or(&get, "COD_FEE_CENTS", 5000i64)?;
    let tax_rate_bps = parse_or(&get, "TAX_RATE_BPS", 0i64)?;
    if cod_fee_cents < 0 || tax_rate_bps < 0 {
      return Err(AppError::Config(
        "COD_FEE_CENTS and TAX_RATE_BPS must not be negative".to_string(),
      ));
    }

    let cancellation_window = match get("CANCELLATION_WINDOW_HOURS") {
      Some(raw) => {
        let hours = raw
          .parse::<i64>()
          .map_err(|e| AppError::Config(format!("Invalid CANCELLATION_WINDOW_HOURS: {}", e)))?;
        if hours <= 0 {
          return Err(AppError::Config("CANCELLATION_WINDOW_HOURS must be positive".to_string()));
        }
        Some(chrono::Duration::hours(hours))
      }
      None => None,
    };

    let timeout_ms = parse_or(&get, "TRANSACTION_TIMEOUT_MS", 5000u64)?;
    if timeout_ms == 0 {
      return Err(AppError::Config("TRANSACTION_TIMEOUT_MS must be positive".to_string()));
    }

    let payment_gateway_key_id = required("PAYMENT_GATEWAY_KEY_ID")?;
    let payment_gateway_key_secret = required("PAYMENT_GATEWAY_KEY_SECRET")?;
    let intent_ttl_minutes = parse_or(&get, "PAYMENT_INTENT_TTL_MINUTES", 30i64)?;
    if intent_ttl_minutes <= 0 {
      return Err(AppError::Config("PAYMENT_INTENT_TTL_MINUTES must be positive".to_string()));
    }

    let log_format = match get("LOG_FORMAT").as_deref() {
      None | Some("text") => LogFormat::Text,
      Some("json") => LogFormat::Json,
      Some(other) => return Err(AppError::Config(format!("Invalid LOG_FORMAT '{}'", other))),
    };

    Ok(Self {
      server_host,
      server_port,
      storage_backend,
      database_url,
      database_max_connections,
      run_migrations,
      currency,
      cod_fee_cents,
      tax_rate_bps,
      cancellation_window,
      transaction_timeout: Duration::from_millis(timeout_ms),
      payment_gateway_key_id,
      payment_gateway_key_secret,
      payment_intent_ttl: chrono::Duration::minutes(intent_ttl_minutes),
      log_format,
    })
  }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
  T: FromStr,
  T::Err: std::fmt::Display,
{
  match get(name) {
    Some(raw) => raw
      .parse::<T>()
      .map_err(|e| AppError::Config(format!("Invalid {}: {}", name, e))),
    None => Ok(default),
  }
}

// storefront/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use storefront::config::{AppConfig, LogFormat, StorageBackend};
use storefront::services::{HmacPaymentGateway, PaymentGateway};
use storefront::state::AppState;
use storefront::store::{MemoryStore, PgStore, Storefront};
use storefront::web::configure_app_routes;

fn init_tracing(format: LogFormat) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let builder = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_span_events(FmtSpan::CLOSE); // Log when spans close, showing duration
  match format {
    LogFormat::Json => builder.json().init(),
    LogFormat::Text => builder.init(),
  }
}

async fn run_server<S: Storefront>(store: S, config: AppConfig) -> anyhow::Result<()> {
  let gateway: Arc<dyn PaymentGateway> = Arc::new(
    HmacPaymentGateway::new(
      config.payment_gateway_key_id.clone(),
      config.payment_gateway_key_secret.clone(),
      config.currency.clone(),
    )
    .with_intent_ttl(config.payment_intent_ttl),
  );
  let server_address = format!("{}:{}", config.server_host, config.server_port);
  let app_state = AppState::new(Arc::new(store), gateway, config);

  tracing::info!("Attempting to bind server to {}...", server_address);
  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes::<S>)
  })
  .bind(&server_address)
  .with_context(|| format!("Failed to bind {}", server_address))?
  .run()
  .await
  .context("HTTP server terminated with an error")
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  let config = AppConfig::from_env().context("Failed to load application configuration")?;
  init_tracing(config.log_format);
  tracing::info!(config = ?config, "Starting storefront server...");

  match config.storage_backend {
    StorageBackend::Postgres => {
      let database_url = config
        .database_url
        .clone()
        .context("DATABASE_URL is required for the postgres backend")?;
      let store = PgStore::connect(&database_url, config.database_max_connections)
        .await
        .context("Failed to connect to the database")?;
      if config.run_migrations {
        store.migrate().await.context("Failed to run database migrations")?;
      }
      run_server(store, config).await
    }
    StorageBackend::Memory => {
      tracing::warn!("Using the in-memory store; data is lost on restart.");
      run_server(MemoryStore::new(), config).await
    }
  }
}

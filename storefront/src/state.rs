// storefront/src/state.rs

use crate::config::AppConfig;
use crate::pipelines::Pipelines;
use crate::services::order_lifecycle_service::LifecyclePolicy;
use crate::services::payment_gateway::PaymentGateway;
use crate::services::pricing::PricingPolicy;
use crate::store::Storefront;
use std::sync::Arc;

/// Shared by every request and every pipeline context.
pub struct AppState<S: Storefront> {
  pub store: Arc<S>,
  pub gateway: Arc<dyn PaymentGateway>,
  pub pipelines: Arc<Pipelines<S>>,
  pub config: Arc<AppConfig>,
}

// Manual impl: `S` itself need not be `Clone`.
impl<S: Storefront> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store: Arc::clone(&self.store),
      gateway: Arc::clone(&self.gateway),
      pipelines: Arc::clone(&self.pipelines),
      config: Arc::clone(&self.config),
    }
  }
}

impl<S: Storefront> AppState<S> {
  pub fn new(store: Arc<S>, gateway: Arc<dyn PaymentGateway>, config: AppConfig) -> Self {
    let pipelines = Arc::new(Pipelines::build());
    tracing::info!("Storefront pipelines assembled.");
    Self {
      store,
      gateway,
      pipelines,
      config: Arc::new(config),
    }
  }

  pub fn pricing(&self) -> PricingPolicy {
    PricingPolicy {
      cod_fee_cents: self.config.cod_fee_cents,
      tax_rate_bps: self.config.tax_rate_bps,
    }
  }

  pub fn lifecycle_policy(&self) -> LifecyclePolicy {
    LifecyclePolicy {
      cancellation_window: self.config.cancellation_window,
    }
  }
}

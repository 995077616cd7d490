// core/src/error.rs
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
  #[error("Step not found: {step_name}")]
  StepNotFound { step_name: String },

  #[error("Handler missing for non-optional step: {step_name}")]
  HandlerMissing { step_name: String },

  /// A handler asked for the transaction outside of `run_atomic`, or after it ended.
  #[error("No open transaction available to step handlers")]
  TransactionClosed,

  #[error("Pipeline did not finish within {timeout_ms} ms; transaction rolled back")]
  TimedOut { timeout_ms: u128 },

  #[error("Internal pipeline error: {0}")]
  Internal(String),
}

/// Small helper for callers that treat a stopped pipeline as an error of their own.
pub trait PipelineResultExt<E> {
  fn completed_or(self, on_stop: impl FnOnce() -> E) -> Result<(), E>;
}

impl<E> PipelineResultExt<E> for Result<crate::PipelineResult, E> {
  fn completed_or(self, on_stop: impl FnOnce() -> E) -> Result<(), E> {
    match self? {
      crate::PipelineResult::Completed => Ok(()),
      crate::PipelineResult::Stopped => Err(on_stop()),
    }
  }
}

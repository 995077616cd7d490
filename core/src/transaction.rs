// core/src/transaction.rs

//! Running a pipeline inside a single storage transaction.
//!
//! The engine does not know what a transaction is. A [`Transactor`] opens,
//! commits and rolls back values of its `Tx` type, and a context that
//! implements [`Transactional`] exposes a [`TxSlot`] through which step
//! handlers borrow the open transaction.

use crate::core::context_data::ContextData;
use crate::core::control::PipelineResult;
use crate::error::PipelineError;
use crate::pipeline::definition::Pipeline;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::{event, instrument, Level};

/// Exclusive borrow of the open transaction, obtained from [`TxSlot::lock`].
pub type TxGuard<'a, Tx> = MappedMutexGuard<'a, Tx>;

/// Shared holder for the transaction of one atomic run.
///
/// Empty outside of `run_atomic`. Cloning yields another handle to the same
/// slot, so handlers can copy it out of a context guard and await on it.
pub struct TxSlot<Tx>(Arc<Mutex<Option<Tx>>>);

impl<Tx: Send + 'static> TxSlot<Tx> {
  pub fn new() -> Self {
    TxSlot(Arc::new(Mutex::new(None)))
  }

  /// Borrows the open transaction, waiting for any other holder to release it.
  pub async fn lock(&self) -> Result<TxGuard<'_, Tx>, PipelineError> {
    let guard = self.0.lock().await;
    MutexGuard::try_map(guard, |slot| slot.as_mut()).map_err(|_| PipelineError::TransactionClosed)
  }

  pub async fn is_open(&self) -> bool {
    self.0.lock().await.is_some()
  }

  async fn install(&self, tx: Tx) -> Result<(), PipelineError> {
    let mut slot = self.0.lock().await;
    if slot.is_some() {
      return Err(PipelineError::Internal(
        "transaction slot already holds an open transaction".to_string(),
      ));
    }
    *slot = Some(tx);
    Ok(())
  }

  async fn take(&self) -> Option<Tx> {
    self.0.lock().await.take()
  }
}

impl<Tx: Send + 'static> Default for TxSlot<Tx> {
  fn default() -> Self {
    Self::new()
  }
}

impl<Tx> Clone for TxSlot<Tx> {
  fn clone(&self) -> Self {
    TxSlot(Arc::clone(&self.0))
  }
}

impl<Tx> std::fmt::Debug for TxSlot<Tx> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("TxSlot").finish_non_exhaustive()
  }
}

/// Opens and closes transactions of type `Tx`.
#[async_trait]
pub trait Transactor: Send + Sync {
  type Tx: Send + 'static;
  type Error: std::error::Error + Send + Sync + 'static;

  async fn begin(&self) -> Result<Self::Tx, Self::Error>;
  async fn commit(&self, tx: Self::Tx) -> Result<(), Self::Error>;
  async fn rollback(&self, tx: Self::Tx) -> Result<(), Self::Error>;
}

/// Implemented by pipeline contexts that carry a transaction slot.
pub trait Transactional {
  type Tx: Send + 'static;

  fn tx_slot(&self) -> &TxSlot<Self::Tx>;
}

impl<TData, Err> Pipeline<TData, Err>
where
  TData: Transactional + 'static + Send + Sync,
  Err: std::error::Error + From<PipelineError> + Send + Sync + 'static,
{
  /// Runs the pipeline as one unit of work.
  ///
  /// A transaction is opened before the first step and placed in the
  /// context's slot. It is committed only if every step completes within
  /// `timeout`. A stop, a handler error, or the deadline rolls it back. The
  /// slot is empty again when this returns.
  #[instrument(
    name = "Pipeline::run_atomic",
    skip_all,
    fields(timeout_ms = timeout.as_millis() as u64),
    err(Display)
  )]
  pub async fn run_atomic<T>(
    &self,
    transactor: &T,
    ctx_data: ContextData<TData>,
    timeout: Duration,
  ) -> Result<PipelineResult, Err>
  where
    T: Transactor<Tx = TData::Tx>,
    Err: From<T::Error>,
  {
    let slot = ctx_data.read().tx_slot().clone();

    let tx = transactor.begin().await.map_err(Err::from)?;
    if let Err(e) = slot.install(tx).await {
      return Err(Err::from(e));
    }
    event!(Level::DEBUG, "Transaction opened.");

    let outcome = tokio::time::timeout(timeout, self.run(ctx_data.clone())).await;

    let tx = slot
      .take()
      .await
      .ok_or_else(|| Err::from(PipelineError::TransactionClosed))?;

    match outcome {
      Ok(Ok(PipelineResult::Completed)) => {
        transactor.commit(tx).await.map_err(Err::from)?;
        event!(Level::DEBUG, "Transaction committed.");
        Ok(PipelineResult::Completed)
      }
      Ok(Ok(PipelineResult::Stopped)) => {
        transactor.rollback(tx).await.map_err(Err::from)?;
        event!(Level::DEBUG, "Pipeline stopped, transaction rolled back.");
        Ok(PipelineResult::Stopped)
      }
      Ok(Err(e)) => {
        if let Err(rb_err) = transactor.rollback(tx).await {
          event!(Level::ERROR, error = %rb_err, "Rollback after handler failure also failed.");
        }
        Err(e)
      }
      Err(_elapsed) => {
        if let Err(rb_err) = transactor.rollback(tx).await {
          event!(Level::ERROR, error = %rb_err, "Rollback after timeout failed.");
        }
        event!(Level::WARN, "Pipeline exceeded its deadline, transaction rolled back.");
        Err(Err::from(PipelineError::TimedOut {
          timeout_ms: timeout.as_millis(),
        }))
      }
    }
  }
}

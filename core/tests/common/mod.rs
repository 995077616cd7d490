// core/tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use pipeline::{ContextData, PipelineControl, PipelineError, Transactional, Transactor, TxSlot};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::Level;

// --- Plain context ---
#[derive(Clone, Debug, Default)]
pub struct TestContext {
  pub counter: i32,
  pub message: String,
  pub steps_executed: Vec<String>,
  pub should_stop_at: Option<String>,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum TestError {
  #[error("engine error: {0}")]
  Engine(String),

  #[error("handler failed: {0}")]
  Handler(String),

  #[error("ledger failed: {0}")]
  Ledger(String),
}

impl From<PipelineError> for TestError {
  fn from(pe: PipelineError) -> Self {
    TestError::Engine(format!("{:?}", pe))
  }
}

pub fn create_simple_handler(
  step_name: &'static str,
  message_to_append: &'static str,
) -> pipeline::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      let mut guard = ctx.write();
      guard.counter += 1;
      guard.message.push_str(message_to_append);
      guard.steps_executed.push(step_name.to_string());
      if guard.should_stop_at.as_deref() == Some(step_name) {
        return Ok(PipelineControl::Stop);
      }
      Ok(PipelineControl::Continue)
    })
  })
}

pub fn create_failing_handler(
  step_name: &'static str,
  error_message: &'static str,
) -> pipeline::Handler<TestContext, TestError> {
  Box::new(move |ctx: ContextData<TestContext>| {
    Box::pin(async move {
      ctx.write().steps_executed.push(step_name.to_string());
      Err(TestError::Handler(error_message.to_string()))
    })
  })
}

// --- Transactional fixtures ---

/// A committed ledger of integers. A transaction is a private copy of the
/// entries plus a sequence number so tests can count begins and commits.
#[derive(Default)]
pub struct Ledger {
  pub committed: parking_lot::Mutex<Vec<i64>>,
  pub begins: AtomicUsize,
  pub commits: AtomicUsize,
  pub rollbacks: AtomicUsize,
  pub fail_commit: std::sync::atomic::AtomicBool,
}

#[derive(Debug)]
pub struct LedgerTx {
  pub entries: Vec<i64>,
}

#[async_trait]
impl Transactor for Ledger {
  type Tx = LedgerTx;
  type Error = TestError;

  async fn begin(&self) -> Result<LedgerTx, TestError> {
    self.begins.fetch_add(1, Ordering::SeqCst);
    Ok(LedgerTx {
      entries: self.committed.lock().clone(),
    })
  }

  async fn commit(&self, tx: LedgerTx) -> Result<(), TestError> {
    if self.fail_commit.load(Ordering::SeqCst) {
      return Err(TestError::Ledger("commit refused".to_string()));
    }
    *self.committed.lock() = tx.entries;
    self.commits.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }

  async fn rollback(&self, _tx: LedgerTx) -> Result<(), TestError> {
    self.rollbacks.fetch_add(1, Ordering::SeqCst);
    Ok(())
  }
}

impl Ledger {
  pub fn committed(&self) -> Vec<i64> {
    self.committed.lock().clone()
  }

  pub fn counts(&self) -> (usize, usize, usize) {
    (
      self.begins.load(Ordering::SeqCst),
      self.commits.load(Ordering::SeqCst),
      self.rollbacks.load(Ordering::SeqCst),
    )
  }
}

#[derive(Debug, Default)]
pub struct LedgerContext {
  pub tx: TxSlot<LedgerTx>,
  pub to_append: Vec<i64>,
}

impl Transactional for LedgerContext {
  type Tx = LedgerTx;

  fn tx_slot(&self) -> &TxSlot<LedgerTx> {
    &self.tx
  }
}

/// Appends `value` to the open transaction.
pub async fn append_entry(ctx: ContextData<LedgerContext>, value: i64) -> Result<PipelineControl, TestError> {
  let slot = ctx.read().tx.clone();
  let mut tx = slot.lock().await?;
  tx.entries.push(value);
  Ok(PipelineControl::Continue)
}

// --- Tracing ---
use once_cell::sync::Lazy;
static TRACING_INIT: Lazy<()> = Lazy::new(|| {
  tracing_subscriber::fmt()
    .with_max_level(Level::DEBUG)
    .with_test_writer()
    .try_init()
    .ok();
});

pub fn setup_tracing() {
  Lazy::force(&TRACING_INIT);
}

pub fn shared_ledger() -> Arc<Ledger> {
  Arc::new(Ledger::default())
}

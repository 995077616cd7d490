// core/tests/transaction_tests.rs
mod common;

use common::*;
use pipeline::{ContextData, Pipeline, PipelineControl, PipelineResult};
use serial_test::serial;
use std::sync::atomic::Ordering;
use std::time::Duration;

const DEADLINE: Duration = Duration::from_secs(5);

fn ledger_pipeline() -> Pipeline<LedgerContext, TestError> {
  let mut p = Pipeline::<LedgerContext, TestError>::new(&[("append_all", false, None), ("finish", true, None)]);
  p.on_root("append_all", |ctx: ContextData<LedgerContext>| async move {
    let values = ctx.read().to_append.clone();
    for v in values {
      append_entry(ctx.clone(), v).await?;
    }
    Ok::<_, TestError>(PipelineControl::Continue)
  });
  p
}

fn ledger_ctx(values: &[i64]) -> ContextData<LedgerContext> {
  ContextData::new(LedgerContext {
    to_append: values.to_vec(),
    ..Default::default()
  })
}

#[tokio::test]
#[serial]
async fn test_completed_run_commits_once() {
  setup_tracing();
  let ledger = shared_ledger();
  let p = ledger_pipeline();

  let result = p.run_atomic(&*ledger, ledger_ctx(&[1, 2]), DEADLINE).await;

  assert_eq!(result.unwrap(), PipelineResult::Completed);
  assert_eq!(ledger.committed(), vec![1, 2]);
  assert_eq!(ledger.counts(), (1, 1, 0));
}

#[tokio::test]
#[serial]
async fn test_writes_are_invisible_until_commit() {
  setup_tracing();
  let ledger = shared_ledger();
  let mut p = ledger_pipeline();
  let observer = ledger.clone();
  p.on_root("finish", move |_ctx: ContextData<LedgerContext>| {
    let observer = observer.clone();
    async move {
      assert!(observer.committed().is_empty());
      Ok::<_, TestError>(PipelineControl::Continue)
    }
  });

  p.run_atomic(&*ledger, ledger_ctx(&[7]), DEADLINE).await.unwrap();
  assert_eq!(ledger.committed(), vec![7]);
}

#[tokio::test]
#[serial]
async fn test_stop_rolls_back_and_reports_stopped() {
  setup_tracing();
  let ledger = shared_ledger();
  let mut p = ledger_pipeline();
  p.on_root("finish", |_ctx: ContextData<LedgerContext>| async move {
    Ok::<_, TestError>(PipelineControl::Stop)
  });

  let result = p.run_atomic(&*ledger, ledger_ctx(&[1, 2, 3]), DEADLINE).await;

  assert_eq!(result.unwrap(), PipelineResult::Stopped);
  assert!(ledger.committed().is_empty());
  assert_eq!(ledger.counts(), (1, 0, 1));
}

#[tokio::test]
#[serial]
async fn test_handler_error_rolls_back_earlier_writes() {
  setup_tracing();
  let ledger = shared_ledger();
  ledger.committed.lock().push(100);
  let mut p = ledger_pipeline();
  p.on_root("finish", |_ctx: ContextData<LedgerContext>| async move {
    Err::<PipelineControl, _>(TestError::Handler("late failure".to_string()))
  });

  let result = p.run_atomic(&*ledger, ledger_ctx(&[1]), DEADLINE).await;

  assert_eq!(result.unwrap_err(), TestError::Handler("late failure".to_string()));
  assert_eq!(ledger.committed(), vec![100]);
  assert_eq!(ledger.counts(), (1, 0, 1));
}

#[tokio::test]
#[serial]
async fn test_deadline_rolls_back_and_times_out() {
  setup_tracing();
  let ledger = shared_ledger();
  let mut p = ledger_pipeline();
  p.on_root("finish", |_ctx: ContextData<LedgerContext>| async move {
    tokio::time::sleep(Duration::from_millis(500)).await;
    Ok::<_, TestError>(PipelineControl::Continue)
  });

  let ctx = ledger_ctx(&[9]);
  let result = p.run_atomic(&*ledger, ctx.clone(), Duration::from_millis(20)).await;

  match result {
    Err(TestError::Engine(s)) => assert!(s.contains("TimedOut")),
    other => panic!("Expected TimedOut, got {:?}", other),
  }
  assert!(ledger.committed().is_empty());
  assert_eq!(ledger.counts(), (1, 0, 1));
  let slot = ctx.read().tx.clone();
  assert!(!slot.is_open().await);
}

#[tokio::test]
#[serial]
async fn test_commit_failure_surfaces_and_keeps_state() {
  setup_tracing();
  let ledger = shared_ledger();
  ledger.fail_commit.store(true, Ordering::SeqCst);
  let p = ledger_pipeline();

  let result = p.run_atomic(&*ledger, ledger_ctx(&[5]), DEADLINE).await;

  assert_eq!(result.unwrap_err(), TestError::Ledger("commit refused".to_string()));
  assert!(ledger.committed().is_empty());
}

#[tokio::test]
#[serial]
async fn test_plain_run_has_no_transaction() {
  setup_tracing();
  let p = ledger_pipeline();

  let result = p.run(ledger_ctx(&[1])).await;

  match result {
    Err(TestError::Engine(s)) => assert!(s.contains("TransactionClosed")),
    other => panic!("Expected TransactionClosed, got {:?}", other),
  }
}

#[tokio::test]
#[serial]
async fn test_slot_is_empty_after_completed_run() {
  setup_tracing();
  let ledger = shared_ledger();
  let p = ledger_pipeline();
  let ctx = ledger_ctx(&[3]);

  p.run_atomic(&*ledger, ctx.clone(), DEADLINE).await.unwrap();

  let slot = ctx.read().tx.clone();
  assert!(!slot.is_open().await);
}

// core/src/core/control.rs

//! Signals for controlling pipeline flow and the outcome of a run.

/// Returned by every handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineControl {
  Continue,
  /// Halt the run. Remaining handlers and steps are not executed, and an
  /// atomic run rolls its transaction back.
  Stop,
}

/// Outcome of a pipeline run that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineResult {
  /// Every non-skipped step ran. Atomic runs have committed at this point.
  Completed,
  /// A handler returned `PipelineControl::Stop`.
  Stopped,
}

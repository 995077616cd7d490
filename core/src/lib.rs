// core/src/lib.rs

//! Step pipelines for the storefront order core.
//!
//! A pipeline is an ordered list of named steps. Each step can carry `before`,
//! `on` and `after` handlers that operate on a shared `ContextData<TData>`.
//! Handlers may stop the run early, fail it, or let it continue.
//!
//! Pipelines whose context implements [`Transactional`] can be run with
//! [`Pipeline::run_atomic`], which opens one transaction, hands it to every
//! step through the context's [`TxSlot`], and commits only when the run
//! completes. Stopping, failing, or running past the timeout rolls back.

pub mod core;
pub mod error;
pub mod pipeline;
pub mod transaction;

// --- Re-exports for the Public API ---

pub use crate::core::context_data::ContextData;
pub use crate::core::control::{PipelineControl, PipelineResult};
pub use crate::core::handler::Handler;
pub use crate::core::step::{SkipCondition, StepDef};

pub use crate::pipeline::definition::Pipeline;

pub use crate::error::{PipelineError, PipelineResultExt};

pub use crate::transaction::{Transactional, Transactor, TxGuard, TxSlot};

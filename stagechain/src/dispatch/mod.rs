//! Trigger handling and stage chaining.
//!
//! [`ChainDispatcher`] turns a trigger into root-stage submissions and each
//! engine signal into, at most, one child submission. Children wait in a
//! [`PendingRegistry`] keyed by their parent's job id.

mod context;
mod dispatcher;
mod pending;

pub use context::{ExecutionContext, StageInfo, WorkflowContext, WorkflowInfo};
pub use dispatcher::ChainDispatcher;
pub use pending::{PendingChild, PendingRegistry};

//! This crate provides the waiter engine behind the `aws-waiter` CLI:
//! - waiters-2.json model parsing and validation
//! - acceptor matching (error, status, path, pathAll, pathAny)
//! - the fixed-interval polling loop with cancellation
//! - service models, model providers and the per-build model cache
//!

pub mod acceptor;
pub mod cache;
pub mod description;
mod errors;
pub mod model;
pub mod naming;
pub mod poller;
pub mod providers;
pub mod query;
pub mod service_model;

// Re-exports for a small, focused public API
pub use acceptor::{evaluate, Evaluation, MatchContext, OperationResponse, ServiceError};
pub use cache::ModelCache;
pub use description::build_waiter_state_description;
pub use errors::{Result, WaitError, WaiterError};
pub use model::{
    Acceptor, AcceptorState, ErrorExpectation, Matcher, MatcherKind, WaiterConfig, WaiterModel,
};
pub use naming::to_cli_name;
pub use poller::{ErrorReason, OperationInvoker, Parameters, PollOutcome, PollingExecutor};
pub use providers::{
    ChainedModelProvider, EmbeddedModelProvider, FileSystemModelProvider, ModelKind,
    ModelProvider,
};
pub use service_model::{ParameterKind, ParameterSpec, ServiceMetadata, ServiceModel};

/// Re-exported so callers can cancel waits without depending on tokio-util directly
pub use tokio_util::sync::CancellationToken;

//! Operation types flowing through the pipeline.

use dynrouter_core::messages::{ControlRequest, ControlResponse};
use dynrouter_core::Message;

use super::dispatch::{DeliveryReport, DispatchError};
use crate::filter::{AddRejected, FilterError};

/// Names the router dispatches on.
pub mod service_names {
    pub const ROUTING: &str = "routing";
    pub const CONTROL: &str = "control";
}

/// Context carried with every operation through the pipeline.
#[derive(Debug, Clone)]
pub struct OperationContext {
    pub call_id: u64,
    pub service_name: &'static str,
    /// Epoch millis at classification time.
    pub timestamp: u64,
    pub call_timeout_ms: u64,
}

impl OperationContext {
    #[must_use]
    pub fn new(call_id: u64, service_name: &'static str, timestamp: u64, call_timeout_ms: u64) -> Self {
        Self {
            call_id,
            service_name,
            timestamp,
            call_timeout_ms,
        }
    }
}

/// Typed operation variants dispatched through the pipeline.
#[derive(Debug)]
pub enum Operation {
    /// Route a message through the filters of `channel`.
    Route {
        ctx: OperationContext,
        channel: String,
        message: Box<Message>,
    },
    /// Subscription management.
    Control {
        ctx: OperationContext,
        request: ControlRequest,
    },
}

impl Operation {
    #[must_use]
    pub fn ctx(&self) -> &OperationContext {
        match self {
            Operation::Route { ctx, .. } | Operation::Control { ctx, .. } => ctx,
        }
    }
}

/// Successful response from an operation handler.
#[derive(Debug)]
pub enum OperationResponse {
    /// A message was routed. `message` is the message as delivered, which
    /// carries the diagnostic body when nothing matched.
    Routed {
        call_id: u64,
        channel: String,
        recipients: Vec<String>,
        matched: bool,
        message: Box<Message>,
        deliveries: Vec<DeliveryReport>,
    },
    Control(ControlResponse),
    Empty,
}

/// Errors returned by operation handlers.
#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("unknown service: {name}")]
    UnknownService { name: String },
    #[error("operation timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
    #[error("router overloaded, try again later")]
    Overloaded,
    #[error("wrong service for operation")]
    WrongService,
    #[error(transparent)]
    Filter(#[from] FilterError),
    #[error(transparent)]
    Rejected(#[from] AddRejected),
    #[error("unknown predicate: {name}")]
    UnknownPredicate { name: String },
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Errors from classifying an inbound envelope into an `Operation`.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("routing message without a channel")]
    MissingChannel,
    #[error("malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}

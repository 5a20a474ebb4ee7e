//! Tower middleware layers for the operation pipeline.
//!
//! - [`timeout`]: per-operation timeout enforcement
//! - [`metrics`]: operation counters and durations via the `metrics` facade,
//!   inside a `tracing` span
//! - [`load_shed`]: semaphore-based concurrency limiting
//! - [`pipeline`]: composes all layers into a single service stack

pub mod load_shed;
pub mod metrics;
pub mod pipeline;
pub mod timeout;

pub use load_shed::LoadShedLayer;
pub use metrics::MetricsLayer;
pub use pipeline::build_operation_pipeline;
pub use timeout::TimeoutLayer;

#[cfg(test)]
pub(crate) mod test_support {
    use std::future::Future;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;

    use dynrouter_core::messages::{ControlRequest, ControlResponse, UnsubscribePayload};
    use tower::Service;

    use crate::service::operation::{
        service_names, Operation, OperationContext, OperationError, OperationResponse,
    };

    /// Sleeps `delay_ms`, then acknowledges with an unsubscribe reply carrying
    /// the call id as filter id.
    pub(crate) struct SlowService {
        pub(crate) delay_ms: u64,
    }

    impl Service<Operation> for SlowService {
        type Response = OperationResponse;
        type Error = OperationError;
        type Future =
            Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, op: Operation) -> Self::Future {
            let delay = self.delay_ms;
            let call_id = op.ctx().call_id;
            Box::pin(async move {
                if delay > 0 {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Ok(OperationResponse::Control(ControlResponse::Unsubscribed {
                    filter_id: call_id.to_string(),
                    removed: true,
                }))
            })
        }
    }

    pub(crate) fn make_op(call_id: u64, timeout_ms: u64) -> Operation {
        Operation::Control {
            ctx: OperationContext::new(call_id, service_names::CONTROL, 0, timeout_ms),
            request: ControlRequest::Unsubscribe(UnsubscribePayload {
                subscription_id: "f".to_string(),
                subscribe_channel: None,
            }),
        }
    }

    pub(crate) fn acked_call_id(resp: &OperationResponse) -> Option<u64> {
        match resp {
            OperationResponse::Control(ControlResponse::Unsubscribed { filter_id, .. }) => {
                filter_id.parse().ok()
            }
            _ => None,
        }
    }
}

//! Pipeline composition: combines all middleware layers into a single service stack.

use tower::ServiceBuilder;

use super::load_shed::LoadShedLayer;
use super::metrics::MetricsLayer;
use super::timeout::TimeoutLayer;
use crate::service::config::RouterConfig;
use crate::service::operation::{Operation, OperationError, OperationResponse};
use crate::service::router::OperationRouter;

/// Wraps the `OperationRouter` with the middleware layers.
///
/// Layer order (outermost to innermost):
/// 1. `LoadShedLayer` rejects when overloaded, before any work is done
/// 2. `TimeoutLayer` enforces per-operation timeouts
/// 3. `MetricsLayer` records timing and outcome next to the handler
#[must_use]
pub fn build_operation_pipeline(
    router: OperationRouter,
    config: &RouterConfig,
) -> impl tower::Service<Operation, Response = OperationResponse, Error = OperationError> {
    ServiceBuilder::new()
        .layer(LoadShedLayer::new(config.max_concurrent_operations))
        .layer(TimeoutLayer)
        .layer(MetricsLayer)
        .service(router)
}

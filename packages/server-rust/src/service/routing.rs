//! Routing service: computes recipients for a message and delivers it to them.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tower::Service;

use super::config::RouterConfig;
use super::dispatch::{dispatch_all, EndpointDispatcher};
use super::operation::{Operation, OperationError, OperationResponse};
use crate::filter::FilterService;

/// Matches `Route` operations against a shared [`FilterService`] and hands
/// the message to every recipient through an [`EndpointDispatcher`].
///
/// Unmatched messages go to the diagnostic log endpoint carrying the
/// rewritten body.
#[derive(Clone)]
pub struct RoutingService {
    filters: Arc<FilterService>,
    dispatcher: Arc<dyn EndpointDispatcher>,
    config: Arc<RouterConfig>,
}

impl RoutingService {
    #[must_use]
    pub fn new(
        filters: Arc<FilterService>,
        dispatcher: Arc<dyn EndpointDispatcher>,
        config: Arc<RouterConfig>,
    ) -> Self {
        Self {
            filters,
            dispatcher,
            config,
        }
    }
}

impl Service<Operation> for RoutingService {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let Operation::Route {
            ctx,
            channel,
            mut message,
        } = op
        else {
            return Box::pin(async { Err(OperationError::WrongService) });
        };

        // Matching is synchronous; only delivery awaits.
        let outcome = match self.filters.match_recipients(
            &mut message,
            &channel,
            self.config.recipient_mode.first_match_only(),
            self.config.warn_dropped_message,
        ) {
            Ok(outcome) => outcome,
            Err(err) => return Box::pin(async move { Err(err.into()) }),
        };

        let dispatcher = Arc::clone(&self.dispatcher);
        let options = self.config.dispatch;
        Box::pin(async move {
            let recipients = outcome.recipients();
            let deliveries =
                dispatch_all(dispatcher.as_ref(), &recipients, &message, options).await?;
            Ok(OperationResponse::Routed {
                call_id: ctx.call_id,
                channel,
                recipients,
                matched: outcome.is_matched(),
                message,
                deliveries,
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

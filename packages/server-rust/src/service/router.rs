//! Operation routing: dispatches `Operation` to the handling service by `service_name`.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use dynrouter_core::PredicateResolver;
use tower::Service;

use super::config::RouterConfig;
use super::control::ControlService;
use super::dispatch::EndpointDispatcher;
use super::operation::{service_names, Operation, OperationError, OperationResponse};
use super::routing::RoutingService;
use crate::filter::FilterService;

type BoxedFuture = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

/// A type-erased handler for one service name.
type BoxedService = Box<
    dyn Service<Operation, Response = OperationResponse, Error = OperationError, Future = BoxedFuture>
        + Send,
>;

// ---------------------------------------------------------------------------
// OperationRouter
// ---------------------------------------------------------------------------

/// Routes `Operation` values to the service registered under their
/// `service_name` (`"routing"` or `"control"`).
///
/// Operations naming an unregistered service fail with
/// `OperationError::UnknownService`.
pub struct OperationRouter {
    services: HashMap<&'static str, BoxedService>,
}

impl OperationRouter {
    #[must_use]
    pub fn new() -> Self {
        Self {
            services: HashMap::new(),
        }
    }

    /// Register the handler for `name`, replacing any previous one.
    pub fn register<S>(&mut self, name: &'static str, service: S)
    where
        S: Service<Operation, Response = OperationResponse, Error = OperationError> + Send + 'static,
        S::Future: Send + 'static,
    {
        self.services.insert(name, Box::new(Erased(service)));
    }

    /// Registered service names, sorted.
    #[must_use]
    pub fn service_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.services.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

impl Default for OperationRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Operation> for OperationRouter {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = BoxedFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        // Ready only when every handler is ready.
        for svc in self.services.values_mut() {
            match svc.poll_ready(cx) {
                Poll::Ready(Ok(())) => {}
                other => return other,
            }
        }
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let service_name = op.ctx().service_name;
        match self.services.get_mut(service_name) {
            Some(svc) => svc.call(op),
            None => Box::pin(async move {
                Err(OperationError::UnknownService {
                    name: service_name.to_string(),
                })
            }),
        }
    }
}

/// Builds a router serving both the routing and control services over one
/// shared [`FilterService`].
#[must_use]
pub fn build_router(
    filters: Arc<FilterService>,
    resolver: Arc<dyn PredicateResolver>,
    dispatcher: Arc<dyn EndpointDispatcher>,
    config: Arc<RouterConfig>,
) -> OperationRouter {
    let mut router = OperationRouter::new();
    router.register(
        service_names::ROUTING,
        RoutingService::new(Arc::clone(&filters), dispatcher, config),
    );
    router.register(service_names::CONTROL, ControlService::new(filters, resolver));
    router
}

/// Boxes the future of a concrete service.
struct Erased<S>(S);

impl<S> Service<Operation> for Erased<S>
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = BoxedFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.0.poll_ready(cx)
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        Box::pin(self.0.call(op))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use dynrouter_core::messages::{ChannelQueryPayload, ControlRequest, ControlResponse};
    use tower::ServiceExt;

    use super::*;
    use crate::service::operation::OperationContext;

    /// Answers every operation with an empty listing tagged by its own name.
    #[derive(Clone)]
    struct NamedService {
        name: &'static str,
    }

    impl Service<Operation> for NamedService {
        type Response = OperationResponse;
        type Error = OperationError;
        type Future = BoxedFuture;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, _op: Operation) -> Self::Future {
            let name = self.name;
            Box::pin(async move {
                Ok(OperationResponse::Control(ControlResponse::Filters {
                    channel: name.to_string(),
                    filters: Vec::new(),
                }))
            })
        }
    }

    fn make_op(service_name: &'static str) -> Operation {
        Operation::Control {
            ctx: OperationContext::new(1, service_name, 1_700_000_000_000, 5000),
            request: ControlRequest::List(ChannelQueryPayload {
                channel: "c".to_string(),
            }),
        }
    }

    fn answered_by(resp: &OperationResponse) -> &str {
        match resp {
            OperationResponse::Control(ControlResponse::Filters { channel, .. }) => channel,
            other => panic!("unexpected response: {other:?}"),
        }
    }

    #[tokio::test]
    async fn routes_to_registered_service() {
        let mut router = OperationRouter::new();
        router.register(service_names::CONTROL, NamedService { name: "control" });

        let resp = router.oneshot(make_op(service_names::CONTROL)).await.unwrap();
        assert_eq!(answered_by(&resp), "control");
    }

    #[tokio::test]
    async fn unknown_service_returns_error() {
        let mut router = OperationRouter::new();
        router.register(service_names::ROUTING, NamedService { name: "routing" });

        let err = router.oneshot(make_op("nonexistent")).await.unwrap_err();
        assert!(matches!(
            err,
            OperationError::UnknownService { name } if name == "nonexistent"
        ));
    }

    #[tokio::test]
    async fn routes_to_correct_service_among_several() {
        let mut router = OperationRouter::new();
        router.register(service_names::ROUTING, NamedService { name: "routing" });
        router.register(service_names::CONTROL, NamedService { name: "control" });
        assert_eq!(router.service_names(), vec!["control", "routing"]);

        for name in [service_names::ROUTING, service_names::CONTROL] {
            let resp = ServiceExt::ready(&mut router)
                .await
                .unwrap()
                .call(make_op(name))
                .await
                .unwrap();
            assert_eq!(answered_by(&resp), name);
        }
    }

    #[tokio::test]
    async fn built_router_serves_routing_and_control() {
        use async_trait::async_trait;
        use dynrouter_core::messages::SubscribePayload;
        use dynrouter_core::Message;

        use crate::service::control::PredicateRegistry;

        struct Sink;

        #[async_trait]
        impl EndpointDispatcher for Sink {
            async fn deliver(&self, _endpoint: &str, _message: Message) -> anyhow::Result<()> {
                Ok(())
            }
        }

        let filters = Arc::new(FilterService::with_defaults());
        let mut router = build_router(
            Arc::clone(&filters),
            Arc::new(PredicateRegistry::with_builtins()),
            Arc::new(Sink),
            Arc::new(RouterConfig::default()),
        );
        assert_eq!(router.service_names(), vec!["control", "routing"]);

        let subscribe = Operation::Control {
            ctx: OperationContext::new(1, service_names::CONTROL, 0, 5000),
            request: ControlRequest::Subscribe(SubscribePayload {
                subscription_id: "f1".to_string(),
                subscribe_channel: "orders".to_string(),
                priority: 0,
                destination_uri: "q1".to_string(),
                predicate_name: "always".to_string(),
            }),
        };
        ServiceExt::ready(&mut router)
            .await
            .unwrap()
            .call(subscribe)
            .await
            .unwrap();

        let route = Operation::Route {
            ctx: OperationContext::new(2, service_names::ROUTING, 0, 5000),
            channel: "orders".to_string(),
            message: Box::new(Message::new("m")),
        };
        let resp = router.oneshot(route).await.unwrap();
        assert!(matches!(
            resp,
            OperationResponse::Routed { ref recipients, matched: true, .. } if recipients == &["q1"]
        ));
    }
}

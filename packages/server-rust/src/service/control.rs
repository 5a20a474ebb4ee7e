//! Control service: subscription management requests against the filter service.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use dashmap::DashMap;
use dynrouter_core::messages::{ControlRequest, ControlResponse, SubscribePayload};
use dynrouter_core::{Always, Never, Predicate, PredicateResolver};
use tower::Service;
use tracing::debug;

use super::operation::{Operation, OperationError, OperationResponse};
use crate::filter::FilterService;

// ---------------------------------------------------------------------------
// PredicateRegistry
// ---------------------------------------------------------------------------

/// Named predicates, resolvable from control requests.
#[derive(Default)]
pub struct PredicateRegistry {
    predicates: DashMap<String, Arc<dyn Predicate>>,
}

impl PredicateRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with `"always"` and `"never"`.
    #[must_use]
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register("always", Arc::new(Always));
        registry.register("never", Arc::new(Never));
        registry
    }

    /// Registers `predicate` under `name`, returning the one it replaced.
    pub fn register(
        &self,
        name: impl Into<String>,
        predicate: Arc<dyn Predicate>,
    ) -> Option<Arc<dyn Predicate>> {
        self.predicates.insert(name.into(), predicate)
    }

    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Predicate>> {
        self.predicates.remove(name).map(|(_, predicate)| predicate)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.predicates.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}

impl PredicateResolver for PredicateRegistry {
    fn resolve(&self, name: &str) -> Option<Arc<dyn Predicate>> {
        self.predicates.get(name).map(|entry| Arc::clone(entry.value()))
    }
}

impl std::fmt::Debug for PredicateRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredicateRegistry")
            .field("names", &self.names())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// ControlService
// ---------------------------------------------------------------------------

/// Applies control requests to a shared [`FilterService`].
#[derive(Clone)]
pub struct ControlService {
    filters: Arc<FilterService>,
    resolver: Arc<dyn PredicateResolver>,
}

impl ControlService {
    #[must_use]
    pub fn new(filters: Arc<FilterService>, resolver: Arc<dyn PredicateResolver>) -> Self {
        Self { filters, resolver }
    }

    /// Executes one request.
    ///
    /// # Errors
    ///
    /// - `OperationError::UnknownPredicate` if a subscribe/update names a
    ///   predicate the resolver does not know
    /// - `OperationError::Rejected` if the add/update gate refuses the filter
    /// - `OperationError::Filter` for lookups on unknown channels or filters
    pub fn handle(&self, request: ControlRequest) -> Result<ControlResponse, OperationError> {
        match request {
            ControlRequest::Subscribe(payload) => self.subscribe(&payload, false),
            ControlRequest::Update(payload) => self.subscribe(&payload, true),
            ControlRequest::Unsubscribe(payload) => {
                let removed = self.filters.remove_filter_by_id(
                    &payload.subscription_id,
                    payload.subscribe_channel.as_deref(),
                )?;
                Ok(ControlResponse::Unsubscribed {
                    filter_id: payload.subscription_id,
                    removed,
                })
            }
            ControlRequest::List(payload) => {
                let filters = self
                    .filters
                    .get_filters_for_channel(&payload.channel)?
                    .iter()
                    .map(|filter| filter.summary())
                    .collect();
                Ok(ControlResponse::Filters {
                    channel: payload.channel,
                    filters,
                })
            }
            ControlRequest::Statistics(payload) => {
                let statistics = self
                    .filters
                    .get_statistics_for_channel(&payload.channel)?
                    .iter()
                    .map(|stats| stats.snapshot())
                    .collect();
                Ok(ControlResponse::Statistics {
                    channel: payload.channel,
                    statistics,
                })
            }
        }
    }

    fn subscribe(
        &self,
        payload: &SubscribePayload,
        update: bool,
    ) -> Result<ControlResponse, OperationError> {
        let predicate = self.resolver.resolve(&payload.predicate_name).ok_or_else(|| {
            OperationError::UnknownPredicate {
                name: payload.predicate_name.clone(),
            }
        })?;
        let filter_id = self.filters.add_new_filter_for_channel(
            &payload.subscription_id,
            payload.priority,
            predicate,
            &payload.destination_uri,
            &payload.subscribe_channel,
            update,
        )?;
        debug!(
            channel = %payload.subscribe_channel,
            filter_id = %filter_id,
            predicate = %payload.predicate_name,
            update,
            "subscription applied"
        );
        Ok(ControlResponse::Subscribed {
            filter_id,
            updated: update,
        })
    }
}

impl Service<Operation> for ControlService {
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = Pin<Box<dyn Future<Output = Result<OperationResponse, OperationError>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let result = match op {
            Operation::Control { request, .. } => {
                self.handle(request).map(OperationResponse::Control)
            }
            Operation::Route { .. } => Err(OperationError::WrongService),
        };
        Box::pin(async move { result })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

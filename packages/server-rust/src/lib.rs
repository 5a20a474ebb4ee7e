//! `dynrouter` Server: concurrent channel registry, priority-ordered filter
//! matching and the tower operation pipeline around it.

pub mod filter;
pub mod service;

pub use filter::{
    AddRejected, ChannelFilters, ChannelRegistry, DefaultFilterFactory, FilterError,
    FilterFactory, FilterService, RoutingOutcome,
};
pub use service::{
    build_router, ControlService, EndpointDispatcher, OperationService, PredicateRegistry,
    RouterConfig, RoutingService,
};
